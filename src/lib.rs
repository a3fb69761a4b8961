//! Parsing of protobuf source files into descriptors.
//!
//! A single `.proto` file is scanned, parsed and checked without reading any of its imports. The
//! result is a [`FileDescriptorProto`] along with every problem found in the file, so that one
//! pass reports as many independent errors as possible.
//!
//! ```
//! let file = protoparse::parse_str(
//!     "root.proto",
//!     "syntax = \"proto3\"; message Foo { map<string, int32> counts = 1; }",
//! )
//! .unwrap();
//! assert!(!file.has_errors());
//!
//! let message = &file.descriptor().message_type[0];
//! assert_eq!(message.name(), "Foo");
//! assert_eq!(message.nested_type[0].name(), "CountsEntry");
//! ```
//!
//! ### Error messages
//!
//! Diagnostics implement [`miette::Diagnostic`] and carry the source code of the file, so
//! reporting them through a [`miette::Report`] with the `fancy` feature enabled renders labelled
//! snippets.
//!
//! ```
//! let file = protoparse::parse_str("root.proto", "message Foo { int32 a = 0; }").unwrap();
//! let err = file.into_result().unwrap_err();
//! assert_eq!(err.to_string(), "message numbers must be between 1 and 536870911");
//! ```
#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/protoparse/0.1.0/")]

mod ast;
mod case;
mod error;
mod generate;
mod keyword;
mod lex;
mod names;
mod parse;

use std::{fs, io::Read, path::Path};

use log::debug;
use prost_types::FileDescriptorProto;

pub use crate::error::{Error, ErrorCategory, ParseError, ParseErrorKind};
use crate::{error::ErrorKind, names::NameMap};

/// The largest field number allowed in a message.
pub const MAX_MESSAGE_FIELD_NUMBER: i32 = 536_870_911;

const MAX_FILE_LEN: u64 = i32::MAX as u64;

/// The result of parsing a single source file.
///
/// Contains the descriptor of the file, with placeholders where parts of it could not be
/// resolved, along with any diagnostics found while parsing it.
#[derive(Debug)]
pub struct ParsedFile {
    descriptor: FileDescriptorProto,
    errors: Option<ParseError>,
}

impl ParsedFile {
    /// Gets the descriptor of the file.
    pub fn descriptor(&self) -> &FileDescriptorProto {
        &self.descriptor
    }

    /// Converts this into the descriptor of the file, discarding any diagnostics.
    pub fn into_descriptor(self) -> FileDescriptorProto {
        self.descriptor
    }

    /// Gets the diagnostics found while parsing the file, if there were any.
    pub fn errors(&self) -> Option<&ParseError> {
        self.errors.as_ref()
    }

    /// Returns true if any problems were found while parsing the file.
    pub fn has_errors(&self) -> bool {
        self.errors.is_some()
    }

    /// Returns the descriptor if the file is free of problems, or the diagnostics otherwise.
    pub fn into_result(self) -> Result<FileDescriptorProto, ParseError> {
        match self.errors {
            Some(err) => Err(err),
            None => Ok(self.descriptor),
        }
    }
}

/// Parses the source code of a single protobuf file.
///
/// `name` is used as the name of the file descriptor and in diagnostics. An error is returned if
/// the source is not valid UTF-8, or if the file cannot be parsed to the end.
pub fn parse(name: &str, source: &[u8]) -> Result<ParsedFile, Error> {
    if source.len() as u64 > MAX_FILE_LEN {
        return Err(Error::from_kind(ErrorKind::FileTooLarge {
            name: name.to_owned(),
        }));
    }

    let source = std::str::from_utf8(source).map_err(|_| {
        Error::from_kind(ErrorKind::FileInvalidUtf8 {
            name: name.to_owned(),
        })
    })?;
    parse_str(name, source)
}

/// Parses the source code of a single protobuf file.
///
/// See [`parse()`].
pub fn parse_str(name: &str, source: &str) -> Result<ParsedFile, Error> {
    if source.len() as u64 > MAX_FILE_LEN {
        return Err(Error::from_kind(ErrorKind::FileTooLarge {
            name: name.to_owned(),
        }));
    }

    debug!("parsing file '{}'", name);

    let (file, mut errors) = match parse::parse(source) {
        Ok(result) => result,
        Err(errors) => {
            debug!(
                "failed to parse file '{}' with {} errors",
                name,
                errors.len()
            );
            return Err(ParseError::new(errors, name, source.to_owned()).into());
        }
    };

    let (names, name_errors) = NameMap::from_file(&file);
    errors.extend(name_errors);

    let (descriptor, generate_errors) = generate::generate(name, &file, &names);
    errors.extend(generate_errors);

    debug!("parsed file '{}' with {} errors", name, errors.len());

    let errors = if errors.is_empty() {
        None
    } else {
        errors.sort_by_key(|err| err.span().start);
        Some(ParseError::new(errors, name, source.to_owned()))
    };

    Ok(ParsedFile { descriptor, errors })
}

/// Reads and parses a protobuf file from disk.
///
/// The path is used as the name of the file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedFile, Error> {
    let path = path.as_ref();
    let source = fs::read(path).map_err(|err| {
        Error::from_kind(ErrorKind::OpenFile {
            path: path.to_owned(),
            err,
        })
    })?;

    parse(&path.display().to_string(), &source)
}

/// Reads the source code of a protobuf file from `reader` and parses it.
pub fn parse_reader(name: &str, reader: impl Read) -> Result<ParsedFile, Error> {
    let mut source = Vec::new();
    reader
        .take(MAX_FILE_LEN + 1)
        .read_to_end(&mut source)
        .map_err(|err| {
            Error::from_kind(ErrorKind::ReadSource {
                name: name.to_owned(),
                err,
            })
        })?;

    parse(name, &source)
}
