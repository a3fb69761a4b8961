use std::{fmt, io, path::PathBuf};

use logos::Span;
use miette::{Diagnostic, NamedSource, SourceCode};
use thiserror::Error;

use crate::MAX_MESSAGE_FIELD_NUMBER;

/// An error that prevents a source file from being parsed at all.
///
/// Problems within the file that the parser can recover from are reported through
/// [`ParsedFile::errors`](crate::ParsedFile::errors) instead.
#[derive(Diagnostic, Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum ErrorKind {
    #[error("{}", err)]
    #[diagnostic(forward(err))]
    Parse { err: ParseError },
    #[error("error opening file '{}'", path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("error reading source for '{name}'")]
    ReadSource {
        name: String,
        #[source]
        err: io::Error,
    },
    #[error("file '{name}' is too large")]
    #[diagnostic(help("the maximum file length is 2,147,483,647 bytes"))]
    FileTooLarge { name: String },
    #[error("file '{name}' is not valid utf-8")]
    FileInvalidUtf8 { name: String },
}

impl Error {
    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    /// The name of the file in which this error occurred.
    pub fn file(&self) -> String {
        match &*self.kind {
            ErrorKind::Parse { err } => err.file().to_owned(),
            ErrorKind::OpenFile { path, .. } => path.display().to_string(),
            ErrorKind::ReadSource { name, .. }
            | ErrorKind::FileTooLarge { name }
            | ErrorKind::FileInvalidUtf8 { name } => name.clone(),
        }
    }

    /// Returns true if the source could not be read.
    pub fn is_io(&self) -> bool {
        matches!(
            &*self.kind,
            ErrorKind::OpenFile { .. } | ErrorKind::ReadSource { .. }
        )
    }

    /// Returns true if parsing started but could not produce a descriptor, for example because a
    /// message body is never closed.
    pub fn is_parse(&self) -> bool {
        matches!(&*self.kind, ErrorKind::Parse { .. })
    }

    /// If this error was raised during parsing, returns the diagnostics collected up to that point.
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match &*self.kind {
            ErrorKind::Parse { err } => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::from_kind(ErrorKind::Parse { err })
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ErrorKind::Parse { err } => err.fmt(f),
            ErrorKind::OpenFile { err, .. } | ErrorKind::ReadSource { err, .. } => {
                write!(f, "{}: {}", self, err)
            }
            ErrorKind::FileTooLarge { .. } | ErrorKind::FileInvalidUtf8 { .. } => {
                write!(f, "{}", self)
            }
        }
    }
}

/// The diagnostics found while parsing a single protobuf source file.
///
/// The first diagnostic is the primary error, the remainder are attached as related errors so
/// that they are all rendered when the error is reported through [`miette`].
#[derive(Error, Diagnostic)]
#[error("{}", kind)]
#[diagnostic(forward(kind))]
pub struct ParseError {
    kind: Box<ParseErrorKind>,
    #[related]
    related: Vec<ParseErrorKind>,
    #[source_code]
    source_code: NamedSource,
    file: String,
}

/// The broad class of a [`ParseErrorKind`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed tokens, such as unterminated strings or illegal characters.
    Lexical,
    /// Token sequences that do not match the grammar.
    Syntax,
    /// Well-formed declarations which violate the rules of the language, such as duplicate
    /// field numbers or unresolved type names.
    Semantic,
    /// Statements declared in the wrong place, such as a late `syntax` statement.
    Structural,
}

/// A single problem found in a protobuf source file.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum ParseErrorKind {
    #[error("invalid character '{token}'")]
    InvalidToken {
        token: String,
        #[label("found here")]
        span: Span,
    },
    #[error("integer is too large")]
    IntegerOutOfRange {
        #[label("integer defined here")]
        span: Span,
    },
    #[error("invalid string character")]
    InvalidStringCharacters {
        #[label("invalid characters")]
        span: Span,
    },
    #[error("unterminated string")]
    UnterminatedString {
        #[label("string starts here")]
        span: Span,
    },
    #[error("invalid string escape")]
    InvalidStringEscape {
        #[label("defined here")]
        span: Span,
    },
    #[error("string is not valid utf-8")]
    InvalidUtf8String {
        #[label("defined here")]
        span: Span,
    },
    #[error("unterminated block comment")]
    UnterminatedBlockComment {
        #[label("comment starts here")]
        span: Span,
    },
    #[error("whitespace is required between an integer literal and an identifier")]
    NoSpaceBetweenIntAndIdent {
        #[label("found here")]
        span: Span,
    },
    #[error("expected {expected}, but found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        #[label("found here")]
        span: Span,
    },
    #[error("expected {expected}, but reached end of file")]
    UnexpectedEof {
        expected: String,
        #[label("end of file")]
        span: Span,
    },
    #[error("invalid import path")]
    #[diagnostic(help(
        "imports must be relative paths using forward slashes, without '.' or '..' components"
    ))]
    InvalidImport {
        #[label("defined here")]
        span: Span,
    },
    #[error("identifiers may not be negative")]
    #[diagnostic(help("only 'inf' and 'nan' may be negated"))]
    NegativeIdent {
        #[label("found here")]
        span: Span,
    },
    #[error("invalid range")]
    #[diagnostic(help("the start of a range must not be greater than the end"))]
    InvalidRange {
        #[label("defined here")]
        span: Span,
    },
    #[error("{kind} body is not closed")]
    UnterminatedBody {
        kind: &'static str,
        #[label("body starts here")]
        span: Span,
    },
    #[error("unknown syntax '{syntax}'")]
    #[diagnostic(help("possible values are 'proto2' and 'proto3'"))]
    UnknownSyntax {
        syntax: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("the syntax statement must be the first statement in the file")]
    SyntaxNotFirst {
        #[label("defined here")]
        span: Span,
    },
    #[error("syntax is declared multiple times")]
    DuplicateSyntax {
        #[label("first defined here")]
        first: Span,
        #[label("redefined here")]
        second: Span,
    },
    #[error("package is declared multiple times")]
    DuplicatePackage {
        #[label("first defined here")]
        first: Span,
        #[label("redefined here")]
        second: Span,
    },
    #[error("message numbers must be between 1 and {}", MAX_MESSAGE_FIELD_NUMBER)]
    InvalidMessageNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error("message numbers between 19,000 and 19,999 are reserved")]
    ReservedMessageNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error("enum numbers must be between {} and {}", i32::MIN, i32::MAX)]
    InvalidEnumNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error("field number '{number}' is already used")]
    DuplicateNumber {
        number: i32,
        #[label("first used here")]
        first: Span,
        #[label("used again here")]
        second: Span,
    },
    #[error("name '{name}' is defined twice")]
    DuplicateName {
        name: String,
        #[label("first defined here…")]
        first: Span,
        #[label("…and again here")]
        second: Span,
    },
    #[error("field number '{number}' is reserved")]
    ReservedFieldNumber {
        number: i32,
        #[label("field defined here")]
        span: Span,
        #[label("reserved here")]
        reserved: Span,
    },
    #[error("field name '{name}' is reserved")]
    ReservedFieldName {
        name: String,
        #[label("field defined here")]
        span: Span,
        #[label("reserved here")]
        reserved: Span,
    },
    #[error("field number '{number}' is within an extension range")]
    FieldNumberInExtensionRange {
        number: i32,
        #[label("field defined here")]
        span: Span,
        #[label("extension range defined here")]
        range: Span,
    },
    #[error("unresolved type reference '{name}'")]
    UnresolvedType {
        name: String,
        #[label("used here")]
        span: Span,
    },
    #[error("'{name}' is not a message type")]
    InvalidMessageType {
        name: String,
        #[label("used here")]
        span: Span,
    },
    #[error("invalid map key type")]
    #[diagnostic(help("map keys must be an integer, bool or string type"))]
    InvalidMapFieldKeyType {
        #[label("defined here")]
        span: Span,
    },
    #[error("map fields cannot have labels")]
    MapFieldWithLabel {
        #[label("defined here")]
        span: Span,
    },
    #[error("oneof fields cannot have labels")]
    OneofFieldWithLabel {
        #[label("defined here")]
        span: Span,
    },
    #[error("{kind} fields are not allowed in a oneof")]
    InvalidOneofFieldKind {
        kind: &'static str,
        #[label("defined here")]
        span: Span,
    },
    #[error("a oneof must have at least one field")]
    EmptyOneof {
        #[label("defined here")]
        span: Span,
    },
    #[error("{kind} fields are not allowed in extensions")]
    InvalidExtendFieldKind {
        kind: &'static str,
        #[label("defined here")]
        span: Span,
    },
    #[error("extension fields cannot be required")]
    RequiredExtendField {
        #[label("defined here")]
        span: Span,
    },
    #[error("required fields are not allowed in proto3")]
    Proto3RequiredField {
        #[label("defined here")]
        span: Span,
    },
    #[error("default values are not allowed in proto3")]
    Proto3DefaultValue {
        #[label("defined here")]
        span: Span,
    },
    #[error("default values are not allowed for {kind} fields")]
    InvalidDefault {
        kind: &'static str,
        #[label("defined here")]
        span: Span,
    },
    #[error("expected value to be {expected}, but found '{actual}'")]
    ValueInvalidType {
        expected: String,
        actual: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("expected value to be {expected}, but the value {actual} is out of range")]
    #[diagnostic(help("the value must be between {min} and {max} inclusive"))]
    IntegerValueOutOfRange {
        expected: String,
        actual: String,
        min: String,
        max: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("option '{name}' is set more than once")]
    DuplicateOption {
        name: String,
        #[label("first set here")]
        first: Span,
        #[label("set again here")]
        second: Span,
    },
    #[error("the 'map_entry' option may not be set explicitly")]
    #[diagnostic(help("use the 'map<K, V>' field syntax instead"))]
    MapEntryOptionSet {
        #[label("set here")]
        span: Span,
    },
    #[error("the first enum value must be zero in proto3")]
    Proto3FirstEnumValueNotZero {
        #[label("defined here")]
        span: Span,
    },
    #[error("enums must have at least one value")]
    EmptyEnum {
        #[label("defined here")]
        span: Span,
    },
}

impl ParseErrorKind {
    /// Gets the primary source code span associated with this error.
    pub fn span(&self) -> Span {
        match self {
            ParseErrorKind::InvalidToken { span, .. }
            | ParseErrorKind::IntegerOutOfRange { span }
            | ParseErrorKind::InvalidStringCharacters { span }
            | ParseErrorKind::UnterminatedString { span }
            | ParseErrorKind::InvalidStringEscape { span }
            | ParseErrorKind::InvalidUtf8String { span }
            | ParseErrorKind::UnterminatedBlockComment { span }
            | ParseErrorKind::NoSpaceBetweenIntAndIdent { span }
            | ParseErrorKind::UnexpectedToken { span, .. }
            | ParseErrorKind::UnexpectedEof { span, .. }
            | ParseErrorKind::InvalidImport { span }
            | ParseErrorKind::NegativeIdent { span }
            | ParseErrorKind::InvalidRange { span }
            | ParseErrorKind::UnterminatedBody { span, .. }
            | ParseErrorKind::UnknownSyntax { span, .. }
            | ParseErrorKind::SyntaxNotFirst { span }
            | ParseErrorKind::InvalidMessageNumber { span }
            | ParseErrorKind::ReservedMessageNumber { span }
            | ParseErrorKind::InvalidEnumNumber { span }
            | ParseErrorKind::ReservedFieldNumber { span, .. }
            | ParseErrorKind::ReservedFieldName { span, .. }
            | ParseErrorKind::FieldNumberInExtensionRange { span, .. }
            | ParseErrorKind::UnresolvedType { span, .. }
            | ParseErrorKind::InvalidMessageType { span, .. }
            | ParseErrorKind::InvalidMapFieldKeyType { span }
            | ParseErrorKind::MapFieldWithLabel { span }
            | ParseErrorKind::OneofFieldWithLabel { span }
            | ParseErrorKind::InvalidOneofFieldKind { span, .. }
            | ParseErrorKind::EmptyOneof { span }
            | ParseErrorKind::InvalidExtendFieldKind { span, .. }
            | ParseErrorKind::RequiredExtendField { span }
            | ParseErrorKind::Proto3RequiredField { span }
            | ParseErrorKind::Proto3DefaultValue { span }
            | ParseErrorKind::InvalidDefault { span, .. }
            | ParseErrorKind::ValueInvalidType { span, .. }
            | ParseErrorKind::IntegerValueOutOfRange { span, .. }
            | ParseErrorKind::MapEntryOptionSet { span }
            | ParseErrorKind::Proto3FirstEnumValueNotZero { span }
            | ParseErrorKind::EmptyEnum { span } => span.clone(),
            ParseErrorKind::DuplicateSyntax { second, .. }
            | ParseErrorKind::DuplicatePackage { second, .. }
            | ParseErrorKind::DuplicateNumber { second, .. }
            | ParseErrorKind::DuplicateName { second, .. }
            | ParseErrorKind::DuplicateOption { second, .. } => second.clone(),
        }
    }

    /// Gets the class of problem this error represents.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ParseErrorKind::InvalidToken { .. }
            | ParseErrorKind::IntegerOutOfRange { .. }
            | ParseErrorKind::InvalidStringCharacters { .. }
            | ParseErrorKind::UnterminatedString { .. }
            | ParseErrorKind::InvalidStringEscape { .. }
            | ParseErrorKind::InvalidUtf8String { .. }
            | ParseErrorKind::UnterminatedBlockComment { .. }
            | ParseErrorKind::NoSpaceBetweenIntAndIdent { .. } => ErrorCategory::Lexical,
            ParseErrorKind::UnexpectedToken { .. }
            | ParseErrorKind::UnexpectedEof { .. }
            | ParseErrorKind::InvalidImport { .. }
            | ParseErrorKind::NegativeIdent { .. }
            | ParseErrorKind::InvalidRange { .. }
            | ParseErrorKind::UnterminatedBody { .. } => ErrorCategory::Syntax,
            ParseErrorKind::UnknownSyntax { .. }
            | ParseErrorKind::SyntaxNotFirst { .. }
            | ParseErrorKind::DuplicateSyntax { .. }
            | ParseErrorKind::DuplicatePackage { .. } => ErrorCategory::Structural,
            _ => ErrorCategory::Semantic,
        }
    }
}

impl ParseError {
    pub(crate) fn new(mut related: Vec<ParseErrorKind>, name: &str, source: String) -> Self {
        debug_assert!(!related.is_empty());
        let kind = related.remove(0);
        ParseError {
            kind: Box::new(kind),
            related,
            source_code: NamedSource::new(name, source),
            file: name.to_owned(),
        }
    }

    /// Gets the name of the file in which this error occurred.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Gets the primary error.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Gets the primary source code span associated with this error.
    pub fn span(&self) -> Span {
        self.kind.span()
    }

    /// Iterates over every diagnostic, in the order they were found.
    pub fn errors(&self) -> impl Iterator<Item = &ParseErrorKind> {
        std::iter::once(&*self.kind).chain(&self.related)
    }

    /// The number of diagnostics.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.related.len() + 1
    }

    /// Gets the one-based line and column number of the start of `span`.
    pub fn line_col(&self, span: &Span) -> Option<(usize, usize)> {
        let contents = self
            .source_code
            .read_span(&span.clone().into(), 0, 0)
            .ok()?;
        Some((contents.line() + 1, contents.column() + 1))
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, err) in self.errors().enumerate() {
            if index != 0 {
                writeln!(f)?;
            }

            write!(f, "{}:", self.file)?;
            if let Some((line, col)) = self.line_col(&err.span()) {
                write!(f, "{}:{}:", line, col)?;
            }
            write!(f, " {}", err)?;
        }
        Ok(())
    }
}
