//! Static lookup tables for reserved words.
//!
//! Identifiers are lexed uniformly and classified here, so a keyword is only special in the
//! positions where the parser asks for one.

use std::{collections::HashMap, fmt};

use once_cell::sync::Lazy;

static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> =
    Lazy::new(|| Keyword::ALL.iter().map(|&kw| (kw.as_str(), kw)).collect());

static FILE_OPTIONS: Lazy<HashMap<&'static str, FileOptionName>> = Lazy::new(|| {
    FileOptionName::ALL
        .iter()
        .map(|&name| (name.as_str(), name))
        .collect()
});

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Keyword {
    Syntax,
    Import,
    Weak,
    Public,
    Package,
    Option,
    Optional,
    Required,
    Repeated,
    Oneof,
    Map,
    Reserved,
    Extensions,
    Extend,
    To,
    Max,
    Enum,
    Message,
    Service,
    Rpc,
    Stream,
    Returns,
}

impl Keyword {
    const ALL: [Keyword; 22] = [
        Keyword::Syntax,
        Keyword::Import,
        Keyword::Weak,
        Keyword::Public,
        Keyword::Package,
        Keyword::Option,
        Keyword::Optional,
        Keyword::Required,
        Keyword::Repeated,
        Keyword::Oneof,
        Keyword::Map,
        Keyword::Reserved,
        Keyword::Extensions,
        Keyword::Extend,
        Keyword::To,
        Keyword::Max,
        Keyword::Enum,
        Keyword::Message,
        Keyword::Service,
        Keyword::Rpc,
        Keyword::Stream,
        Keyword::Returns,
    ];

    /// Classifies an identifier, returning `None` for ordinary identifiers.
    pub fn lookup(ident: &str) -> Option<Keyword> {
        KEYWORDS.get(ident).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Syntax => "syntax",
            Keyword::Import => "import",
            Keyword::Weak => "weak",
            Keyword::Public => "public",
            Keyword::Package => "package",
            Keyword::Option => "option",
            Keyword::Optional => "optional",
            Keyword::Required => "required",
            Keyword::Repeated => "repeated",
            Keyword::Oneof => "oneof",
            Keyword::Map => "map",
            Keyword::Reserved => "reserved",
            Keyword::Extensions => "extensions",
            Keyword::Extend => "extend",
            Keyword::To => "to",
            Keyword::Max => "max",
            Keyword::Enum => "enum",
            Keyword::Message => "message",
            Keyword::Service => "service",
            Keyword::Rpc => "rpc",
            Keyword::Stream => "stream",
            Keyword::Returns => "returns",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The well-known options of `google.protobuf.FileOptions`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum FileOptionName {
    JavaPackage,
    JavaOuterClassname,
    JavaMultipleFiles,
    JavaGenerateEqualsAndHash,
    JavaStringCheckUtf8,
    OptimizeFor,
    GoPackage,
    CcGenericServices,
    JavaGenericServices,
    PyGenericServices,
    Deprecated,
    CcEnableArenas,
    ObjcClassPrefix,
    CsharpNamespace,
    SwiftPrefix,
    PhpClassPrefix,
    PhpNamespace,
    PhpMetadataNamespace,
    RubyPackage,
}

impl FileOptionName {
    const ALL: [FileOptionName; 19] = [
        FileOptionName::JavaPackage,
        FileOptionName::JavaOuterClassname,
        FileOptionName::JavaMultipleFiles,
        FileOptionName::JavaGenerateEqualsAndHash,
        FileOptionName::JavaStringCheckUtf8,
        FileOptionName::OptimizeFor,
        FileOptionName::GoPackage,
        FileOptionName::CcGenericServices,
        FileOptionName::JavaGenericServices,
        FileOptionName::PyGenericServices,
        FileOptionName::Deprecated,
        FileOptionName::CcEnableArenas,
        FileOptionName::ObjcClassPrefix,
        FileOptionName::CsharpNamespace,
        FileOptionName::SwiftPrefix,
        FileOptionName::PhpClassPrefix,
        FileOptionName::PhpNamespace,
        FileOptionName::PhpMetadataNamespace,
        FileOptionName::RubyPackage,
    ];

    pub fn lookup(name: &str) -> Option<FileOptionName> {
        FILE_OPTIONS.get(name).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileOptionName::JavaPackage => "java_package",
            FileOptionName::JavaOuterClassname => "java_outer_classname",
            FileOptionName::JavaMultipleFiles => "java_multiple_files",
            FileOptionName::JavaGenerateEqualsAndHash => "java_generate_equals_and_hash",
            FileOptionName::JavaStringCheckUtf8 => "java_string_check_utf8",
            FileOptionName::OptimizeFor => "optimize_for",
            FileOptionName::GoPackage => "go_package",
            FileOptionName::CcGenericServices => "cc_generic_services",
            FileOptionName::JavaGenericServices => "java_generic_services",
            FileOptionName::PyGenericServices => "py_generic_services",
            FileOptionName::Deprecated => "deprecated",
            FileOptionName::CcEnableArenas => "cc_enable_arenas",
            FileOptionName::ObjcClassPrefix => "objc_class_prefix",
            FileOptionName::CsharpNamespace => "csharp_namespace",
            FileOptionName::SwiftPrefix => "swift_prefix",
            FileOptionName::PhpClassPrefix => "php_class_prefix",
            FileOptionName::PhpNamespace => "php_namespace",
            FileOptionName::PhpMetadataNamespace => "php_metadata_namespace",
            FileOptionName::RubyPackage => "ruby_package",
        }
    }
}
