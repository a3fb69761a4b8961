use std::fmt;

use logos::Span;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct File {
    pub syntax: Syntax,
    pub syntax_span: std::option::Option<Span>,
    pub package: std::option::Option<Package>,
    pub imports: Vec<Import>,
    pub options: Vec<Option>,
    pub messages: Vec<Message>,
    pub enums: Vec<Enum>,
    pub extends: Vec<Extend>,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Syntax {
    #[default]
    Proto2,
    Proto3,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Ident {
    pub value: std::string::String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FullIdent {
    pub parts: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TypeName {
    pub leading_dot: std::option::Option<Span>,
    pub name: FullIdent,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Package {
    pub name: FullIdent,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImportKind {
    Weak,
    Public,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Import {
    pub kind: std::option::Option<(ImportKind, Span)>,
    pub value: std::string::String,
    pub value_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Int {
    pub negative: bool,
    pub value: u64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Float {
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct String {
    pub value: Vec<u8>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OptionValue {
    Ident {
        negative: bool,
        ident: Ident,
        span: Span,
    },
    Int(Int),
    Float(Float),
    String(String),
    Aggregate(std::string::String, Span),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Option {
    pub body: OptionBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OptionNamePart {
    Ident(Ident),
    Extension(TypeName, Span),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OptionBody {
    pub name: Vec<OptionNamePart>,
    pub value: OptionValue,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OptionList {
    pub options: Vec<OptionBody>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Message {
    pub name: Ident,
    pub body: MessageBody,
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MessageBody {
    pub items: Vec<MessageItem>,
    pub options: Vec<Option>,
    pub reserved: Vec<Reserved>,
    pub extensions: Vec<Extensions>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MessageItem {
    Field(Field),
    Oneof(Oneof),
    Message(Message),
    Enum(Enum),
    Extend(Extend),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldLabel {
    Optional,
    Required,
    Repeated,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Field {
    pub label: std::option::Option<(FieldLabel, Span)>,
    pub kind: FieldKind,
    pub name: Ident,
    pub number: Int,
    pub options: std::option::Option<OptionList>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldKind {
    Normal {
        ty: Ty,
        ty_span: Span,
    },
    Map {
        key_ty: Ty,
        key_ty_span: Span,
        value_ty: Ty,
        value_ty_span: Span,
        ty_span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Ty {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Named(TypeName),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Oneof {
    pub name: Ident,
    pub options: Vec<Option>,
    pub fields: Vec<Field>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Extend {
    pub extendee: TypeName,
    pub fields: Vec<Field>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Reserved {
    pub kind: ReservedKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReservedKind {
    Ranges(Vec<ReservedRange>),
    Names(Vec<Ident>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Extensions {
    pub ranges: Vec<ReservedRange>,
    pub options: std::option::Option<OptionList>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReservedRange {
    pub start: Int,
    pub end: ReservedRangeEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReservedRangeEnd {
    None,
    Int(Int),
    Max(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Enum {
    pub name: Ident,
    pub options: Vec<Option>,
    pub values: Vec<EnumValue>,
    pub reserved: Vec<Reserved>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EnumValue {
    pub name: Ident,
    pub number: Int,
    pub options: std::option::Option<OptionList>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Service {
    pub name: Ident,
    pub options: Vec<Option>,
    pub methods: Vec<Method>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Method {
    pub name: Ident,
    pub input_ty: TypeName,
    pub output_ty: TypeName,
    pub options: Vec<Option>,
    pub client_streaming: std::option::Option<Span>,
    pub server_streaming: std::option::Option<Span>,
    pub span: Span,
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Proto2 => write!(f, "proto2"),
            Syntax::Proto3 => write!(f, "proto3"),
        }
    }
}

impl Ident {
    pub fn new(value: impl Into<std::string::String>, span: Span) -> Self {
        Ident {
            value: value.into(),
            span,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl FullIdent {
    pub fn span(&self) -> Span {
        let start = self.parts.first().map_or(0, |part| part.span.start);
        let end = self.parts.last().map_or(0, |part| part.span.end);
        start..end
    }
}

impl From<Ident> for FullIdent {
    fn from(ident: Ident) -> Self {
        FullIdent { parts: vec![ident] }
    }
}

impl fmt::Display for FullIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index != 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl TypeName {
    pub fn span(&self) -> Span {
        let name = self.name.span();
        match &self.leading_dot {
            Some(dot) => dot.start..name.end,
            None => name,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.leading_dot.is_some() {
            write!(f, ".")?;
        }
        write!(f, "{}", self.name)
    }
}

impl Int {
    /// Converts to an `i64`, returning `None` if out of range.
    pub fn as_i64(&self) -> std::option::Option<i64> {
        if self.negative {
            if self.value <= i64::MAX as u64 {
                Some(-(self.value as i64))
            } else if self.value == i64::MAX as u64 + 1 {
                Some(i64::MIN)
            } else {
                None
            }
        } else {
            i64::try_from(self.value).ok()
        }
    }

    pub fn as_i32(&self) -> std::option::Option<i32> {
        self.as_i64().and_then(|value| i32::try_from(value).ok())
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "{}", self.value)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Ident {
                negative, ident, ..
            } => {
                if *negative {
                    write!(f, "-")?;
                }
                write!(f, "{}", ident)
            }
            OptionValue::Int(int) => write!(f, "{}", int),
            OptionValue::Float(float) => {
                if float.value.fract() == 0.0 {
                    write!(f, "{:.1}", float.value)
                } else {
                    write!(f, "{}", float.value)
                }
            }
            OptionValue::String(string) => {
                write!(f, "\"")?;
                for &ch in &string.value {
                    write!(f, "{}", std::ascii::escape_default(ch))?;
                }
                write!(f, "\"")
            }
            OptionValue::Aggregate(value, _) => write!(f, "{{{}}}", value),
        }
    }
}

impl OptionValue {
    pub fn span(&self) -> Span {
        match self {
            OptionValue::Ident { span, .. } => span.clone(),
            OptionValue::Int(int) => int.span.clone(),
            OptionValue::Float(float) => float.span.clone(),
            OptionValue::String(string) => string.span.clone(),
            OptionValue::Aggregate(_, span) => span.clone(),
        }
    }
}

impl OptionBody {
    /// Returns the option name if it is a single plain identifier, such as `deprecated`.
    pub fn simple_name(&self) -> std::option::Option<&Ident> {
        match self.name.as_slice() {
            [OptionNamePart::Ident(ident)] => Some(ident),
            _ => None,
        }
    }

    pub fn name_span(&self) -> Span {
        let span = |part: &OptionNamePart| match part {
            OptionNamePart::Ident(ident) => ident.span.clone(),
            OptionNamePart::Extension(_, span) => span.clone(),
        };
        match (self.name.first(), self.name.last()) {
            (Some(first), Some(last)) => span(first).start..span(last).end,
            _ => self.value.span(),
        }
    }
}

impl fmt::Display for OptionNamePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionNamePart::Ident(ident) => write!(f, "{}", ident),
            OptionNamePart::Extension(name, _) => write!(f, "({})", name),
        }
    }
}

impl Ty {
    pub fn from_scalar_name(name: &str) -> std::option::Option<Ty> {
        match name {
            "double" => Some(Ty::Double),
            "float" => Some(Ty::Float),
            "int32" => Some(Ty::Int32),
            "int64" => Some(Ty::Int64),
            "uint32" => Some(Ty::Uint32),
            "uint64" => Some(Ty::Uint64),
            "sint32" => Some(Ty::Sint32),
            "sint64" => Some(Ty::Sint64),
            "fixed32" => Some(Ty::Fixed32),
            "fixed64" => Some(Ty::Fixed64),
            "sfixed32" => Some(Ty::Sfixed32),
            "sfixed64" => Some(Ty::Sfixed64),
            "bool" => Some(Ty::Bool),
            "string" => Some(Ty::String),
            "bytes" => Some(Ty::Bytes),
            _ => None,
        }
    }

    /// Returns true if this type may be used as the key of a map field.
    pub fn is_valid_map_key(&self) -> bool {
        !matches!(
            self,
            Ty::Double | Ty::Float | Ty::Bytes | Ty::Named(_)
        )
    }
}

impl ReservedRange {
    pub fn span(&self) -> Span {
        match &self.end {
            ReservedRangeEnd::None => self.start.span.clone(),
            ReservedRangeEnd::Int(end) => self.start.span.start..end.span.end,
            ReservedRangeEnd::Max(end) => self.start.span.start..end.end,
        }
    }
}
