use std::{
    collections::{hash_map, HashMap},
    fmt::Write,
};

use logos::Span;
use prost_types::{
    field_descriptor_proto::{Label, Type},
    field_options::{CType, JsType},
    file_options::OptimizeMode,
    method_options::IdempotencyLevel,
    uninterpreted_option::NamePart,
    EnumOptions, EnumValueOptions, ExtensionRangeOptions, FieldOptions, FileOptions,
    MessageOptions, MethodOptions, OneofOptions, ServiceOptions, UninterpretedOption,
};

use super::Context;
use crate::{ast, error::ParseErrorKind, keyword::FileOptionName};

const MESSAGE_OPTIONS: &[&str] = &[
    "message_set_wire_format",
    "no_standard_descriptor_accessor",
    "deprecated",
    "map_entry",
];
const FIELD_OPTIONS: &[&str] = &[
    "ctype",
    "packed",
    "jstype",
    "lazy",
    "deprecated",
    "weak",
    "default",
    "json_name",
];
const ENUM_OPTIONS: &[&str] = &["allow_alias", "deprecated"];
const DEPRECATED_OPTION: &[&str] = &["deprecated"];
const METHOD_OPTIONS: &[&str] = &["deprecated", "idempotency_level"];

/// How an option name is interpreted.
enum OptionName<K> {
    /// A field of the options message.
    Known(K),
    /// A known option which was already set in the same list.
    Duplicate,
    /// An extension or unknown name, kept as an uninterpreted option.
    Custom,
}

impl<'a> Context<'a> {
    pub(super) fn generate_file_options(&mut self, options: &[ast::Option]) -> Option<FileOptions> {
        let mut result = FileOptions::default();
        let mut seen = HashMap::new();

        for body in options.iter().map(|option| &option.body) {
            let name = match self.option_name(body, FileOptionName::lookup, &mut seen) {
                OptionName::Known(name) => name,
                OptionName::Duplicate => continue,
                OptionName::Custom => {
                    result
                        .uninterpreted_option
                        .push(self.uninterpreted_option(body));
                    continue;
                }
            };

            let value = &body.value;
            match name {
                FileOptionName::JavaPackage => result.java_package = self.check_string(value),
                FileOptionName::JavaOuterClassname => {
                    result.java_outer_classname = self.check_string(value)
                }
                FileOptionName::JavaMultipleFiles => {
                    result.java_multiple_files = self.check_bool(value)
                }
                #[allow(deprecated)]
                FileOptionName::JavaGenerateEqualsAndHash => {
                    result.java_generate_equals_and_hash = self.check_bool(value)
                }
                FileOptionName::JavaStringCheckUtf8 => {
                    result.java_string_check_utf8 = self.check_bool(value)
                }
                FileOptionName::OptimizeFor => {
                    result.optimize_for = self.check_enum(
                        value,
                        "google.protobuf.FileOptions.OptimizeMode",
                        |name| OptimizeMode::from_str_name(name).map(|mode| mode as i32),
                    )
                }
                FileOptionName::GoPackage => result.go_package = self.check_string(value),
                FileOptionName::CcGenericServices => {
                    result.cc_generic_services = self.check_bool(value)
                }
                FileOptionName::JavaGenericServices => {
                    result.java_generic_services = self.check_bool(value)
                }
                FileOptionName::PyGenericServices => {
                    result.py_generic_services = self.check_bool(value)
                }
                FileOptionName::Deprecated => result.deprecated = self.check_bool(value),
                FileOptionName::CcEnableArenas => result.cc_enable_arenas = self.check_bool(value),
                FileOptionName::ObjcClassPrefix => {
                    result.objc_class_prefix = self.check_string(value)
                }
                FileOptionName::CsharpNamespace => {
                    result.csharp_namespace = self.check_string(value)
                }
                FileOptionName::SwiftPrefix => result.swift_prefix = self.check_string(value),
                FileOptionName::PhpClassPrefix => {
                    result.php_class_prefix = self.check_string(value)
                }
                FileOptionName::PhpNamespace => result.php_namespace = self.check_string(value),
                FileOptionName::PhpMetadataNamespace => {
                    result.php_metadata_namespace = self.check_string(value)
                }
                FileOptionName::RubyPackage => result.ruby_package = self.check_string(value),
            }
        }

        non_default(result)
    }

    pub(super) fn generate_message_options(
        &mut self,
        options: &[ast::Option],
    ) -> Option<MessageOptions> {
        let mut result = MessageOptions::default();
        let mut seen = HashMap::new();

        for body in options.iter().map(|option| &option.body) {
            let name = match self.option_name(body, lookup(MESSAGE_OPTIONS), &mut seen) {
                OptionName::Known(name) => name,
                OptionName::Duplicate => continue,
                OptionName::Custom => {
                    result
                        .uninterpreted_option
                        .push(self.uninterpreted_option(body));
                    continue;
                }
            };

            match name {
                "message_set_wire_format" => {
                    result.message_set_wire_format = self.check_bool(&body.value)
                }
                "no_standard_descriptor_accessor" => {
                    result.no_standard_descriptor_accessor = self.check_bool(&body.value)
                }
                "deprecated" => result.deprecated = self.check_bool(&body.value),
                _ => self.errors.push(ParseErrorKind::MapEntryOptionSet {
                    span: body.name_span(),
                }),
            }
        }

        non_default(result)
    }

    /// Interprets the options of a field, returning the `default` and `json_name`
    /// pseudo-options separately.
    pub(super) fn generate_field_options<'b>(
        &mut self,
        options: Option<&'b ast::OptionList>,
    ) -> (
        Option<FieldOptions>,
        Option<&'b ast::OptionBody>,
        Option<String>,
    ) {
        let mut result = FieldOptions::default();
        let mut default = None;
        let mut json_name = None;
        let mut seen = HashMap::new();

        for body in options.into_iter().flat_map(|list| &list.options) {
            let name = match self.option_name(body, lookup(FIELD_OPTIONS), &mut seen) {
                OptionName::Known(name) => name,
                OptionName::Duplicate => continue,
                OptionName::Custom => {
                    result
                        .uninterpreted_option
                        .push(self.uninterpreted_option(body));
                    continue;
                }
            };

            let value = &body.value;
            match name {
                "ctype" => {
                    result.ctype = self.check_enum(value, "google.protobuf.FieldOptions.CType", |name| {
                        CType::from_str_name(name).map(|ty| ty as i32)
                    })
                }
                "packed" => result.packed = self.check_bool(value),
                "jstype" => {
                    result.jstype = self.check_enum(value, "google.protobuf.FieldOptions.JSType", |name| {
                        JsType::from_str_name(name).map(|ty| ty as i32)
                    })
                }
                "lazy" => result.lazy = self.check_bool(value),
                "deprecated" => result.deprecated = self.check_bool(value),
                "weak" => result.weak = self.check_bool(value),
                "default" => default = Some(body),
                _ => json_name = self.check_string(value),
            }
        }

        (non_default(result), default, json_name)
    }

    pub(super) fn generate_extension_range_options(
        &mut self,
        options: Option<&ast::OptionList>,
    ) -> Option<ExtensionRangeOptions> {
        let uninterpreted_option = options
            .into_iter()
            .flat_map(|list| &list.options)
            .map(|body| self.uninterpreted_option(body))
            .collect();

        non_default(ExtensionRangeOptions {
            uninterpreted_option,
            ..Default::default()
        })
    }

    pub(super) fn generate_oneof_options(&mut self, options: &[ast::Option]) -> Option<OneofOptions> {
        let uninterpreted_option = options
            .iter()
            .map(|option| self.uninterpreted_option(&option.body))
            .collect();

        non_default(OneofOptions {
            uninterpreted_option,
            ..Default::default()
        })
    }

    pub(super) fn generate_enum_options(&mut self, options: &[ast::Option]) -> Option<EnumOptions> {
        let mut result = EnumOptions::default();
        let mut seen = HashMap::new();

        for body in options.iter().map(|option| &option.body) {
            match self.option_name(body, lookup(ENUM_OPTIONS), &mut seen) {
                OptionName::Known("allow_alias") => result.allow_alias = self.check_bool(&body.value),
                OptionName::Known(_) => result.deprecated = self.check_bool(&body.value),
                OptionName::Duplicate => (),
                OptionName::Custom => result
                    .uninterpreted_option
                    .push(self.uninterpreted_option(body)),
            }
        }

        non_default(result)
    }

    pub(super) fn generate_enum_value_options(
        &mut self,
        options: Option<&ast::OptionList>,
    ) -> Option<EnumValueOptions> {
        let mut result = EnumValueOptions::default();
        let mut seen = HashMap::new();

        for body in options.into_iter().flat_map(|list| &list.options) {
            match self.option_name(body, lookup(DEPRECATED_OPTION), &mut seen) {
                OptionName::Known(_) => result.deprecated = self.check_bool(&body.value),
                OptionName::Duplicate => (),
                OptionName::Custom => result
                    .uninterpreted_option
                    .push(self.uninterpreted_option(body)),
            }
        }

        non_default(result)
    }

    pub(super) fn generate_service_options(
        &mut self,
        options: &[ast::Option],
    ) -> Option<ServiceOptions> {
        let mut result = ServiceOptions::default();
        let mut seen = HashMap::new();

        for body in options.iter().map(|option| &option.body) {
            match self.option_name(body, lookup(DEPRECATED_OPTION), &mut seen) {
                OptionName::Known(_) => result.deprecated = self.check_bool(&body.value),
                OptionName::Duplicate => (),
                OptionName::Custom => result
                    .uninterpreted_option
                    .push(self.uninterpreted_option(body)),
            }
        }

        non_default(result)
    }

    pub(super) fn generate_method_options(&mut self, options: &[ast::Option]) -> Option<MethodOptions> {
        let mut result = MethodOptions::default();
        let mut seen = HashMap::new();

        for body in options.iter().map(|option| &option.body) {
            match self.option_name(body, lookup(METHOD_OPTIONS), &mut seen) {
                OptionName::Known("deprecated") => result.deprecated = self.check_bool(&body.value),
                OptionName::Known(_) => {
                    result.idempotency_level = self.check_enum(
                        &body.value,
                        "google.protobuf.MethodOptions.IdempotencyLevel",
                        |name| IdempotencyLevel::from_str_name(name).map(|level| level as i32),
                    )
                }
                OptionName::Duplicate => (),
                OptionName::Custom => result
                    .uninterpreted_option
                    .push(self.uninterpreted_option(body)),
            }
        }

        non_default(result)
    }

    /// Checks the `default` pseudo-option of a field against its type, returning the value
    /// in the text form used by `FieldDescriptorProto.default_value`.
    pub(super) fn check_default_value(
        &mut self,
        field: &ast::Field,
        label: Label,
        ty: Option<Type>,
        type_name: Option<&str>,
        option: &ast::OptionBody,
    ) -> Option<String> {
        let span = option.name_span().start..option.value.span().end;
        if self.syntax == ast::Syntax::Proto3 {
            self.errors
                .push(ParseErrorKind::Proto3DefaultValue { span });
            return None;
        }

        let invalid_kind = match (&field.kind, label, ty) {
            (ast::FieldKind::Map { .. }, _, _) => Some("map"),
            (_, Label::Repeated, _) => Some("repeated"),
            (_, _, Some(Type::Message | Type::Group)) => Some("message"),
            _ => None,
        };
        if let Some(kind) = invalid_kind {
            self.errors
                .push(ParseErrorKind::InvalidDefault { kind, span });
            return None;
        }

        let value = &option.value;
        match ty {
            Some(Type::Double | Type::Float) => self.check_float(value),
            Some(Type::Int32 | Type::Sint32 | Type::Sfixed32) => self
                .check_int(value, "a signed 32-bit integer", i32::MIN.into(), i32::MAX.into())
                .map(|int| int.to_string()),
            Some(Type::Int64 | Type::Sint64 | Type::Sfixed64) => self
                .check_int(value, "a signed 64-bit integer", i64::MIN.into(), i64::MAX.into())
                .map(|int| int.to_string()),
            Some(Type::Uint32 | Type::Fixed32) => self
                .check_int(value, "an unsigned 32-bit integer", 0, u32::MAX.into())
                .map(|int| int.to_string()),
            Some(Type::Uint64 | Type::Fixed64) => self
                .check_int(value, "an unsigned 64-bit integer", 0, u64::MAX.into())
                .map(|int| int.to_string()),
            Some(Type::Bool) => self.check_bool(value).map(|value| value.to_string()),
            Some(Type::String) => self.check_string(value),
            Some(Type::Bytes) => self.check_bytes(value).map(|bytes| c_escape(&bytes)),
            Some(Type::Enum) => self.check_enum_default(value, type_name.unwrap_or_default()),
            // The type could not be resolved, so the value is kept as written.
            Some(Type::Message | Type::Group) | None => match value {
                ast::OptionValue::String(string) => {
                    Some(String::from_utf8_lossy(&string.value).into_owned())
                }
                _ => Some(value.to_string()),
            },
        }
    }

    fn option_name<K>(
        &mut self,
        body: &ast::OptionBody,
        lookup: impl Fn(&str) -> Option<K>,
        seen: &mut HashMap<String, Span>,
    ) -> OptionName<K> {
        let known = body
            .simple_name()
            .and_then(|name| lookup(&name.value).map(|known| (known, name)));
        let (known, name) = match known {
            Some(known) => known,
            None => return OptionName::Custom,
        };

        match seen.entry(name.value.clone()) {
            hash_map::Entry::Occupied(entry) => {
                self.errors.push(ParseErrorKind::DuplicateOption {
                    name: name.value.clone(),
                    first: entry.get().clone(),
                    second: name.span.clone(),
                });
                OptionName::Duplicate
            }
            hash_map::Entry::Vacant(entry) => {
                entry.insert(name.span.clone());
                OptionName::Known(known)
            }
        }
    }

    fn uninterpreted_option(&mut self, body: &ast::OptionBody) -> UninterpretedOption {
        let name = body
            .name
            .iter()
            .map(|part| match part {
                ast::OptionNamePart::Ident(ident) => NamePart {
                    name_part: ident.value.clone(),
                    is_extension: false,
                },
                ast::OptionNamePart::Extension(name, _) => NamePart {
                    name_part: name.to_string(),
                    is_extension: true,
                },
            })
            .collect();

        let mut result = UninterpretedOption {
            name,
            ..Default::default()
        };
        match &body.value {
            ast::OptionValue::Ident {
                negative: false,
                ident,
                ..
            } => result.identifier_value = Some(ident.value.clone()),
            ast::OptionValue::Ident {
                negative: true,
                ident,
                ..
            } => {
                result.double_value = Some(if ident.value == "inf" {
                    f64::NEG_INFINITY
                } else {
                    f64::NAN
                })
            }
            ast::OptionValue::Int(int) if !int.negative => {
                result.positive_int_value = Some(int.value)
            }
            ast::OptionValue::Int(int) => match int.as_i64() {
                Some(value) => result.negative_int_value = Some(value),
                None => self.errors.push(ParseErrorKind::IntegerValueOutOfRange {
                    expected: "a signed 64-bit integer".to_owned(),
                    actual: int.to_string(),
                    min: i64::MIN.to_string(),
                    max: i64::MAX.to_string(),
                    span: int.span.clone(),
                }),
            },
            ast::OptionValue::Float(float) => result.double_value = Some(float.value),
            ast::OptionValue::String(string) => result.string_value = Some(string.value.clone()),
            ast::OptionValue::Aggregate(text, _) => result.aggregate_value = Some(text.clone()),
        }
        result
    }

    fn check_bool(&mut self, value: &ast::OptionValue) -> Option<bool> {
        match value {
            ast::OptionValue::Ident {
                negative: false,
                ident,
                ..
            } if ident.value == "true" => Some(true),
            ast::OptionValue::Ident {
                negative: false,
                ident,
                ..
            } if ident.value == "false" => Some(false),
            _ => {
                self.errors.push(ParseErrorKind::ValueInvalidType {
                    expected: "either 'true' or 'false'".to_owned(),
                    actual: value.to_string(),
                    span: value.span(),
                });
                None
            }
        }
    }

    fn check_string(&mut self, value: &ast::OptionValue) -> Option<String> {
        let bytes = self.check_bytes(value)?;
        match String::from_utf8(bytes) {
            Ok(string) => Some(string),
            Err(_) => {
                self.errors
                    .push(ParseErrorKind::InvalidUtf8String { span: value.span() });
                None
            }
        }
    }

    fn check_bytes(&mut self, value: &ast::OptionValue) -> Option<Vec<u8>> {
        match value {
            ast::OptionValue::String(string) => Some(string.value.clone()),
            _ => {
                self.errors.push(ParseErrorKind::ValueInvalidType {
                    expected: "a string".to_owned(),
                    actual: value.to_string(),
                    span: value.span(),
                });
                None
            }
        }
    }

    fn check_enum(
        &mut self,
        value: &ast::OptionValue,
        enum_name: &str,
        from_str_name: impl Fn(&str) -> Option<i32>,
    ) -> Option<i32> {
        if let ast::OptionValue::Ident {
            negative: false,
            ident,
            ..
        } = value
        {
            if let Some(number) = from_str_name(&ident.value) {
                return Some(number);
            }
        }

        self.errors.push(ParseErrorKind::ValueInvalidType {
            expected: format!("a value of enum '{}'", enum_name),
            actual: value.to_string(),
            span: value.span(),
        });
        None
    }

    fn check_enum_default(&mut self, value: &ast::OptionValue, enum_name: &str) -> Option<String> {
        match value {
            ast::OptionValue::Ident {
                negative: false,
                ident,
                ..
            } if self.names.is_enum_value(enum_name, &ident.value) => Some(ident.value.clone()),
            _ => {
                self.errors.push(ParseErrorKind::ValueInvalidType {
                    expected: format!(
                        "a value of enum '{}'",
                        enum_name.strip_prefix('.').unwrap_or(enum_name)
                    ),
                    actual: value.to_string(),
                    span: value.span(),
                });
                None
            }
        }
    }

    fn check_int(
        &mut self,
        value: &ast::OptionValue,
        expected: &str,
        min: i128,
        max: i128,
    ) -> Option<i128> {
        let int = match value {
            ast::OptionValue::Int(int) => int,
            _ => {
                self.errors.push(ParseErrorKind::ValueInvalidType {
                    expected: expected.to_owned(),
                    actual: value.to_string(),
                    span: value.span(),
                });
                return None;
            }
        };

        let number = if int.negative {
            -i128::from(int.value)
        } else {
            i128::from(int.value)
        };
        if (min..=max).contains(&number) {
            Some(number)
        } else {
            self.errors.push(ParseErrorKind::IntegerValueOutOfRange {
                expected: expected.to_owned(),
                actual: int.to_string(),
                min: min.to_string(),
                max: max.to_string(),
                span: int.span.clone(),
            });
            None
        }
    }

    fn check_float(&mut self, value: &ast::OptionValue) -> Option<String> {
        match value {
            ast::OptionValue::Float(float) => Some(float.value.to_string()),
            ast::OptionValue::Int(int) => Some(int.to_string()),
            ast::OptionValue::Ident {
                negative, ident, ..
            } if ident.value == "inf" => {
                Some(if *negative { "-inf" } else { "inf" }.to_owned())
            }
            ast::OptionValue::Ident { ident, .. } if ident.value == "nan" => Some("nan".to_owned()),
            _ => {
                self.errors.push(ParseErrorKind::ValueInvalidType {
                    expected: "a float".to_owned(),
                    actual: value.to_string(),
                    span: value.span(),
                });
                None
            }
        }
    }
}

fn lookup(names: &'static [&'static str]) -> impl Fn(&str) -> Option<&'static str> {
    move |name: &str| names.iter().find(|&&known| known == name).copied()
}

fn non_default<T: Default + PartialEq>(value: T) -> Option<T> {
    if value == T::default() {
        None
    } else {
        Some(value)
    }
}

/// Escapes bytes the way `protoc` writes the default value of a `bytes` field.
fn c_escape(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len());
    for &byte in bytes {
        match byte {
            b'\n' => result.push_str("\\n"),
            b'\r' => result.push_str("\\r"),
            b'\t' => result.push_str("\\t"),
            b'"' => result.push_str("\\\""),
            b'\'' => result.push_str("\\\'"),
            b'\\' => result.push_str("\\\\"),
            b' '..=b'~' => result.push(char::from(byte)),
            _ => {
                let _ = write!(result, "\\{:03o}", byte);
            }
        }
    }
    result
}
