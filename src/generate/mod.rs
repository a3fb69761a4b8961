//! Assembles the descriptor tree of a file from its AST.

mod options;
#[cfg(test)]
mod tests;

use std::{
    collections::{hash_map, HashMap},
    fmt::Display,
    ops::RangeInclusive,
};

use log::trace;
use logos::Span;
use prost_types::{
    descriptor_proto::{ExtensionRange, ReservedRange},
    enum_descriptor_proto::EnumReservedRange,
    field_descriptor_proto::{Label, Type},
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, MethodDescriptorProto, OneofDescriptorProto,
    ServiceDescriptorProto,
};

use crate::{
    ast,
    case::to_json_name,
    error::ParseErrorKind,
    names::{make_name, map_entry_name, DefinitionKind, NameMap},
    MAX_MESSAGE_FIELD_NUMBER,
};

const RESERVED_MESSAGE_FIELD_NUMBERS: RangeInclusive<i32> = 19_000..=19_999;

/// Builds the descriptor for `file`, returning it along with any problems found.
pub(crate) fn generate(
    name: &str,
    file: &ast::File,
    names: &NameMap,
) -> (FileDescriptorProto, Vec<ParseErrorKind>) {
    let mut context = Context {
        syntax: file.syntax,
        names,
        has_imports: !file.imports.is_empty(),
        scope: Vec::new(),
        errors: Vec::new(),
    };

    let descriptor = context.generate_file(name, file);
    debug_assert!(context.scope.is_empty());

    (descriptor, context.errors)
}

struct Context<'a> {
    syntax: ast::Syntax,
    names: &'a NameMap,
    /// Type names which cannot be resolved are assumed to be defined in an import.
    has_imports: bool,
    scope: Vec<Scope>,
    errors: Vec<ParseErrorKind>,
}

enum Scope {
    Package { full_name: String },
    Message { full_name: String },
}

/// A field number or name which may not be used by fields of a message or values of an enum.
struct Reservations<'b> {
    ranges: Vec<(RangeInclusive<i32>, Span)>,
    names: Vec<&'b ast::Ident>,
    extensions: Vec<(RangeInclusive<i32>, Span)>,
}

impl<'a> Context<'a> {
    fn enter(&mut self, scope: Scope) {
        self.scope.push(scope);
    }

    fn exit(&mut self) {
        self.scope.pop().expect("unbalanced scope stack");
    }

    fn scope_name(&self) -> &str {
        match self.scope.last() {
            Some(Scope::Message { full_name } | Scope::Package { full_name }) => full_name,
            None => "",
        }
    }

    fn full_name(&self, name: impl Display) -> String {
        make_name(self.scope_name(), name)
    }

    fn generate_file(&mut self, name: &str, file: &ast::File) -> FileDescriptorProto {
        if let Some(package) = &file.package {
            self.enter(Scope::Package {
                full_name: package.name.to_string(),
            });
        }

        let package = file.package.as_ref().map(|p| p.name.to_string());

        let mut dependency = Vec::with_capacity(file.imports.len());
        let mut public_dependency = Vec::new();
        let mut weak_dependency = Vec::new();
        for import in &file.imports {
            let index = index_to_i32(dependency.len());
            dependency.push(import.value.clone());
            match &import.kind {
                Some((ast::ImportKind::Public, _)) => public_dependency.push(index),
                Some((ast::ImportKind::Weak, _)) => weak_dependency.push(index),
                None => (),
            }
        }

        let message_type = file
            .messages
            .iter()
            .map(|message| self.generate_message(message))
            .collect();
        let enum_type = file.enums.iter().map(|e| self.generate_enum(e)).collect();

        let mut extension = Vec::new();
        for extend in &file.extends {
            self.generate_extend(extend, &mut extension);
        }

        let service = file
            .services
            .iter()
            .map(|service| self.generate_service(service))
            .collect();

        let options = self.generate_file_options(&file.options);

        if file.package.is_some() {
            self.exit();
        }

        FileDescriptorProto {
            name: Some(name.to_owned()),
            package,
            dependency,
            public_dependency,
            weak_dependency,
            message_type,
            enum_type,
            service,
            extension,
            options,
            source_code_info: None,
            syntax: Some(self.syntax.to_string()),
            ..Default::default()
        }
    }

    fn generate_message(&mut self, message: &ast::Message) -> DescriptorProto {
        self.enter(Scope::Message {
            full_name: self.full_name(&message.name),
        });

        let body = &message.body;
        let real_oneof_count = body
            .items
            .iter()
            .filter(|item| matches!(item, ast::MessageItem::Oneof(_)))
            .count();

        let mut field = Vec::new();
        let mut nested_type = Vec::new();
        let mut enum_type = Vec::new();
        let mut extension = Vec::new();
        let mut oneof_decl = Vec::new();
        let mut synthetic_oneofs = Vec::new();
        let mut numbers = Vec::new();

        for item in &body.items {
            match item {
                ast::MessageItem::Field(ast_field) => {
                    if let ast::FieldKind::Map {
                        key_ty,
                        key_ty_span,
                        value_ty,
                        ..
                    } = &ast_field.kind
                    {
                        nested_type.push(self.generate_map_entry(
                            ast_field,
                            key_ty,
                            key_ty_span.clone(),
                            value_ty,
                        ));
                    }

                    let (label, proto3_optional) = self.check_field_label(ast_field);
                    let mut desc = self.generate_field(ast_field, label);
                    if proto3_optional {
                        desc.proto3_optional = Some(true);
                        desc.oneof_index =
                            Some(index_to_i32(real_oneof_count + synthetic_oneofs.len()));
                        synthetic_oneofs.push(OneofDescriptorProto {
                            name: Some(format!("_{}", ast_field.name)),
                            options: None,
                        });
                    }
                    numbers.push((desc.number, ast_field));
                    field.push(desc);
                }
                ast::MessageItem::Oneof(oneof) => {
                    let index = index_to_i32(oneof_decl.len());
                    oneof_decl.push(self.generate_oneof(oneof));
                    for ast_field in &oneof.fields {
                        let label = self.check_oneof_field_label(ast_field);
                        let desc = FieldDescriptorProto {
                            oneof_index: Some(index),
                            ..self.generate_field(ast_field, label)
                        };
                        numbers.push((desc.number, ast_field));
                        field.push(desc);
                    }
                }
                ast::MessageItem::Message(nested) => {
                    nested_type.push(self.generate_message(nested))
                }
                ast::MessageItem::Enum(e) => enum_type.push(self.generate_enum(e)),
                ast::MessageItem::Extend(extend) => self.generate_extend(extend, &mut extension),
            }
        }
        oneof_decl.extend(synthetic_oneofs);

        let mut reservations = Reservations {
            ranges: Vec::new(),
            names: Vec::new(),
            extensions: Vec::new(),
        };
        let mut reserved_range = Vec::new();
        let mut reserved_name = Vec::new();
        for reserved in &body.reserved {
            match &reserved.kind {
                ast::ReservedKind::Ranges(ranges) => {
                    for range in ranges {
                        let (start, end) = self.check_message_range(range);
                        if let (Some(start), Some(end)) = (start, end) {
                            reservations.ranges.push((start..=end, range.span()));
                        }
                        reserved_range.push(ReservedRange {
                            start,
                            end: end.map(|end| end + 1),
                        });
                    }
                }
                ast::ReservedKind::Names(names) => {
                    reservations.names.extend(names);
                    reserved_name.extend(names.iter().map(|name| name.value.clone()));
                }
            }
        }

        let mut extension_range = Vec::new();
        for extensions in &body.extensions {
            let options = self.generate_extension_range_options(extensions.options.as_ref());
            for range in &extensions.ranges {
                let (start, end) = self.check_message_range(range);
                if let (Some(start), Some(end)) = (start, end) {
                    reservations.extensions.push((start..=end, range.span()));
                }
                extension_range.push(ExtensionRange {
                    start,
                    end: end.map(|end| end + 1),
                    options: options.clone(),
                });
            }
        }

        self.check_field_numbers(&numbers, &reservations);

        let options = self.generate_message_options(&body.options);

        self.exit();
        DescriptorProto {
            name: Some(message.name.value.clone()),
            field,
            extension,
            nested_type,
            enum_type,
            extension_range,
            oneof_decl,
            options,
            reserved_range,
            reserved_name,
        }
    }

    fn generate_map_entry(
        &mut self,
        field: &ast::Field,
        key_ty: &ast::Ty,
        key_ty_span: Span,
        value_ty: &ast::Ty,
    ) -> DescriptorProto {
        let key_type = if key_ty.is_valid_map_key() {
            scalar_type(key_ty)
        } else {
            self.errors
                .push(ParseErrorKind::InvalidMapFieldKeyType { span: key_ty_span });
            None
        };
        let (value_type, value_type_name) = self.check_type(value_ty);

        DescriptorProto {
            name: Some(map_entry_name(&field.name.value)),
            field: vec![
                FieldDescriptorProto {
                    name: Some("key".to_owned()),
                    number: Some(1),
                    label: Some(Label::Optional as i32),
                    r#type: key_type.map(|ty| ty as i32),
                    json_name: Some("key".to_owned()),
                    ..Default::default()
                },
                FieldDescriptorProto {
                    name: Some("value".to_owned()),
                    number: Some(2),
                    label: Some(Label::Optional as i32),
                    r#type: value_type.map(|ty| ty as i32),
                    type_name: value_type_name,
                    json_name: Some("value".to_owned()),
                    ..Default::default()
                },
            ],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Builds the parts of a field descriptor shared by message fields, oneof fields and
    /// extensions.
    fn generate_field(&mut self, field: &ast::Field, label: Label) -> FieldDescriptorProto {
        let number = self.check_field_number(&field.number);

        let (ty, type_name) = match &field.kind {
            ast::FieldKind::Normal { ty, .. } => self.check_type(ty),
            ast::FieldKind::Map { .. } => (
                Some(Type::Message),
                Some(format!(".{}", self.full_name(map_entry_name(&field.name.value)))),
            ),
        };

        let (options, default, json_name) = self.generate_field_options(field.options.as_ref());
        let default_value = default.and_then(|default| {
            self.check_default_value(field, label, ty, type_name.as_deref(), default)
        });

        FieldDescriptorProto {
            name: Some(field.name.value.clone()),
            number,
            label: Some(label as i32),
            r#type: ty.map(|ty| ty as i32),
            type_name,
            default_value,
            json_name: Some(json_name.unwrap_or_else(|| to_json_name(&field.name.value))),
            options,
            ..Default::default()
        }
    }

    /// Determines the label of a message field, and whether it is a proto3 optional field.
    fn check_field_label(&mut self, field: &ast::Field) -> (Label, bool) {
        match (&field.kind, &field.label) {
            (ast::FieldKind::Map { .. }, None) => (Label::Repeated, false),
            (ast::FieldKind::Map { .. }, Some((_, span))) => {
                self.errors
                    .push(ParseErrorKind::MapFieldWithLabel { span: span.clone() });
                (Label::Repeated, false)
            }
            (ast::FieldKind::Normal { .. }, None) => (Label::Optional, false),
            (ast::FieldKind::Normal { .. }, Some((ast::FieldLabel::Optional, _))) => {
                (Label::Optional, self.syntax == ast::Syntax::Proto3)
            }
            (ast::FieldKind::Normal { .. }, Some((ast::FieldLabel::Required, span))) => {
                if self.syntax == ast::Syntax::Proto3 {
                    self.errors
                        .push(ParseErrorKind::Proto3RequiredField { span: span.clone() });
                }
                (Label::Required, false)
            }
            (ast::FieldKind::Normal { .. }, Some((ast::FieldLabel::Repeated, _))) => {
                (Label::Repeated, false)
            }
        }
    }

    fn check_oneof_field_label(&mut self, field: &ast::Field) -> Label {
        if let ast::FieldKind::Map { .. } = &field.kind {
            self.errors.push(ParseErrorKind::InvalidOneofFieldKind {
                kind: "map",
                span: field.span.clone(),
            });
        } else if let Some((_, span)) = &field.label {
            self.errors
                .push(ParseErrorKind::OneofFieldWithLabel { span: span.clone() });
        }
        Label::Optional
    }

    fn check_extension_field_label(&mut self, field: &ast::Field) -> Label {
        if let ast::FieldKind::Map { .. } = &field.kind {
            self.errors.push(ParseErrorKind::InvalidExtendFieldKind {
                kind: "map",
                span: field.span.clone(),
            });
            return Label::Repeated;
        }

        match &field.label {
            None | Some((ast::FieldLabel::Optional, _)) => Label::Optional,
            Some((ast::FieldLabel::Required, span)) => {
                self.errors
                    .push(ParseErrorKind::RequiredExtendField { span: span.clone() });
                Label::Required
            }
            Some((ast::FieldLabel::Repeated, _)) => Label::Repeated,
        }
    }

    fn check_type(&mut self, ty: &ast::Ty) -> (Option<Type>, Option<String>) {
        match ty {
            ast::Ty::Named(type_name) => match self.resolve_type_name(type_name) {
                (name, Some(DefinitionKind::Message)) => (Some(Type::Message), Some(name)),
                (name, Some(DefinitionKind::Enum)) => (Some(Type::Enum), Some(name)),
                (name, _) => (None, Some(name)),
            },
            _ => (scalar_type(ty), None),
        }
    }

    /// Resolves a type name relative to the current scope.
    ///
    /// Resolved names are returned fully-qualified with a leading dot. Names which cannot be
    /// resolved are returned as written.
    fn resolve_type_name(&mut self, type_name: &ast::TypeName) -> (String, Option<DefinitionKind>) {
        let name = type_name.to_string();
        match self.names.resolve(self.scope_name(), &name) {
            Some((full_name, kind)) => (format!(".{}", full_name), Some(kind)),
            None if self.has_imports => {
                trace!("type '{}' not found in file, assuming it is imported", name);
                (name, None)
            }
            None => {
                self.errors.push(ParseErrorKind::UnresolvedType {
                    name: name.clone(),
                    span: type_name.span(),
                });
                (name, None)
            }
        }
    }

    /// Resolves a type name which must refer to a message, such as an extendee or method type.
    fn resolve_message_name(&mut self, type_name: &ast::TypeName) -> String {
        let (name, kind) = self.resolve_type_name(type_name);
        if let Some(DefinitionKind::Enum) = kind {
            self.errors.push(ParseErrorKind::InvalidMessageType {
                name: type_name.to_string(),
                span: type_name.span(),
            });
        }
        name
    }

    fn generate_oneof(&mut self, oneof: &ast::Oneof) -> OneofDescriptorProto {
        if oneof.fields.is_empty() {
            self.errors.push(ParseErrorKind::EmptyOneof {
                span: oneof.name.span.clone(),
            });
        }

        OneofDescriptorProto {
            name: Some(oneof.name.value.clone()),
            options: self.generate_oneof_options(&oneof.options),
        }
    }

    fn generate_extend(&mut self, extend: &ast::Extend, result: &mut Vec<FieldDescriptorProto>) {
        let extendee = self.resolve_message_name(&extend.extendee);

        for field in &extend.fields {
            let label = self.check_extension_field_label(field);
            result.push(FieldDescriptorProto {
                extendee: Some(extendee.clone()),
                ..self.generate_field(field, label)
            });
        }
    }

    fn generate_enum(&mut self, e: &ast::Enum) -> EnumDescriptorProto {
        match e.values.first() {
            None => self.errors.push(ParseErrorKind::EmptyEnum {
                span: e.name.span.clone(),
            }),
            Some(first) if self.syntax == ast::Syntax::Proto3 => {
                if first.number.as_i32().map_or(false, |number| number != 0) {
                    self.errors.push(ParseErrorKind::Proto3FirstEnumValueNotZero {
                        span: first.number.span.clone(),
                    });
                }
            }
            Some(_) => (),
        }

        let value: Vec<_> = e
            .values
            .iter()
            .map(|value| self.generate_enum_value(value))
            .collect();

        let mut reservations = Reservations {
            ranges: Vec::new(),
            names: Vec::new(),
            extensions: Vec::new(),
        };
        let mut reserved_range = Vec::new();
        let mut reserved_name = Vec::new();
        for reserved in &e.reserved {
            match &reserved.kind {
                ast::ReservedKind::Ranges(ranges) => {
                    for range in ranges {
                        let (start, end) = self.check_enum_range(range);
                        if let (Some(start), Some(end)) = (start, end) {
                            reservations.ranges.push((start..=end, range.span()));
                        }
                        reserved_range.push(EnumReservedRange { start, end });
                    }
                }
                ast::ReservedKind::Names(names) => {
                    reservations.names.extend(names);
                    reserved_name.extend(names.iter().map(|name| name.value.clone()));
                }
            }
        }

        for (desc, ast_value) in value.iter().zip(&e.values) {
            if let Some(number) = desc.number {
                self.check_reserved_number(number, &ast_value.number, &reservations);
            }
            self.check_reserved_name(&ast_value.name, &reservations);
        }

        let options = self.generate_enum_options(&e.options);

        EnumDescriptorProto {
            name: Some(e.name.value.clone()),
            value,
            options,
            reserved_range,
            reserved_name,
        }
    }

    fn generate_enum_value(&mut self, value: &ast::EnumValue) -> EnumValueDescriptorProto {
        let number = self.check_enum_number(&value.number);

        EnumValueDescriptorProto {
            name: Some(value.name.value.clone()),
            number,
            options: self.generate_enum_value_options(value.options.as_ref()),
        }
    }

    fn generate_service(&mut self, service: &ast::Service) -> ServiceDescriptorProto {
        let method = service
            .methods
            .iter()
            .map(|method| self.generate_method(method))
            .collect();

        ServiceDescriptorProto {
            name: Some(service.name.value.clone()),
            method,
            options: self.generate_service_options(&service.options),
        }
    }

    fn generate_method(&mut self, method: &ast::Method) -> MethodDescriptorProto {
        let input_type = self.resolve_message_name(&method.input_ty);
        let output_type = self.resolve_message_name(&method.output_ty);

        MethodDescriptorProto {
            name: Some(method.name.value.clone()),
            input_type: Some(input_type),
            output_type: Some(output_type),
            options: self.generate_method_options(&method.options),
            client_streaming: method.client_streaming.as_ref().map(|_| true),
            server_streaming: method.server_streaming.as_ref().map(|_| true),
        }
    }

    fn check_field_numbers(
        &mut self,
        fields: &[(Option<i32>, &ast::Field)],
        reservations: &Reservations,
    ) {
        let mut seen: HashMap<i32, Span> = HashMap::with_capacity(fields.len());
        for &(number, field) in fields {
            if let Some(number) = number {
                match seen.entry(number) {
                    hash_map::Entry::Occupied(entry) => {
                        self.errors.push(ParseErrorKind::DuplicateNumber {
                            number,
                            first: entry.get().clone(),
                            second: field.number.span.clone(),
                        })
                    }
                    hash_map::Entry::Vacant(entry) => {
                        entry.insert(field.number.span.clone());
                    }
                }

                self.check_reserved_number(number, &field.number, reservations);
            }

            self.check_reserved_name(&field.name, reservations);
        }
    }

    fn check_reserved_number(
        &mut self,
        number: i32,
        number_ast: &ast::Int,
        reservations: &Reservations,
    ) {
        if let Some((_, reserved)) = reservations
            .ranges
            .iter()
            .find(|(range, _)| range.contains(&number))
        {
            self.errors.push(ParseErrorKind::ReservedFieldNumber {
                number,
                span: number_ast.span.clone(),
                reserved: reserved.clone(),
            });
        }

        if let Some((_, range)) = reservations
            .extensions
            .iter()
            .find(|(range, _)| range.contains(&number))
        {
            self.errors.push(ParseErrorKind::FieldNumberInExtensionRange {
                number,
                span: number_ast.span.clone(),
                range: range.clone(),
            });
        }
    }

    fn check_reserved_name(&mut self, name: &ast::Ident, reservations: &Reservations) {
        if let Some(reserved) = reservations
            .names
            .iter()
            .find(|reserved| reserved.value == name.value)
        {
            self.errors.push(ParseErrorKind::ReservedFieldName {
                name: name.value.clone(),
                span: name.span.clone(),
                reserved: reserved.span.clone(),
            });
        }
    }

    /// Checks a message reserved or extension range, returning its inclusive bounds.
    fn check_message_range(&mut self, range: &ast::ReservedRange) -> (Option<i32>, Option<i32>) {
        let start = self.check_message_number(&range.start);
        let end = match &range.end {
            ast::ReservedRangeEnd::None => start,
            ast::ReservedRangeEnd::Int(value) => self.check_message_number(value),
            ast::ReservedRangeEnd::Max(_) => Some(MAX_MESSAGE_FIELD_NUMBER),
        };
        self.check_range_order(range, start, end)
    }

    fn check_enum_range(&mut self, range: &ast::ReservedRange) -> (Option<i32>, Option<i32>) {
        let start = self.check_enum_number(&range.start);
        let end = match &range.end {
            ast::ReservedRangeEnd::None => start,
            ast::ReservedRangeEnd::Int(value) => self.check_enum_number(value),
            ast::ReservedRangeEnd::Max(_) => Some(i32::MAX),
        };
        self.check_range_order(range, start, end)
    }

    fn check_range_order(
        &mut self,
        range: &ast::ReservedRange,
        start: Option<i32>,
        end: Option<i32>,
    ) -> (Option<i32>, Option<i32>) {
        match (start, end) {
            (Some(start), Some(end)) if start > end => {
                self.errors
                    .push(ParseErrorKind::InvalidRange { span: range.span() });
                (Some(start), None)
            }
            _ => (start, end),
        }
    }

    fn check_field_number(&mut self, int: &ast::Int) -> Option<i32> {
        let number = self.check_message_number(int)?;
        if RESERVED_MESSAGE_FIELD_NUMBERS.contains(&number) {
            self.errors.push(ParseErrorKind::ReservedMessageNumber {
                span: int.span.clone(),
            });
        }
        Some(number)
    }

    fn check_message_number(&mut self, int: &ast::Int) -> Option<i32> {
        match int.as_i32() {
            Some(number @ 1..=MAX_MESSAGE_FIELD_NUMBER) => Some(number),
            _ => {
                self.errors.push(ParseErrorKind::InvalidMessageNumber {
                    span: int.span.clone(),
                });
                None
            }
        }
    }

    fn check_enum_number(&mut self, int: &ast::Int) -> Option<i32> {
        let number = int.as_i32();
        if number.is_none() {
            self.errors.push(ParseErrorKind::InvalidEnumNumber {
                span: int.span.clone(),
            });
        }
        number
    }
}

fn scalar_type(ty: &ast::Ty) -> Option<Type> {
    match ty {
        ast::Ty::Double => Some(Type::Double),
        ast::Ty::Float => Some(Type::Float),
        ast::Ty::Int32 => Some(Type::Int32),
        ast::Ty::Int64 => Some(Type::Int64),
        ast::Ty::Uint32 => Some(Type::Uint32),
        ast::Ty::Uint64 => Some(Type::Uint64),
        ast::Ty::Sint32 => Some(Type::Sint32),
        ast::Ty::Sint64 => Some(Type::Sint64),
        ast::Ty::Fixed32 => Some(Type::Fixed32),
        ast::Ty::Fixed64 => Some(Type::Fixed64),
        ast::Ty::Sfixed32 => Some(Type::Sfixed32),
        ast::Ty::Sfixed64 => Some(Type::Sfixed64),
        ast::Ty::Bool => Some(Type::Bool),
        ast::Ty::String => Some(Type::String),
        ast::Ty::Bytes => Some(Type::Bytes),
        ast::Ty::Named(_) => None,
    }
}

fn index_to_i32(index: usize) -> i32 {
    // Source files are at most i32::MAX bytes, so indices of items within them always fit.
    i32::try_from(index).expect("index too large")
}
