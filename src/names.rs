//! The symbol table of a single source file.


use std::{
    collections::{hash_map, HashMap, HashSet},
    fmt::Display,
};

use logos::Span;

use crate::{ast, case::to_pascal_case, error::ParseErrorKind};

/// Every name declared in a file, keyed by fully-qualified name without a leading dot.
#[derive(Debug, Default)]
pub(crate) struct NameMap {
    map: HashMap<String, Entry>,
    /// The full name of each enum joined with the name of each of its values.
    enum_values: HashSet<String>,
}

#[derive(Debug, Clone)]
struct Entry {
    kind: DefinitionKind,
    span: Span,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum DefinitionKind {
    Package,
    Message,
    Enum,
    EnumValue,
    Oneof,
    Field,
    Extension,
    Service,
    Method,
}

impl DefinitionKind {
    /// Returns true for definitions which may contain other definitions.
    fn is_aggregate(self) -> bool {
        matches!(
            self,
            DefinitionKind::Package
                | DefinitionKind::Message
                | DefinitionKind::Enum
                | DefinitionKind::Service
        )
    }

    fn is_type(self) -> bool {
        matches!(self, DefinitionKind::Message | DefinitionKind::Enum)
    }
}

impl NameMap {
    /// Collects every definition in `file`, reporting names which are declared more than once.
    pub fn from_file(file: &ast::File) -> (Self, Vec<ParseErrorKind>) {
        let mut pass = NamePass {
            names: NameMap::default(),
            errors: Vec::new(),
            scope: String::new(),
        };
        pass.add_file(file);
        (pass.names, pass.errors)
    }

    fn add(&mut self, name: String, kind: DefinitionKind, span: Span) -> Result<(), ParseErrorKind> {
        match self.map.entry(name) {
            hash_map::Entry::Vacant(entry) => {
                entry.insert(Entry { kind, span });
                Ok(())
            }
            hash_map::Entry::Occupied(entry) => match (kind, entry.get().kind) {
                (DefinitionKind::Package, DefinitionKind::Package) => Ok(()),
                _ => Err(ParseErrorKind::DuplicateName {
                    name: entry.key().clone(),
                    first: entry.get().span.clone(),
                    second: span,
                }),
            },
        }
    }

    /// Looks up a fully-qualified name. A leading dot is ignored.
    pub fn get(&self, name: &str) -> Option<DefinitionKind> {
        let name = name.strip_prefix('.').unwrap_or(name);
        self.map.get(name).map(|entry| entry.kind)
    }

    /// Returns true if `value` is one of the values of the enum with full name `enum_name`.
    pub fn is_enum_value(&self, enum_name: &str, value: &str) -> bool {
        let enum_name = enum_name.strip_prefix('.').unwrap_or(enum_name);
        self.enum_values.contains(&make_name(enum_name, value))
    }

    /// Resolves a type reference as written within the scope `scope`, returning its
    /// fully-qualified name.
    ///
    /// A name with a leading dot is absolute. Otherwise the first component of the name is
    /// looked up in `scope` and then in each enclosing scope in turn. Once the first component
    /// is found in an aggregate, the rest of the name must be found within it. Names which do not
    /// refer to a message or enum are skipped.
    pub fn resolve(&self, scope: &str, name: &str) -> Option<(String, DefinitionKind)> {
        if let Some(absolute) = name.strip_prefix('.') {
            return match self.get(absolute) {
                Some(kind) if kind.is_type() => Some((absolute.to_owned(), kind)),
                _ => None,
            };
        }

        let (first, rest) = match name.split_once('.') {
            Some((first, rest)) => (first, Some(rest)),
            None => (name, None),
        };

        let mut scope = scope;
        loop {
            let candidate = make_name(scope, first);
            match (self.get(&candidate), rest) {
                (Some(kind), None) if kind.is_type() => return Some((candidate, kind)),
                (Some(kind), Some(rest)) if kind.is_aggregate() => {
                    let full_name = make_name(&candidate, rest);
                    return match self.get(&full_name) {
                        Some(kind) if kind.is_type() => Some((full_name, kind)),
                        _ => None,
                    };
                }
                _ => (),
            }

            if scope.is_empty() {
                return None;
            }
            scope = parent_scope(scope);
        }
    }
}

struct NamePass {
    names: NameMap,
    errors: Vec<ParseErrorKind>,
    scope: String,
}

impl NamePass {
    fn add_name(&mut self, name: impl Display, kind: DefinitionKind, span: Span) {
        let full_name = make_name(&self.scope, name);
        if let Err(err) = self.names.add(full_name, kind, span) {
            self.errors.push(err);
        }
    }

    fn enter(&mut self, name: impl Display) -> usize {
        let len = self.scope.len();
        self.scope = make_name(&self.scope, name);
        len
    }

    fn exit(&mut self, len: usize) {
        self.scope.truncate(len);
    }

    fn add_file(&mut self, file: &ast::File) {
        if let Some(package) = &file.package {
            for part in &package.name.parts {
                self.add_name(part, DefinitionKind::Package, package.name.span());
                self.enter(part);
            }
        }

        for message in &file.messages {
            self.add_message(message);
        }
        for enu in &file.enums {
            self.add_enum(enu);
        }
        for extend in &file.extends {
            self.add_extend(extend);
        }
        for service in &file.services {
            self.add_service(service);
        }

        self.scope.clear();
    }

    fn add_message(&mut self, message: &ast::Message) {
        self.add_name(
            &message.name,
            DefinitionKind::Message,
            message.name.span.clone(),
        );

        let len = self.enter(&message.name);
        for item in &message.body.items {
            match item {
                ast::MessageItem::Field(field) => self.add_field(field),
                ast::MessageItem::Oneof(oneof) => {
                    self.add_name(&oneof.name, DefinitionKind::Oneof, oneof.name.span.clone());
                    for field in &oneof.fields {
                        self.add_field(field);
                    }
                }
                ast::MessageItem::Message(nested) => self.add_message(nested),
                ast::MessageItem::Enum(enu) => self.add_enum(enu),
                ast::MessageItem::Extend(extend) => self.add_extend(extend),
            }
        }
        self.exit(len);
    }

    fn add_field(&mut self, field: &ast::Field) {
        self.add_name(&field.name, DefinitionKind::Field, field.name.span.clone());
        if let ast::FieldKind::Map { .. } = field.kind {
            self.add_name(
                map_entry_name(&field.name.value),
                DefinitionKind::Message,
                field.name.span.clone(),
            );
        }
    }

    fn add_enum(&mut self, enu: &ast::Enum) {
        self.add_name(&enu.name, DefinitionKind::Enum, enu.name.span.clone());

        let enum_name = make_name(&self.scope, &enu.name);
        // Enum values are siblings of the enum, not children of it.
        for value in &enu.values {
            self.names
                .enum_values
                .insert(make_name(&enum_name, &value.name));
            self.add_name(
                &value.name,
                DefinitionKind::EnumValue,
                value.name.span.clone(),
            );
        }
    }

    fn add_extend(&mut self, extend: &ast::Extend) {
        for field in &extend.fields {
            self.add_name(
                &field.name,
                DefinitionKind::Extension,
                field.name.span.clone(),
            );
        }
    }

    fn add_service(&mut self, service: &ast::Service) {
        self.add_name(
            &service.name,
            DefinitionKind::Service,
            service.name.span.clone(),
        );

        let len = self.enter(&service.name);
        for method in &service.methods {
            self.add_name(&method.name, DefinitionKind::Method, method.name.span.clone());
        }
        self.exit(len);
    }
}

/// Joins a scope and a name with a dot.
pub(crate) fn make_name(scope: &str, name: impl Display) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

/// The name of the message synthesized for the map field `field_name`.
pub(crate) fn map_entry_name(field_name: &str) -> String {
    to_pascal_case(field_name) + "Entry"
}

fn parent_scope(scope: &str) -> &str {
    match scope.rfind('.') {
        Some(index) => &scope[..index],
        None => "",
    }
}
