use std::{fs, io};

use miette::Diagnostic;
use prost_types::field_descriptor_proto::{Label, Type};
use protoparse::{parse, parse_file, parse_reader, parse_str, ErrorCategory, ParseErrorKind};
use similar_asserts::assert_eq;

fn categories(source: &str) -> Vec<ErrorCategory> {
    let file = parse_str("test.proto", source).unwrap();
    file.errors()
        .map(|err| err.errors().map(|err| err.category()).collect())
        .unwrap_or_default()
}

#[test]
fn round_trip_proto3() {
    let file = parse_str(
        "test.proto",
        r#"syntax = "proto3"; message M { string name = 1; }"#,
    )
    .unwrap();
    assert!(!file.has_errors());

    let descriptor = file.into_descriptor();
    assert_eq!(descriptor.name(), "test.proto");
    assert_eq!(descriptor.syntax(), "proto3");
    assert_eq!(descriptor.message_type.len(), 1);

    let message = &descriptor.message_type[0];
    assert_eq!(message.name(), "M");
    assert_eq!(message.field.len(), 1);
    assert_eq!(message.field[0].name(), "name");
    assert_eq!(message.field[0].r#type(), Type::String);
    assert_eq!(message.field[0].number(), 1);
    assert_eq!(message.field[0].label(), Label::Optional);
    assert_eq!(message.field[0].json_name(), "name");
}

#[test]
fn package_defaults_to_proto2() {
    let descriptor = parse_str("test.proto", "package foo.bar.baz;")
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(descriptor.package(), "foo.bar.baz");
    assert_eq!(descriptor.syntax(), "proto2");
    assert!(descriptor.message_type.is_empty());
    assert!(descriptor.enum_type.is_empty());
    assert!(descriptor.service.is_empty());
    assert!(descriptor.dependency.is_empty());
}

#[test]
fn import_kinds() {
    let descriptor = parse_str(
        "test.proto",
        r#"import public "a.proto"; import "b.proto"; import weak "c.proto";"#,
    )
    .unwrap()
    .into_result()
    .unwrap();
    assert_eq!(descriptor.dependency, vec!["a.proto", "b.proto", "c.proto"]);
    assert_eq!(descriptor.public_dependency, vec![0]);
    assert_eq!(descriptor.weak_dependency, vec![2]);
}

#[test]
fn map_entry_synthesis() {
    let descriptor = parse_str(
        "test.proto",
        "message Foo { map<sint64, string> my_map_field = 7; }",
    )
    .unwrap()
    .into_result()
    .unwrap();

    let message = &descriptor.message_type[0];
    let entry = &message.nested_type[0];
    assert_eq!(entry.name(), "MyMapFieldEntry");
    assert_eq!(entry.field.len(), 2);
    assert_eq!(entry.field[0].name(), "key");
    assert_eq!(entry.field[0].number(), 1);
    assert_eq!(entry.field[0].r#type(), Type::Sint64);
    assert_eq!(entry.field[1].name(), "value");
    assert_eq!(entry.field[1].number(), 2);
    assert_eq!(entry.field[1].r#type(), Type::String);
    assert!(entry.options.as_ref().unwrap().map_entry());

    let field = &message.field[0];
    assert_eq!(field.label(), Label::Repeated);
    assert_eq!(field.r#type(), Type::Message);
    assert_eq!(field.type_name(), ".Foo.MyMapFieldEntry");
}

#[test]
fn duplicate_numbers_keep_both_fields() {
    let file = parse_str("test.proto", "message Foo { int32 a = 3; int32 b = 3; }").unwrap();

    let err = file.errors().unwrap();
    assert_eq!(err.len(), 1);
    assert_eq!(err.kind().category(), ErrorCategory::Semantic);
    assert!(matches!(
        err.kind(),
        ParseErrorKind::DuplicateNumber { number: 3, .. }
    ));

    assert_eq!(file.descriptor().message_type[0].field.len(), 2);
}

#[test]
fn unterminated_body_is_fatal() {
    let err = parse_str("test.proto", "message Foo { int32 a = 1;").unwrap_err();
    assert!(err.is_parse());
    assert!(!err.is_io());
    assert_eq!(err.file(), "test.proto");

    let parse_err = err.as_parse_error().unwrap();
    assert!(parse_err
        .errors()
        .any(|err| matches!(err, ParseErrorKind::UnterminatedBody { .. })));
}

#[test]
fn field_number_limits() {
    assert!(!parse_str("test.proto", "message Foo { int32 a = 20000; }")
        .unwrap()
        .has_errors());

    let file = parse_str("test.proto", "message Foo { int32 a = 19500; }").unwrap();
    assert!(matches!(
        file.errors().unwrap().kind(),
        ParseErrorKind::ReservedMessageNumber { .. }
    ));

    let file = parse_str("test.proto", "message Foo { int32 a = 0; }").unwrap();
    assert!(matches!(
        file.errors().unwrap().kind(),
        ParseErrorKind::InvalidMessageNumber { .. }
    ));
}

#[test]
fn errors_are_accumulated_in_source_order() {
    let file = parse_str(
        "test.proto",
        "message Foo {
            int32 a = 1;
            Missing b = 2;
            int32 c = 1;
        }
        message Foo {}
        enum E {}",
    )
    .unwrap();

    let kinds: Vec<_> = file
        .errors()
        .unwrap()
        .errors()
        .map(|err| match err {
            ParseErrorKind::UnresolvedType { .. } => "unresolved",
            ParseErrorKind::DuplicateNumber { .. } => "number",
            ParseErrorKind::DuplicateName { .. } => "name",
            ParseErrorKind::EmptyEnum { .. } => "enum",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["unresolved", "number", "name", "enum"]);
}

#[test]
fn recovers_after_syntax_errors() {
    let file = parse_str(
        "test.proto",
        "message Foo { int32 = 1; int32 b = 2; }
        foo bar;
        message Bar { string s = 1; }",
    )
    .unwrap();

    let descriptor = file.descriptor();
    assert_eq!(descriptor.message_type.len(), 2);
    assert_eq!(descriptor.message_type[0].field[0].name(), "b");
    assert_eq!(descriptor.message_type[1].name(), "Bar");

    let err = file.errors().unwrap();
    assert_eq!(err.len(), 2);
    assert!(err
        .errors()
        .all(|err| err.category() == ErrorCategory::Syntax));
}

#[test]
fn error_categories() {
    assert_eq!(
        categories(r#"option java_package = "a\qb";"#),
        vec![ErrorCategory::Lexical]
    );
    assert_eq!(categories("message Foo { # }"), vec![ErrorCategory::Lexical]);
    assert_eq!(
        categories(r#"package foo; syntax = "proto3";"#),
        vec![ErrorCategory::Structural]
    );
    assert_eq!(
        categories("package foo; package bar;"),
        vec![ErrorCategory::Structural]
    );
    assert_eq!(
        categories("message Foo { Bar bar = 1; }"),
        vec![ErrorCategory::Semantic]
    );
}

#[test]
fn late_syntax_keeps_default() {
    let file = parse_str("test.proto", r#"package foo; syntax = "proto3";"#).unwrap();
    assert_eq!(file.descriptor().syntax(), "proto2");
    assert!(matches!(
        file.errors().unwrap().kind(),
        ParseErrorKind::SyntaxNotFirst { .. }
    ));
}

#[test]
fn duplicate_package_keeps_first() {
    let file = parse_str("test.proto", "package foo; package bar;").unwrap();
    assert_eq!(file.descriptor().package(), "foo");
    assert!(matches!(
        file.errors().unwrap().kind(),
        ParseErrorKind::DuplicatePackage { .. }
    ));
}

#[test]
fn byte_order_mark() {
    let file = parse("test.proto", b"\xEF\xBB\xBFpackage foo;").unwrap();
    assert!(!file.has_errors());
    assert_eq!(file.descriptor().package(), "foo");
}

#[test]
fn invalid_utf8() {
    let err = parse("test.proto", b"package \xFF;").unwrap_err();
    assert!(!err.is_parse());
    assert!(!err.is_io());
    assert_eq!(err.file(), "test.proto");
    assert_eq!(err.to_string(), "file 'test.proto' is not valid utf-8");
}

#[test]
fn diagnostics_render_positions() {
    let file = parse_str(
        "dir/test.proto",
        "syntax = \"proto3\";\n\nmessage Foo {\n  int32 a = 0;\n}\n",
    )
    .unwrap();

    let err = file.into_result().unwrap_err();
    assert_eq!(err.file(), "dir/test.proto");
    assert_eq!(err.line_col(&err.span()), Some((4, 13)));
    assert_eq!(
        format!("{:?}", err),
        "dir/test.proto:4:13: message numbers must be between 1 and 536870911"
    );
    assert!(err.source_code().is_some());
    assert_eq!(err.labels().unwrap().count(), 1);
}

#[test]
fn related_diagnostics() {
    let file = parse_str("test.proto", "message Foo { int32 a = 0; int32 b = 0; }").unwrap();
    let err = file.into_result().unwrap_err();
    assert_eq!(err.len(), 2);
    assert_eq!(err.related().unwrap().count(), 1);
}

#[test]
fn parse_from_file_and_reader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foo.proto");
    fs::write(&path, "syntax = \"proto3\"; package foo; message Foo {}").unwrap();

    let file = parse_file(&path).unwrap();
    assert!(!file.has_errors());
    assert_eq!(file.descriptor().name(), path.display().to_string());
    assert_eq!(file.descriptor().package(), "foo");

    let file = parse_reader("foo.proto", fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(file.descriptor().name(), "foo.proto");
    assert_eq!(file.descriptor().message_type[0].name(), "Foo");
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.proto");
    let err = parse_file(&path).unwrap_err();
    assert!(err.is_io());
    assert!(!err.is_parse());
    assert_eq!(err.file(), path.display().to_string());
}

struct FailingReader;

impl io::Read for FailingReader {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disconnected"))
    }
}

#[test]
fn reader_error_is_io_error() {
    let err = parse_reader("remote.proto", FailingReader).unwrap_err();
    assert!(err.is_io());
    assert_eq!(err.file(), "remote.proto");
    assert_eq!(err.to_string(), "error reading source for 'remote.proto'");
}

#[test]
fn parses_are_independent_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|index| {
            std::thread::spawn(move || {
                let source = format!("package p{}; message M{} {{ int32 a = 1; }}", index, index);
                parse_str("test.proto", &source).unwrap().into_result().unwrap()
            })
        })
        .collect();

    for (index, handle) in handles.into_iter().enumerate() {
        let descriptor = handle.join().unwrap();
        assert_eq!(descriptor.package(), format!("p{}", index));
        assert_eq!(descriptor.message_type[0].name(), format!("M{}", index));
    }
}
