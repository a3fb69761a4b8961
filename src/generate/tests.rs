use prost_types::{
    descriptor_proto::{ExtensionRange, ReservedRange},
    enum_descriptor_proto::EnumReservedRange,
    field_descriptor_proto::{Label, Type},
    uninterpreted_option::NamePart,
    DescriptorProto, EnumOptions, FieldDescriptorProto, FieldOptions, FileDescriptorProto,
    FileOptions, MessageOptions, MethodOptions, OneofDescriptorProto, UninterpretedOption,
};
use similar_asserts::assert_eq;

use super::generate;
use crate::{error::ParseErrorKind, names::NameMap, parse::parse, MAX_MESSAGE_FIELD_NUMBER};

fn generate_with_errors(source: &str) -> (FileDescriptorProto, Vec<ParseErrorKind>) {
    let (file, errors) = parse(source).unwrap();
    assert_eq!(errors, vec![]);
    let (names, errors) = NameMap::from_file(&file);
    assert_eq!(errors, vec![]);
    generate("test.proto", &file, &names)
}

fn generate_ok(source: &str) -> FileDescriptorProto {
    let (descriptor, errors) = generate_with_errors(source);
    assert_eq!(errors, vec![]);
    descriptor
}

fn generate_err(source: &str) -> Vec<ParseErrorKind> {
    let (_, errors) = generate_with_errors(source);
    assert!(!errors.is_empty());
    errors
}

#[test]
fn proto3_message() {
    assert_eq!(
        generate_ok(r#"syntax = "proto3"; message M { string name = 1; }"#),
        FileDescriptorProto {
            name: Some("test.proto".to_owned()),
            message_type: vec![DescriptorProto {
                name: Some("M".to_owned()),
                field: vec![FieldDescriptorProto {
                    name: Some("name".to_owned()),
                    number: Some(1),
                    label: Some(Label::Optional as i32),
                    r#type: Some(Type::String as i32),
                    json_name: Some("name".to_owned()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            syntax: Some("proto3".to_owned()),
            ..Default::default()
        }
    );
}

#[test]
fn package_only() {
    assert_eq!(
        generate_ok("package foo.bar.baz;"),
        FileDescriptorProto {
            name: Some("test.proto".to_owned()),
            package: Some("foo.bar.baz".to_owned()),
            syntax: Some("proto2".to_owned()),
            ..Default::default()
        }
    );
}

#[test]
fn imports() {
    let file = generate_ok(
        r#"import public "a.proto";
        import "b.proto";
        import weak "c.proto";"#,
    );
    assert_eq!(file.dependency, vec!["a.proto", "b.proto", "c.proto"]);
    assert_eq!(file.public_dependency, vec![0]);
    assert_eq!(file.weak_dependency, vec![2]);
}

#[test]
fn map_field() {
    let file = generate_ok(
        "package pkg;
        message Foo {
            map<string, Bar> my_map = 1;
            message Bar {}
        }",
    );

    let message = &file.message_type[0];
    assert_eq!(
        message.field,
        vec![FieldDescriptorProto {
            name: Some("my_map".to_owned()),
            number: Some(1),
            label: Some(Label::Repeated as i32),
            r#type: Some(Type::Message as i32),
            type_name: Some(".pkg.Foo.MyMapEntry".to_owned()),
            json_name: Some("myMap".to_owned()),
            ..Default::default()
        }]
    );
    assert_eq!(message.nested_type.len(), 2);
    assert_eq!(
        message.nested_type[0],
        DescriptorProto {
            name: Some("MyMapEntry".to_owned()),
            field: vec![
                FieldDescriptorProto {
                    name: Some("key".to_owned()),
                    number: Some(1),
                    label: Some(Label::Optional as i32),
                    r#type: Some(Type::String as i32),
                    json_name: Some("key".to_owned()),
                    ..Default::default()
                },
                FieldDescriptorProto {
                    name: Some("value".to_owned()),
                    number: Some(2),
                    label: Some(Label::Optional as i32),
                    r#type: Some(Type::Message as i32),
                    type_name: Some(".pkg.Foo.Bar".to_owned()),
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
    );
    assert_eq!(message.nested_type[1].name(), "Bar");
}

#[test]
fn invalid_map_key() {
    let errors = generate_err("message Foo { map<float, int32> values = 1; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::InvalidMapFieldKeyType { span: 18..23 }]
    );

    let errors = generate_err("message Foo { map<Foo, int32> values = 1; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::InvalidMapFieldKeyType { span: 18..21 }]
    );
}

#[test]
fn map_field_with_label() {
    let errors = generate_err("message Foo { repeated map<int32, int32> values = 1; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::MapFieldWithLabel { span: 14..22 }]
    );
}

#[test]
fn duplicate_field_numbers() {
    let (file, errors) = generate_with_errors("message Foo { int32 a = 3; int32 b = 3; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::DuplicateNumber {
            number: 3,
            first: 24..25,
            second: 37..38,
        }]
    );

    let fields = &file.message_type[0].field;
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name(), "a");
    assert_eq!(fields[1].name(), "b");
    assert_eq!(fields[1].number, Some(3));
}

#[test]
fn duplicate_numbers_across_oneofs() {
    let errors = generate_err("message Foo { int32 a = 1; oneof o { int32 b = 1; } }");
    assert!(matches!(
        errors.as_slice(),
        [ParseErrorKind::DuplicateNumber { number: 1, .. }]
    ));
}

#[test]
fn field_numbers() {
    let file = generate_ok("message Foo { int32 a = 20000; }");
    assert_eq!(file.message_type[0].field[0].number, Some(20000));

    let file = generate_ok("message Foo { int32 a = 536870911; }");
    assert_eq!(
        file.message_type[0].field[0].number,
        Some(MAX_MESSAGE_FIELD_NUMBER)
    );

    let (file, errors) = generate_with_errors("message Foo { int32 a = 19500; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::ReservedMessageNumber { span: 24..29 }]
    );
    assert_eq!(file.message_type[0].field[0].number, Some(19500));

    let (file, errors) = generate_with_errors("message Foo { int32 a = 0; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::InvalidMessageNumber { span: 24..25 }]
    );
    assert_eq!(file.message_type[0].field[0].number, None);

    let errors = generate_err("message Foo { int32 a = 536870912; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::InvalidMessageNumber { span: 24..33 }]
    );

    let errors = generate_err("message Foo { int32 a = -1; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::InvalidMessageNumber { span: 24..26 }]
    );
}

#[test]
fn resolve_types() {
    let file = generate_ok(
        "package pkg;
        message Msg {}
        enum Kind { KIND_UNKNOWN = 0; }
        message Other {
            Msg a = 1;
            .pkg.Msg b = 2;
            pkg.Msg c = 3;
            Kind d = 4;
        }",
    );

    let fields = &file.message_type[1].field;
    for field in &fields[..3] {
        assert_eq!(field.r#type(), Type::Message);
        assert_eq!(field.type_name(), ".pkg.Msg");
    }
    assert_eq!(fields[3].r#type(), Type::Enum);
    assert_eq!(fields[3].type_name(), ".pkg.Kind");
}

#[test]
fn resolve_nested_shadows_outer() {
    let file = generate_ok(
        "message Inner {}
        message Outer {
            message Inner {}
            Inner a = 1;
            .Inner b = 2;
        }",
    );

    let fields = &file.message_type[1].field;
    assert_eq!(fields[0].type_name(), ".Outer.Inner");
    assert_eq!(fields[1].type_name(), ".Inner");
}

#[test]
fn unresolved_type() {
    let (file, errors) = generate_with_errors("message Foo { Bar bar = 1; int32 baz = 2; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::UnresolvedType {
            name: "Bar".to_owned(),
            span: 14..17,
        }]
    );

    let fields = &file.message_type[0].field;
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].r#type, None);
    assert_eq!(fields[0].type_name(), "Bar");
    assert_eq!(fields[1].r#type(), Type::Int32);
}

#[test]
fn unresolved_type_with_imports() {
    let file = generate_ok(
        r#"import "bar.proto";
        message Foo { foo.Bar bar = 1; }"#,
    );

    let field = &file.message_type[0].field[0];
    assert_eq!(field.r#type, None);
    assert_eq!(field.type_name(), "foo.Bar");
}

#[test]
fn proto3_optional() {
    let file = generate_ok(
        r#"syntax = "proto3";
        message Foo {
            oneof o { int32 a = 1; }
            optional int32 b = 2;
            int32 c = 3;
        }"#,
    );

    let message = &file.message_type[0];
    assert_eq!(
        message.oneof_decl,
        vec![
            OneofDescriptorProto {
                name: Some("o".to_owned()),
                options: None,
            },
            OneofDescriptorProto {
                name: Some("_b".to_owned()),
                options: None,
            },
        ]
    );
    assert_eq!(message.field[0].oneof_index, Some(0));
    assert_eq!(message.field[0].proto3_optional, None);
    assert_eq!(message.field[1].oneof_index, Some(1));
    assert_eq!(message.field[1].proto3_optional, Some(true));
    assert_eq!(message.field[1].label(), Label::Optional);
    assert_eq!(message.field[2].oneof_index, None);
}

#[test]
fn proto2_labels() {
    let file = generate_ok(
        "message Foo {
            optional int32 a = 1;
            required int32 b = 2;
            repeated int32 c = 3;
            int32 d = 4;
        }",
    );

    let labels: Vec<_> = file.message_type[0]
        .field
        .iter()
        .map(|field| field.label())
        .collect();
    assert_eq!(
        labels,
        vec![
            Label::Optional,
            Label::Required,
            Label::Repeated,
            Label::Optional
        ]
    );
    assert!(file.message_type[0]
        .field
        .iter()
        .all(|field| field.proto3_optional.is_none()));
}

#[test]
fn proto3_required() {
    let errors = generate_err(r#"syntax = "proto3"; message Foo { required int32 a = 1; }"#);
    assert_eq!(
        errors,
        vec![ParseErrorKind::Proto3RequiredField { span: 33..41 }]
    );
}

#[test]
fn oneof_fields() {
    let errors = generate_err("message Foo { oneof o { optional int32 a = 1; } }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::OneofFieldWithLabel { span: 24..32 }]
    );

    let errors = generate_err("message Foo { oneof o { map<int32, int32> a = 1; } }");
    assert!(matches!(
        errors.as_slice(),
        [ParseErrorKind::InvalidOneofFieldKind { kind: "map", .. }]
    ));

    let errors = generate_err("message Foo { oneof o {} }");
    assert_eq!(errors, vec![ParseErrorKind::EmptyOneof { span: 20..21 }]);
}

#[test]
fn reserved() {
    let (file, errors) = generate_with_errors(
        r#"message Foo { reserved 1 to 3, 10; reserved "bar"; int32 foo = 2; int32 bar = 4; }"#,
    );

    let message = &file.message_type[0];
    assert_eq!(
        message.reserved_range,
        vec![
            ReservedRange {
                start: Some(1),
                end: Some(4),
            },
            ReservedRange {
                start: Some(10),
                end: Some(11),
            },
        ]
    );
    assert_eq!(message.reserved_name, vec!["bar"]);

    assert_eq!(errors.len(), 2);
    assert_eq!(
        errors[0],
        ParseErrorKind::ReservedFieldNumber {
            number: 2,
            span: 63..64,
            reserved: 23..29,
        }
    );
    assert!(matches!(
        &errors[1],
        ParseErrorKind::ReservedFieldName { name, span, .. } if name == "bar" && *span == (72..75)
    ));
}

#[test]
fn reserved_name_with_invalid_number() {
    let errors = generate_err(r#"message M { reserved "foo"; int32 foo = 0; }"#);

    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .any(|err| matches!(err, ParseErrorKind::InvalidMessageNumber { span } if *span == (40..41))));
    assert!(errors.iter().any(|err| matches!(
        err,
        ParseErrorKind::ReservedFieldName { name, span, .. } if name == "foo" && *span == (34..37)
    )));
}

#[test]
fn reserved_max() {
    let file = generate_ok("message Foo { reserved 5 to max; }");
    assert_eq!(
        file.message_type[0].reserved_range,
        vec![ReservedRange {
            start: Some(5),
            end: Some(MAX_MESSAGE_FIELD_NUMBER + 1),
        }]
    );
}

#[test]
fn invalid_range() {
    let (file, errors) = generate_with_errors("message Foo { reserved 5 to 2; }");
    assert_eq!(errors, vec![ParseErrorKind::InvalidRange { span: 23..29 }]);
    assert_eq!(
        file.message_type[0].reserved_range,
        vec![ReservedRange {
            start: Some(5),
            end: None,
        }]
    );
}

#[test]
fn extension_ranges() {
    let (file, errors) =
        generate_with_errors("message Foo { extensions 100 to max; int32 a = 150; }");
    assert_eq!(
        file.message_type[0].extension_range,
        vec![ExtensionRange {
            start: Some(100),
            end: Some(MAX_MESSAGE_FIELD_NUMBER + 1),
            options: None,
        }]
    );
    assert_eq!(
        errors,
        vec![ParseErrorKind::FieldNumberInExtensionRange {
            number: 150,
            span: 47..50,
            range: 25..35,
        }]
    );
}

#[test]
fn extension_range_options() {
    let file = generate_ok("message Foo { extensions 1, 5 to 10 [(verify) = true]; }");
    let ranges = &file.message_type[0].extension_range;
    assert_eq!(ranges.len(), 2);
    assert_eq!(ranges[0].options, ranges[1].options);
    assert_eq!(
        ranges[0].options.as_ref().unwrap().uninterpreted_option,
        vec![UninterpretedOption {
            name: vec![NamePart {
                name_part: "verify".to_owned(),
                is_extension: true,
            }],
            identifier_value: Some("true".to_owned()),
            ..Default::default()
        }]
    );
}

#[test]
fn extend() {
    let file = generate_ok(
        "package pkg;
        message Foo {
            extensions 100 to 200;
            extend Foo { repeated string tags = 101; }
        }
        extend Foo { optional int32 bar_baz = 100; }",
    );

    assert_eq!(
        file.extension,
        vec![FieldDescriptorProto {
            name: Some("bar_baz".to_owned()),
            extendee: Some(".pkg.Foo".to_owned()),
            number: Some(100),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::Int32 as i32),
            json_name: Some("barBaz".to_owned()),
            ..Default::default()
        }]
    );

    let nested = &file.message_type[0].extension;
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].extendee(), ".pkg.Foo");
    assert_eq!(nested[0].label(), Label::Repeated);
}

#[test]
fn extend_errors() {
    let errors = generate_err("enum E { A = 0; } extend E { optional int32 a = 1; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::InvalidMessageType {
            name: "E".to_owned(),
            span: 25..26,
        }]
    );

    let errors = generate_err("message Foo {} extend Foo { required int32 a = 1; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::RequiredExtendField { span: 28..36 }]
    );

    let errors = generate_err("message Foo {} extend Foo { map<int32, int32> a = 1; }");
    assert!(matches!(
        errors.as_slice(),
        [ParseErrorKind::InvalidExtendFieldKind { kind: "map", .. }]
    ));
}

#[test]
#[allow(deprecated)]
fn deprecated_file_option() {
    let file = generate_ok("option java_generate_equals_and_hash = true;");
    assert_eq!(
        file.options,
        Some(FileOptions {
            java_generate_equals_and_hash: Some(true),
            ..Default::default()
        })
    );
}

#[test]
fn file_options() {
    let file = generate_ok(
        r#"option java_package = "com.example";
        option optimize_for = CODE_SIZE;
        option cc_enable_arenas = true;
        option (my_opt) = 5;
        option (ext).nested = -3;
        option (agg) = { a: 1 };"#,
    );

    assert_eq!(
        file.options,
        Some(FileOptions {
            java_package: Some("com.example".to_owned()),
            optimize_for: Some(2),
            cc_enable_arenas: Some(true),
            uninterpreted_option: vec![
                UninterpretedOption {
                    name: vec![NamePart {
                        name_part: "my_opt".to_owned(),
                        is_extension: true,
                    }],
                    positive_int_value: Some(5),
                    ..Default::default()
                },
                UninterpretedOption {
                    name: vec![
                        NamePart {
                            name_part: "ext".to_owned(),
                            is_extension: true,
                        },
                        NamePart {
                            name_part: "nested".to_owned(),
                            is_extension: false,
                        },
                    ],
                    negative_int_value: Some(-3),
                    ..Default::default()
                },
                UninterpretedOption {
                    name: vec![NamePart {
                        name_part: "agg".to_owned(),
                        is_extension: true,
                    }],
                    aggregate_value: Some("a: 1".to_owned()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        })
    );
}

#[test]
fn unknown_option_is_kept() {
    let file = generate_ok("option not_an_option = 1.5;");
    assert_eq!(
        file.options.unwrap().uninterpreted_option,
        vec![UninterpretedOption {
            name: vec![NamePart {
                name_part: "not_an_option".to_owned(),
                is_extension: false,
            }],
            double_value: Some(1.5),
            ..Default::default()
        }]
    );
}

#[test]
fn no_options() {
    let file = generate_ok("message Foo { int32 a = 1; }");
    assert_eq!(file.options, None);
    assert_eq!(file.message_type[0].options, None);
    assert_eq!(file.message_type[0].field[0].options, None);
}

#[test]
fn duplicate_option() {
    let (file, errors) =
        generate_with_errors(r#"option java_package = "a"; option java_package = "b";"#);
    assert_eq!(
        errors,
        vec![ParseErrorKind::DuplicateOption {
            name: "java_package".to_owned(),
            first: 7..19,
            second: 34..46,
        }]
    );
    assert_eq!(file.options.unwrap().java_package(), "a");
}

#[test]
fn option_value_type() {
    let errors = generate_err(r#"option java_multiple_files = "yes";"#);
    assert_eq!(
        errors,
        vec![ParseErrorKind::ValueInvalidType {
            expected: "either 'true' or 'false'".to_owned(),
            actual: "\"yes\"".to_owned(),
            span: 29..34,
        }]
    );

    let errors = generate_err("option go_package = true;");
    assert!(matches!(
        errors.as_slice(),
        [ParseErrorKind::ValueInvalidType { expected, .. }] if expected == "a string"
    ));

    let errors = generate_err("option optimize_for = FAST;");
    assert!(matches!(
        errors.as_slice(),
        [ParseErrorKind::ValueInvalidType { expected, actual, .. }]
            if expected == "a value of enum 'google.protobuf.FileOptions.OptimizeMode'"
                && actual == "FAST"
    ));
}

#[test]
fn message_options() {
    let file = generate_ok(
        "message Foo {
            option deprecated = true;
            option message_set_wire_format = false;
        }",
    );
    assert_eq!(
        file.message_type[0].options,
        Some(MessageOptions {
            deprecated: Some(true),
            message_set_wire_format: Some(false),
            ..Default::default()
        })
    );

    let errors = generate_err("message Foo { option map_entry = true; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::MapEntryOptionSet { span: 21..30 }]
    );
}

#[test]
fn field_options() {
    let file = generate_ok(
        r#"message Foo {
            repeated int32 a = 1 [packed = true, deprecated = true, json_name = "A1"];
            optional string b = 2 [ctype = CORD, (my.ext) = "x"];
        }"#,
    );

    let fields = &file.message_type[0].field;
    assert_eq!(
        fields[0].options,
        Some(FieldOptions {
            packed: Some(true),
            deprecated: Some(true),
            ..Default::default()
        })
    );
    assert_eq!(fields[0].json_name(), "A1");
    assert_eq!(
        fields[1].options,
        Some(FieldOptions {
            ctype: Some(1),
            uninterpreted_option: vec![UninterpretedOption {
                name: vec![NamePart {
                    name_part: "my.ext".to_owned(),
                    is_extension: true,
                }],
                string_value: Some(b"x".to_vec()),
                ..Default::default()
            }],
            ..Default::default()
        })
    );
    assert_eq!(fields[1].json_name(), "b");
}

#[test]
fn default_values() {
    let file = generate_ok(
        r#"message Foo {
            optional int32 a = 1 [default = -5];
            optional string s = 2 [default = "hi"];
            optional bytes b = 3 [default = "\n\x01"];
            optional E e = 4 [default = TWO];
            optional double d = 5 [default = -inf];
            optional bool f = 6 [default = true];
            optional uint64 u = 7 [default = 18446744073709551615];
            optional float g = 8 [default = 1.5];
        }
        enum E { ONE = 1; TWO = 2; }"#,
    );

    let defaults: Vec<_> = file.message_type[0]
        .field
        .iter()
        .map(|field| field.default_value())
        .collect();
    assert_eq!(
        defaults,
        vec![
            "-5",
            "hi",
            "\\n\\001",
            "TWO",
            "-inf",
            "true",
            "18446744073709551615",
            "1.5"
        ]
    );
    assert!(file.message_type[0]
        .field
        .iter()
        .all(|field| field.options.is_none()));
}

#[test]
fn default_value_errors() {
    let errors = generate_err(r#"syntax = "proto3"; message Foo { int32 a = 1 [default = 5]; }"#);
    assert_eq!(
        errors,
        vec![ParseErrorKind::Proto3DefaultValue { span: 46..57 }]
    );

    let errors = generate_err("message Foo { repeated int32 a = 1 [default = 5]; }");
    assert!(matches!(
        errors.as_slice(),
        [ParseErrorKind::InvalidDefault {
            kind: "repeated",
            ..
        }]
    ));

    let errors = generate_err("message Foo { optional Foo a = 1 [default = 5]; }");
    assert!(matches!(
        errors.as_slice(),
        [ParseErrorKind::InvalidDefault {
            kind: "message",
            ..
        }]
    ));

    let errors = generate_err("message Foo { optional uint32 a = 1 [default = -1]; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::IntegerValueOutOfRange {
            expected: "an unsigned 32-bit integer".to_owned(),
            actual: "-1".to_owned(),
            min: "0".to_owned(),
            max: "4294967295".to_owned(),
            span: 47..49,
        }]
    );

    let errors = generate_err(
        "message Foo { optional E e = 1 [default = THREE]; }
        enum E { ONE = 1; }",
    );
    assert!(matches!(
        errors.as_slice(),
        [ParseErrorKind::ValueInvalidType { expected, .. }] if expected == "a value of enum 'E'"
    ));
}

#[test]
fn enums() {
    let file = generate_ok(
        "enum E {
            option allow_alias = true;
            A = 0;
            B = 0;
            C = -1 [deprecated = true];
            reserved 2 to 10, 20 to max;
            reserved \"D\";
        }",
    );

    let e = &file.enum_type[0];
    assert_eq!(e.options, Some(EnumOptions {
        allow_alias: Some(true),
        ..Default::default()
    }));
    let numbers: Vec<_> = e.value.iter().map(|value| value.number()).collect();
    assert_eq!(numbers, vec![0, 0, -1]);
    assert_eq!(e.value[2].options.as_ref().unwrap().deprecated, Some(true));
    assert_eq!(
        e.reserved_range,
        vec![
            EnumReservedRange {
                start: Some(2),
                end: Some(10),
            },
            EnumReservedRange {
                start: Some(20),
                end: Some(i32::MAX),
            },
        ]
    );
    assert_eq!(e.reserved_name, vec!["D"]);
}

#[test]
fn enum_errors() {
    let errors = generate_err("enum E {}");
    assert_eq!(errors, vec![ParseErrorKind::EmptyEnum { span: 5..6 }]);

    let errors = generate_err(r#"syntax = "proto3"; enum E { A = 1; }"#);
    assert_eq!(
        errors,
        vec![ParseErrorKind::Proto3FirstEnumValueNotZero { span: 32..33 }]
    );

    let errors = generate_err("enum E { A = 0; B = 5; reserved 5; reserved \"A\"; }");
    assert_eq!(errors.len(), 2);
    assert!(matches!(
        &errors[0],
        ParseErrorKind::ReservedFieldName { name, .. } if name == "A"
    ));
    assert!(matches!(
        &errors[1],
        ParseErrorKind::ReservedFieldNumber { number: 5, .. }
    ));

    let errors = generate_err("enum E { A = 2147483648; }");
    assert_eq!(
        errors,
        vec![ParseErrorKind::InvalidEnumNumber { span: 13..23 }]
    );
}

#[test]
fn services() {
    let file = generate_ok(
        "package pkg;
        message Req {}
        service S {
            rpc Unary (Req) returns (Req);
            rpc Server (Req) returns (stream .pkg.Req);
            rpc Client (stream Req) returns (Req) {
                option deprecated = true;
                option idempotency_level = NO_SIDE_EFFECTS;
            }
        }",
    );

    let service = &file.service[0];
    assert_eq!(service.name(), "S");
    assert_eq!(service.options, None);

    let methods = &service.method;
    assert_eq!(methods.len(), 3);
    assert!(methods
        .iter()
        .all(|method| method.input_type() == ".pkg.Req" && method.output_type() == ".pkg.Req"));

    assert_eq!(methods[0].client_streaming, None);
    assert_eq!(methods[0].server_streaming, None);
    assert_eq!(methods[1].client_streaming, None);
    assert_eq!(methods[1].server_streaming, Some(true));
    assert_eq!(methods[2].client_streaming, Some(true));
    assert_eq!(methods[2].server_streaming, None);
    assert_eq!(
        methods[2].options,
        Some(MethodOptions {
            deprecated: Some(true),
            idempotency_level: Some(1),
            ..Default::default()
        })
    );
}

#[test]
fn service_errors() {
    let errors = generate_err(
        "enum E { A = 0; }
        service S { rpc M (E) returns (Missing); }",
    );
    assert_eq!(errors.len(), 2);
    assert!(matches!(
        &errors[0],
        ParseErrorKind::InvalidMessageType { name, .. } if name == "E"
    ));
    assert!(matches!(
        &errors[1],
        ParseErrorKind::UnresolvedType { name, .. } if name == "Missing"
    ));
}
