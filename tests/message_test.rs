use bytes::Bytes;
use byteform::{
    ConfigError, EnumType, FieldSpec, Message, Mode, Record, UnpackErrorKind, Value,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn inner() -> Message {
    Message::new(
        "Inner",
        &[FieldSpec::format("v", "H")],
        Mode::LittleEndian,
    )
    .unwrap()
}

#[test]
fn test_count_linked_scenario() {
    let item = Message::new(
        "Item",
        &[FieldSpec::format("x", "B"), FieldSpec::format("y", "B")],
        Mode::Native,
    )
    .unwrap();
    let msg = Message::new(
        "Packet",
        &[
            FieldSpec::length("count", "H", "items"),
            FieldSpec::variable("items", &item, "count"),
        ],
        Mode::Native,
    )
    .unwrap();
    msg.validate().unwrap();

    let values = Record::from_iter([
        ("count", Value::Uint(2)),
        (
            "items",
            Value::List(vec![
                Value::Record(Record::from_iter([("x", 1u8), ("y", 2u8)])),
                Value::Record(Record::from_iter([("x", 3u8), ("y", 4u8)])),
            ]),
        ),
    ]);

    let packed = msg.pack(&values).unwrap();
    assert_eq!(packed.len(), 6);
    assert_eq!(&packed[2..], &[0x01, 0x02, 0x03, 0x04]);

    let record = msg.unpack(&packed).unwrap();
    assert_eq!(record, values);
}

#[test]
fn test_mode_propagates_into_nested_messages() {
    let mut msg = Message::new(
        "Outer",
        &[
            FieldSpec::format("header", "H"),
            FieldSpec::length("count", "H", "items"),
            FieldSpec::variable("items", &inner(), "count"),
        ],
        Mode::LittleEndian,
    )
    .unwrap();

    let values = Record::from_iter([
        ("header", Value::Uint(0x0102)),
        ("count", Value::Uint(1)),
        (
            "items",
            Value::List(vec![Value::Record(Record::from_iter([(
                "v",
                Value::Uint(0x0304),
            )]))]),
        ),
    ]);

    let little = msg.pack(&values).unwrap();
    assert_eq!(&little[..], &[0x02, 0x01, 0x01, 0x00, 0x04, 0x03]);

    msg.update(Some(Mode::BigEndian), None);
    for element in msg.elements() {
        assert_eq!(element.mode(), Mode::BigEndian);
    }

    let big = msg.pack(&values).unwrap();
    // Both the outer fields and the nested field change byte order.
    assert_eq!(&big[..], &[0x01, 0x02, 0x00, 0x01, 0x03, 0x04]);
    assert_eq!(msg.unpack(&big).unwrap(), values);
}

#[test]
fn test_network_mode_matches_big_endian() {
    let values = Record::from_iter([("v", Value::Uint(0x0102))]);
    let big = Message::new("M", &[FieldSpec::format("v", "H")], Mode::BigEndian)
        .unwrap()
        .pack(&values)
        .unwrap();
    let network = Message::new("M", &[FieldSpec::format("v", "H")], Mode::Network)
        .unwrap()
        .pack(&values)
        .unwrap();
    assert_eq!(big, network);
    assert_eq!(Mode::Network.prefix(), '!');
}

#[test]
fn test_native_roundtrip_without_byte_assumptions() {
    let msg = Message::new(
        "Mixed",
        &[
            FieldSpec::format("flag", "?"),
            FieldSpec::format("small", "b"),
            FieldSpec::format("wide", "Q"),
            FieldSpec::format("ratio", "d"),
            FieldSpec::format("tag", "4s"),
        ],
        Mode::Native,
    )
    .unwrap();

    let values = Record::from_iter([
        ("flag", Value::Bool(true)),
        ("small", Value::Int(-5)),
        ("wide", Value::Uint(1 << 40)),
        ("ratio", Value::Float(2.25)),
        ("tag", Value::Str("ab".into())),
    ]);
    let packed = msg.pack(&values).unwrap();
    assert_eq!(packed.len(), 1 + 1 + 8 + 8 + 4);
    assert_eq!(msg.unpack(&packed).unwrap(), values);
}

#[test]
fn test_enum_field_roundtrip_and_diagnostics() {
    let ty = EnumType::new("Command", &[("start", 1), ("stop", 2)]);
    let msg = Message::new(
        "Cmd",
        &[
            FieldSpec::enumeration("command", "B", &ty),
            FieldSpec::format("arg", "B"),
        ],
        Mode::Native,
    )
    .unwrap();

    let values = Record::from_iter([
        ("command", Value::Str("stop".into())),
        ("arg", Value::Uint(7)),
    ]);
    let packed = msg.pack(&values).unwrap();
    assert_eq!(&packed[..], &[0x02, 0x07]);

    let record = msg.unpack(&packed).unwrap();
    assert_eq!(record["command"], Value::Enum(ty.member("stop").unwrap()));

    let bad = Bytes::from_static(&[0x09, 0x07]);
    let err = msg.unpack(&bad).unwrap_err();
    assert_eq!(
        err.kind(),
        &UnpackErrorKind::UnknownEnumValue {
            field: "command".to_string(),
            value: 9,
            enum_name: "Command".to_string(),
            buffer: Bytes::from_static(&[0x09]),
        }
    );
}

fn discriminated_msg(ty: &std::sync::Arc<EnumType>) -> Message {
    let ping = Message::new("Ping", &[FieldSpec::format("seq", "H")], Mode::BigEndian).unwrap();
    let data = Message::new(
        "Data",
        &[FieldSpec::format("a", "B"), FieldSpec::format("b", "B")],
        Mode::BigEndian,
    )
    .unwrap();

    let msg = Message::new(
        "Frame",
        &[
            FieldSpec::enumeration("kind", "B", ty),
            FieldSpec::discriminated(
                "body",
                vec![(1, Some(ping)), (2, Some(data)), (3, None)],
                "kind",
            ),
        ],
        Mode::BigEndian,
    )
    .unwrap();
    msg.validate().unwrap();
    msg
}

#[test]
fn test_discriminated_selects_arm_by_enum_value() {
    let ty = EnumType::new("FrameKind", &[("ping", 1), ("data", 2), ("empty", 3)]);
    let msg = discriminated_msg(&ty);

    let values = Record::from_iter([
        ("kind", Value::Str("ping".into())),
        (
            "body",
            Value::Record(Record::from_iter([("seq", Value::Uint(0x0102))])),
        ),
    ]);
    let packed = msg.pack(&values).unwrap();
    assert_eq!(&packed[..], &[0x01, 0x01, 0x02]);

    let record = msg.unpack(&packed).unwrap();
    assert_eq!(
        record["body"],
        Value::Record(Record::from_iter([("seq", Value::Uint(0x0102))]))
    );

    // An armless discriminant packs nothing and unpacks to null.
    let values = Record::from_iter([
        ("kind", Value::Str("empty".into())),
        ("body", Value::Null),
    ]);
    let packed = msg.pack(&values).unwrap();
    assert_eq!(&packed[..], &[0x03]);
    assert_eq!(msg.unpack(&packed).unwrap()["body"], Value::Null);
}

#[test]
fn test_discriminated_validation() {
    let ty = EnumType::new("FrameKind", &[("ping", 1)]);
    let ping = Message::new("Ping", &[FieldSpec::format("seq", "H")], Mode::Native).unwrap();

    // Arm key 9 is not a member of the referenced enumeration.
    let msg = Message::new(
        "Frame",
        &[
            FieldSpec::enumeration("kind", "B", &ty),
            FieldSpec::discriminated("body", vec![(9, Some(ping.clone()))], "kind"),
        ],
        Mode::Native,
    )
    .unwrap();
    assert_eq!(
        msg.validate().unwrap_err(),
        ConfigError::InvalidArmKey {
            field: "body".to_string(),
            value: 9,
            enum_name: "FrameKind".to_string(),
        }
    );

    // The referenced sibling must be an enum field.
    let msg = Message::new(
        "Frame",
        &[
            FieldSpec::format("kind", "B"),
            FieldSpec::discriminated("body", vec![(1, Some(ping))], "kind"),
        ],
        Mode::Native,
    )
    .unwrap();
    assert_eq!(
        msg.validate().unwrap_err(),
        ConfigError::NotAnEnum {
            field: "body".to_string(),
            target: "kind".to_string(),
        }
    );
}

#[test]
fn test_fixed_point_field_in_a_message() {
    let msg = Message::new(
        "Reading",
        &[
            FieldSpec::format("id", "B"),
            FieldSpec::fixed_point("level", "i", 16),
        ],
        Mode::BigEndian,
    )
    .unwrap();

    let values = Record::from_iter([
        ("id", Value::Uint(1)),
        ("level", Value::Decimal(Decimal::from_str("-1.5").unwrap())),
    ]);
    let packed = msg.pack(&values).unwrap();
    // -1.5 * 2^16 = -98304 = 0xFFFE8000
    assert_eq!(&packed[..], &[0x01, 0xFF, 0xFE, 0x80, 0x00]);
    assert_eq!(msg.unpack(&packed).unwrap(), values);
}

#[test]
fn test_nested_variable_messages_two_levels_deep() {
    let leaf = Message::new("Leaf", &[FieldSpec::format("v", "B")], Mode::LittleEndian).unwrap();
    let branch = Message::new(
        "Branch",
        &[
            FieldSpec::length("leaves", "B", "data"),
            FieldSpec::variable("data", &leaf, "leaves"),
        ],
        Mode::LittleEndian,
    )
    .unwrap();
    let tree = Message::new(
        "Tree",
        &[
            FieldSpec::length("branches", "B", "data"),
            FieldSpec::variable("data", &branch, "branches"),
        ],
        Mode::LittleEndian,
    )
    .unwrap();
    tree.validate().unwrap();

    let branch_value = |vs: &[u8]| {
        Value::Record(Record::from_iter([
            ("leaves", Value::Uint(vs.len() as u128)),
            (
                "data",
                Value::List(
                    vs.iter()
                        .map(|v| Value::Record(Record::from_iter([("v", *v)])))
                        .collect(),
                ),
            ),
        ]))
    };

    let values = Record::from_iter([
        ("branches", Value::Uint(2)),
        (
            "data",
            Value::List(vec![branch_value(&[1, 2]), branch_value(&[3])]),
        ),
    ]);

    let packed = tree.pack(&values).unwrap();
    assert_eq!(&packed[..], &[0x02, 0x02, 0x01, 0x02, 0x01, 0x03]);
    assert_eq!(tree.unpack(&packed).unwrap(), values);
}

#[test]
fn test_alignment_propagates_on_update() {
    let mut msg = Message::new(
        "M",
        &[FieldSpec::format("a", "B"), FieldSpec::format("b", "B")],
        Mode::Native,
    )
    .unwrap();
    msg.update(None, Some(2));
    for element in msg.elements() {
        assert_eq!(element.alignment(), 2);
    }

    let values = Record::from_iter([("a", Value::Uint(1)), ("b", Value::Uint(2))]);
    let packed = msg.pack(&values).unwrap();
    assert_eq!(&packed[..], &[0x01, 0x00, 0x02, 0x00]);
}
