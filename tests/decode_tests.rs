//! Integration tests for binary decoding against a single schema.

use std::collections::HashMap;
use std::sync::Arc;

use contrail::reader::{decode_zigzag, encode_zigzag, DatumDecoder};
use contrail::*;

fn decode(schema_json: &str, bytes: &[u8]) -> Result<DecodedValue, DecodeError> {
    let schema = Schema::parse(schema_json).unwrap();
    let options = DecoderOptions::default();
    let mut cursor = SliceCursor::from_slice(bytes);
    DatumDecoder::new(&schema, &mut cursor, &options).decode_datum()
}

fn zigzag(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| encode_zigzag(*v)).collect()
}

fn string_bytes(s: &str) -> Vec<u8> {
    let mut out = encode_zigzag(s.len() as i64);
    out.extend_from_slice(s.as_bytes());
    out
}

// ============================================================================
// Varints
// ============================================================================

#[test]
fn test_varint_extremes_round_trip() {
    for value in [i64::MIN, -1, 0, 1, i64::MAX] {
        let bytes = encode_zigzag(value);
        assert!(bytes.len() <= 10);
        let mut cursor = SliceCursor::from(bytes);
        assert_eq!(decode_zigzag(&mut cursor).unwrap(), value);
        assert_eq!(cursor.remaining(), 0);
    }
    assert_eq!(encode_zigzag(i64::MIN).len(), 10);
    assert_eq!(encode_zigzag(-1), vec![0x01]);
    assert_eq!(encode_zigzag(1), vec![0x02]);
}

#[test]
fn test_overlong_varint_is_malformed() {
    assert!(matches!(
        decode(r#""long""#, &[0xFF; 11]),
        Err(DecodeError::MalformedVarint)
    ));
    assert!(matches!(
        decode(r#""long""#, &[0xFF, 0xFF]),
        Err(DecodeError::EndOfInput)
    ));
}

#[test]
fn test_int_out_of_range() {
    let bytes = encode_zigzag(i64::from(i32::MAX) + 1);
    assert!(matches!(
        decode(r#""int""#, &bytes),
        Err(DecodeError::InvalidData(_))
    ));
    assert_eq!(
        decode(r#""int""#, &encode_zigzag(i64::from(i32::MIN))).unwrap(),
        DecodedValue::Long(i64::from(i32::MIN))
    );
}

// ============================================================================
// Primitives
// ============================================================================

#[test]
fn test_primitives() {
    assert_eq!(decode(r#""null""#, &[]).unwrap(), DecodedValue::Null);
    assert_eq!(decode(r#""boolean""#, &[1]).unwrap(), DecodedValue::Bool(true));
    assert_eq!(
        decode(r#""float""#, &1.5f32.to_le_bytes()).unwrap(),
        DecodedValue::Double(1.5)
    );
    assert_eq!(
        decode(r#""double""#, &(-2.25f64).to_le_bytes()).unwrap(),
        DecodedValue::Double(-2.25)
    );
    assert_eq!(
        decode(r#""string""#, &string_bytes("héllo")).unwrap(),
        DecodedValue::String("héllo".to_string())
    );
    assert_eq!(
        decode(r#""bytes""#, &[0x06, 1, 2, 3]).unwrap(),
        DecodedValue::Bytes(vec![1, 2, 3])
    );
    assert_eq!(
        decode(r#"{"type": "fixed", "name": "F", "size": 3}"#, &[9, 8, 7]).unwrap(),
        DecodedValue::Fixed(vec![9, 8, 7])
    );
}

#[test]
fn test_boolean_policies() {
    let schema = Arc::new(Schema::parse(r#""boolean""#).unwrap());
    let mut strict = Deserializer::from_schema(schema.clone(), SliceCursor::from_slice(&[0x02]));
    assert!(matches!(
        strict.decode(),
        Err(DecodeError::InvalidBoolean(0x02))
    ));

    let mut lenient = Deserializer::from_schema(schema, SliceCursor::from_slice(&[0x02]))
        .with_options(DecoderOptions::new().with_boolean_policy(BooleanPolicy::Lenient));
    assert_eq!(lenient.decode().unwrap(), DecodedValue::Bool(true));
}

#[test]
fn test_invalid_utf8_policies() {
    let bytes = [0x04, 0xC3, 0x28];
    assert!(matches!(
        decode(r#""string""#, &bytes),
        Err(DecodeError::InvalidUtf8(_))
    ));

    let mut de = Deserializer::new(r#""string""#, SliceCursor::from_slice(&bytes))
        .unwrap()
        .with_options(DecoderOptions::new().with_utf8_policy(Utf8Policy::Lossy));
    assert_eq!(
        de.decode().unwrap(),
        DecodedValue::String("\u{FFFD}(".to_string())
    );
}

#[test]
fn test_negative_and_oversized_lengths() {
    assert!(matches!(
        decode(r#""bytes""#, &encode_zigzag(-1)),
        Err(DecodeError::MalformedLength(-1))
    ));

    let mut de = Deserializer::new(r#""string""#, SliceCursor::from(string_bytes("abcdef")))
        .unwrap()
        .with_options(DecoderOptions::new().with_max_length(Some(4)));
    assert!(matches!(de.decode(), Err(DecodeError::MalformedLength(6))));
}

// ============================================================================
// Arrays and maps
// ============================================================================

#[test]
fn test_array_block_concatenation() {
    // [1, 2] then a sized block [3] then the terminator
    let mut bytes = zigzag(&[2, 1, 2]);
    let item = encode_zigzag(3);
    bytes.extend(encode_zigzag(-1));
    bytes.extend(encode_zigzag(item.len() as i64));
    bytes.extend(item);
    bytes.push(0x00);

    assert_eq!(
        decode(r#"{"type": "array", "items": "long"}"#, &bytes).unwrap(),
        DecodedValue::Array(vec![
            DecodedValue::Long(1),
            DecodedValue::Long(2),
            DecodedValue::Long(3)
        ])
    );
}

#[test]
fn test_empty_array_and_missing_terminator() {
    let schema = r#"{"type": "array", "items": "long"}"#;
    assert_eq!(
        decode(schema, &[0x00]).unwrap(),
        DecodedValue::Array(vec![])
    );
    assert!(matches!(
        decode(schema, &zigzag(&[1, 5])),
        Err(DecodeError::EndOfInput)
    ));
}

#[test]
fn test_block_count_of_i64_min_is_malformed() {
    let mut bytes = encode_zigzag(i64::MIN);
    bytes.extend(encode_zigzag(0));
    assert!(matches!(
        decode(r#"{"type": "array", "items": "null"}"#, &bytes),
        Err(DecodeError::MalformedLength(_))
    ));
}

#[test]
fn test_map_blocks() {
    let mut bytes = encode_zigzag(1);
    bytes.extend(string_bytes("a"));
    bytes.extend(encode_zigzag(10));
    bytes.extend(encode_zigzag(2));
    bytes.extend(string_bytes("b"));
    bytes.extend(encode_zigzag(20));
    bytes.extend(string_bytes("a"));
    bytes.extend(encode_zigzag(30));
    bytes.push(0x00);

    let mut expected = HashMap::new();
    expected.insert("a".to_string(), DecodedValue::Long(30));
    expected.insert("b".to_string(), DecodedValue::Long(20));
    assert_eq!(
        decode(r#"{"type": "map", "values": "int"}"#, &bytes).unwrap(),
        DecodedValue::Map(expected)
    );
}

// ============================================================================
// Unions and enums
// ============================================================================

#[test]
fn test_union_branch_selection() {
    let schema = r#"["int", "string", "null"]"#;
    assert_eq!(
        decode(schema, &[0x04]).unwrap(),
        DecodedValue::Union {
            branch: 2,
            value: Box::new(DecodedValue::Null)
        }
    );
    assert!(matches!(
        decode(schema, &[0x0A]),
        Err(DecodeError::UnionIndexOutOfRange {
            index: 5,
            branches: 3
        })
    ));
    assert!(matches!(
        decode(schema, &encode_zigzag(-1)),
        Err(DecodeError::UnionIndexOutOfRange { index: -1, .. })
    ));
}

#[test]
fn test_enum_index_out_of_range() {
    let schema = r#"{"type": "enum", "name": "Suit", "symbols": ["A", "B", "C"]}"#;
    assert_eq!(
        decode(schema, &[0x04]).unwrap(),
        DecodedValue::EnumSymbol {
            index: 2,
            symbol: "C".to_string()
        }
    );
    let err = decode(schema, &[0x14]).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::EnumIndexOutOfRange {
            index: 10,
            symbols: 3
        }
    ));
    assert_eq!(err.to_string(), "Enum index 10 out of range for 3 symbols");
}

// ============================================================================
// Records, recursion and truncation
// ============================================================================

const PERSON: &str = r#"{
    "type": "record",
    "name": "Person",
    "fields": [
        {"name": "name", "type": "string"},
        {"name": "age", "type": "int"},
        {"name": "email", "type": ["null", "string"]},
        {"name": "tags", "type": {"type": "array", "items": "string"}},
        {"name": "score", "type": "double"}
    ]
}"#;

fn person_bytes() -> Vec<u8> {
    let mut bytes = string_bytes("Ada");
    bytes.extend(encode_zigzag(36));
    bytes.extend(encode_zigzag(1));
    bytes.extend(string_bytes("ada@example.com"));
    bytes.extend(encode_zigzag(2));
    bytes.extend(string_bytes("x"));
    bytes.extend(string_bytes("y"));
    bytes.push(0x00);
    bytes.extend(0.5f64.to_le_bytes());
    bytes
}

#[test]
fn test_record_fields_in_order() {
    let value = decode(PERSON, &person_bytes()).unwrap();
    let DecodedValue::Record(fields) = &value else {
        panic!("expected record, got {:?}", value);
    };
    let names: Vec<_> = fields.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["name", "age", "email", "tags", "score"]);
    assert_eq!(value.get("age"), Some(&DecodedValue::Long(36)));
    assert_eq!(
        value.get("email").map(|v| v.untagged()),
        Some(&DecodedValue::String("ada@example.com".to_string()))
    );
    assert_eq!(
        value.get("tags").and_then(|t| t.index(1)),
        Some(&DecodedValue::String("y".to_string()))
    );
}

#[test]
fn test_every_truncation_is_end_of_input() {
    let bytes = person_bytes();
    for len in 0..bytes.len() {
        let result = decode(PERSON, &bytes[..len]);
        assert!(
            matches!(result, Err(DecodeError::EndOfInput)),
            "prefix of {} bytes gave {:?}",
            len,
            result
        );
    }
    assert!(decode(PERSON, &bytes).is_ok());
}

#[test]
fn test_recursive_schema_decodes_and_is_bounded() {
    let schema = r#"{"type": "record", "name": "Node", "fields": [
        {"name": "value", "type": "long"},
        {"name": "next", "type": ["null", "Node"]}
    ]}"#;
    // 1 -> 2 -> null
    let bytes = zigzag(&[1, 1, 2, 0]);
    let value = decode(schema, &bytes).unwrap();
    let next = value.get("next").unwrap().untagged();
    assert_eq!(next.get("value"), Some(&DecodedValue::Long(2)));

    // A chain deeper than max_depth fails instead of exhausting the stack
    let chain = |levels: usize| {
        let mut bytes = Vec::new();
        for _ in 0..levels {
            bytes.extend(zigzag(&[0, 1]));
        }
        bytes.extend(zigzag(&[0, 0]));
        bytes
    };
    let mut de = Deserializer::new(schema, SliceCursor::from(chain(40)))
        .unwrap()
        .with_options(DecoderOptions::new().with_max_depth(32));
    let err = de.decode().unwrap_err();
    assert!(err.to_string().contains("Maximum nesting depth"));

    let mut de = Deserializer::new(schema, SliceCursor::from(chain(40))).unwrap();
    assert!(de.decode().is_ok());

    let mut de = Deserializer::new(schema, SliceCursor::from(chain(100))).unwrap();
    assert!(matches!(de.decode(), Err(DecodeError::InvalidData(_))));
}

#[test]
fn test_default_depth_limit_fits_small_stack() {
    // Every level selects the "Node" branch and never terminates the chain
    let schema = r#"{"type": "record", "name": "Node", "fields": [
        {"name": "next", "type": ["int", "Node"]}
    ]}"#;
    let mut hostile = vec![0x02u8; 10_000];
    hostile.extend([0x00, 0x00]);

    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || {
            let mut plain = Deserializer::new(schema, SliceCursor::from(hostile.clone())).unwrap();
            let plain = plain.decode();

            let mut resolving = Deserializer::new(schema, SliceCursor::from(hostile))
                .unwrap()
                .with_writer_schema(schema)
                .unwrap();
            let resolving = resolving.decode();
            (plain, resolving)
        })
        .unwrap();

    let (plain, resolving) = worker.join().unwrap();
    for result in [plain, resolving] {
        assert!(
            matches!(&result, Err(DecodeError::InvalidData(msg)) if msg.contains("depth")),
            "unexpected {:?}",
            result
        );
    }
}

#[test]
fn test_json_view_of_decoded_value() {
    let value = decode(PERSON, &person_bytes()).unwrap();
    let json = value.to_json();
    assert_eq!(json["name"], "Ada");
    assert_eq!(json["email"], "ada@example.com");
    assert_eq!(json["tags"][0], "x");
}
