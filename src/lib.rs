//! Self-contained Avro binary datum deserializer
//!
//! This library decodes Avro binary-encoded datums (no container framing)
//! against a schema given as JSON, resolving data written with a different
//! writer schema into the reader schema. Decoded values can be transformed
//! into host values with a conversion table, and encoded back to Avro binary.
//!
//! # Example
//! ```
//! use contrail::{DecodedValue, Deserializer, SliceCursor};
//!
//! let schema = r#"{"type": "record", "name": "Point", "fields": [
//!     {"name": "x", "type": "int"},
//!     {"name": "label", "type": ["null", "string"]}
//! ]}"#;
//! let mut de = Deserializer::new(schema, SliceCursor::from_slice(&[])).unwrap();
//! let value = de.deserialize(vec![0x04, 0x02, 0x02, b'a']).unwrap();
//! assert_eq!(value.get("x"), Some(&DecodedValue::Long(2)));
//! assert_eq!(
//!     value.get("label").map(|v| v.untagged()),
//!     Some(&DecodedValue::String("a".to_string()))
//! );
//! ```

pub mod api;
pub mod convert;
pub mod error;
pub mod reader;
pub mod schema;
pub mod writer;

// Re-export main types
pub use api::{BooleanPolicy, DatumIter, DecoderOptions, Deserializer, Utf8Policy};
pub use convert::{ConversionFn, ConversionTable, HostValue, LogicalValue};
pub use error::{ConversionError, DecodeError, EncodeError, ReaderError, SchemaError};
pub use reader::{
    decode_boolean, decode_bytes, decode_double, decode_float, decode_int, decode_long,
    decode_string, decode_varint, decode_zigzag, encode_varint, encode_zigzag, skip_value,
};
pub use reader::{ByteCursor, DatumDecoder, DecodedValue, ReadCursor, ResolvingDecoder, SliceCursor};
pub use schema::{
    json_to_value, parse_schema, parse_schema_with_options, EnumSchema, FieldSchema, FixedSchema,
    LogicalType, LogicalTypeName, NodeId, PrimitiveKind, RecordSchema, ResolutionPlan, Schema,
    SchemaCache, SchemaNode, SchemaParser, TypePromotion,
};
pub use writer::{encode_value, Serializer};
