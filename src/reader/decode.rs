//! Avro binary decoder for primitive and complex types.
//!
//! The decoder follows the Avro binary encoding:
//! - Varints use zigzag encoding for signed integers
//! - Floats and doubles are little-endian IEEE 754
//! - Bytes and strings are length-prefixed
//! - Arrays and maps are sequences of counted blocks ending with a zero count
//!
//! Primitive decoders are free functions over any [`ByteCursor`].
//! [`DatumDecoder`] walks a schema and builds a [`DecodedValue`] tree.

use std::collections::HashMap;

use crate::api::{BooleanPolicy, DecoderOptions, Utf8Policy};
use crate::convert::ConversionTable;
use crate::error::DecodeError;
use crate::reader::varint::{decode_zigzag, skip_varint};
use crate::reader::{ByteCursor, DecodedValue};
use crate::schema::{NodeId, PrimitiveKind, RecordSchema, Schema, SchemaNode};

/// Upper bound on items reserved ahead of decoding a block.
///
/// Block counts come from the data, so they are not trusted for allocation.
const MAX_PREALLOC_ITEMS: usize = 1024;

/// Decode a boolean value.
///
/// Avro booleans are a single byte: 0x00 for false, 0x01 for true.
#[inline]
pub fn decode_boolean<C: ByteCursor + ?Sized>(
    cursor: &mut C,
    policy: BooleanPolicy,
) -> Result<bool, DecodeError> {
    match (cursor.read_byte()?, policy) {
        (0, _) => Ok(false),
        (1, _) => Ok(true),
        (_, BooleanPolicy::Lenient) => Ok(true),
        (byte, BooleanPolicy::Strict) => Err(DecodeError::InvalidBoolean(byte)),
    }
}

/// Decode a 32-bit signed integer (zigzag varint encoded).
#[inline]
pub fn decode_int<C: ByteCursor + ?Sized>(cursor: &mut C) -> Result<i32, DecodeError> {
    let long = decode_long(cursor)?;
    i32::try_from(long).map_err(|_| {
        DecodeError::InvalidData(format!("Integer overflow: {} does not fit in i32", long))
    })
}

/// Decode a 64-bit signed integer (zigzag varint encoded).
#[inline]
pub fn decode_long<C: ByteCursor + ?Sized>(cursor: &mut C) -> Result<i64, DecodeError> {
    decode_zigzag(cursor)
}

/// Decode a 32-bit IEEE 754 floating-point number (little-endian).
#[inline]
pub fn decode_float<C: ByteCursor + ?Sized>(cursor: &mut C) -> Result<f32, DecodeError> {
    let mut bytes = [0u8; 4];
    cursor.read_into(&mut bytes)?;
    Ok(f32::from_le_bytes(bytes))
}

/// Decode a 64-bit IEEE 754 floating-point number (little-endian).
#[inline]
pub fn decode_double<C: ByteCursor + ?Sized>(cursor: &mut C) -> Result<f64, DecodeError> {
    let mut bytes = [0u8; 8];
    cursor.read_into(&mut bytes)?;
    Ok(f64::from_le_bytes(bytes))
}

/// Decode the length prefix of a bytes or string value.
///
/// Negative lengths, and lengths above `max_length`, fail with
/// `MalformedLength` before any payload byte is read.
#[inline]
pub fn decode_length<C: ByteCursor + ?Sized>(
    cursor: &mut C,
    max_length: Option<usize>,
) -> Result<usize, DecodeError> {
    let len = decode_long(cursor)?;
    let size = usize::try_from(len).map_err(|_| DecodeError::MalformedLength(len))?;
    match max_length {
        Some(max) if size > max => Err(DecodeError::MalformedLength(len)),
        _ => Ok(size),
    }
}

/// Decode a byte array (length-prefixed).
#[inline]
pub fn decode_bytes<C: ByteCursor + ?Sized>(
    cursor: &mut C,
    max_length: Option<usize>,
) -> Result<Vec<u8>, DecodeError> {
    let len = decode_length(cursor, max_length)?;
    cursor.read_exact(len)
}

/// Decode a UTF-8 string (length-prefixed).
#[inline]
pub fn decode_string<C: ByteCursor + ?Sized>(
    cursor: &mut C,
    max_length: Option<usize>,
    policy: Utf8Policy,
) -> Result<String, DecodeError> {
    let bytes = decode_bytes(cursor, max_length)?;
    match policy {
        Utf8Policy::Strict => String::from_utf8(bytes).map_err(DecodeError::from),
        Utf8Policy::Lossy => Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())),
    }
}

/// Decode a fixed-size byte array.
#[inline]
pub fn decode_fixed<C: ByteCursor + ?Sized>(
    cursor: &mut C,
    size: usize,
) -> Result<Vec<u8>, DecodeError> {
    cursor.read_exact(size)
}

/// Decode an enum index and check it against the symbol count.
#[inline]
pub fn decode_enum_index<C: ByteCursor + ?Sized>(
    cursor: &mut C,
    num_symbols: usize,
) -> Result<usize, DecodeError> {
    let index = decode_long(cursor)?;
    match usize::try_from(index) {
        Ok(i) if i < num_symbols => Ok(i),
        _ => Err(DecodeError::EnumIndexOutOfRange {
            index,
            symbols: num_symbols,
        }),
    }
}

/// Decode a union branch index and check it against the branch count.
#[inline]
pub fn decode_union_index<C: ByteCursor + ?Sized>(
    cursor: &mut C,
    num_branches: usize,
) -> Result<usize, DecodeError> {
    let index = decode_long(cursor)?;
    match usize::try_from(index) {
        Ok(i) if i < num_branches => Ok(i),
        _ => Err(DecodeError::UnionIndexOutOfRange {
            index,
            branches: num_branches,
        }),
    }
}

/// Header of one array or map block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Number of items in the block
    pub count: usize,
    /// Byte size of the block, present when the count was written negative
    pub byte_size: Option<usize>,
}

/// Decode the header of the next array or map block.
///
/// Returns `None` at the terminating zero count. A negative count means its
/// absolute value is the item count and a byte size follows.
pub fn decode_block_header<C: ByteCursor + ?Sized>(
    cursor: &mut C,
) -> Result<Option<BlockHeader>, DecodeError> {
    let count = decode_long(cursor)?;
    if count == 0 {
        return Ok(None);
    }

    let byte_size = if count < 0 {
        let size = decode_long(cursor)?;
        Some(usize::try_from(size).map_err(|_| DecodeError::MalformedLength(size))?)
    } else {
        None
    };

    let items = count
        .checked_abs()
        .and_then(|c| usize::try_from(c).ok())
        .ok_or(DecodeError::MalformedLength(count))?;

    Ok(Some(BlockHeader {
        count: items,
        byte_size,
    }))
}

/// Decode one primitive value.
#[inline]
pub fn decode_primitive<C: ByteCursor + ?Sized>(
    cursor: &mut C,
    kind: PrimitiveKind,
    options: &DecoderOptions,
) -> Result<DecodedValue, DecodeError> {
    Ok(match kind {
        PrimitiveKind::Null => DecodedValue::Null,
        PrimitiveKind::Boolean => DecodedValue::Bool(decode_boolean(cursor, options.boolean_policy)?),
        PrimitiveKind::Int => DecodedValue::Long(decode_int(cursor)? as i64),
        PrimitiveKind::Long => DecodedValue::Long(decode_long(cursor)?),
        PrimitiveKind::Float => DecodedValue::Double(decode_float(cursor)? as f64),
        PrimitiveKind::Double => DecodedValue::Double(decode_double(cursor)?),
        PrimitiveKind::Bytes => DecodedValue::Bytes(decode_bytes(cursor, options.max_length)?),
        PrimitiveKind::String => DecodedValue::String(decode_string(
            cursor,
            options.max_length,
            options.utf8_policy,
        )?),
    })
}

/// Nesting counter shared by the decoders.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DepthGuard {
    depth: usize,
    max: usize,
}

impl DepthGuard {
    pub(crate) fn new(max: usize) -> Self {
        Self { depth: 0, max }
    }

    #[inline]
    pub(crate) fn enter(&mut self) -> Result<(), DecodeError> {
        self.depth += 1;
        if self.depth > self.max {
            return Err(DecodeError::InvalidData(format!(
                "Maximum nesting depth of {} exceeded",
                self.max
            )));
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }
}

// ============================================================================
// Skip Functions
// ============================================================================

/// Skip over a value of `node` without materializing it.
///
/// Blocks written with a byte size are skipped in one step. Used for writer
/// fields the reader does not know about.
pub fn skip_value<C: ByteCursor + ?Sized>(
    schema: &Schema,
    node: NodeId,
    cursor: &mut C,
    max_depth: usize,
) -> Result<(), DecodeError> {
    skip_inner(schema, node, cursor, &mut DepthGuard::new(max_depth))
}

fn skip_inner<C: ByteCursor + ?Sized>(
    schema: &Schema,
    node: NodeId,
    cursor: &mut C,
    depth: &mut DepthGuard,
) -> Result<(), DecodeError> {
    match schema.node(node) {
        SchemaNode::Primitive(kind) => match kind {
            PrimitiveKind::Null => Ok(()),
            PrimitiveKind::Boolean => cursor.skip(1),
            PrimitiveKind::Int | PrimitiveKind::Long => skip_varint(cursor),
            PrimitiveKind::Float => cursor.skip(4),
            PrimitiveKind::Double => cursor.skip(8),
            PrimitiveKind::Bytes | PrimitiveKind::String => {
                let len = decode_length(cursor, None)?;
                cursor.skip(len)
            }
        },
        SchemaNode::Fixed(f) => cursor.skip(f.size),
        SchemaNode::Enum(_) => skip_varint(cursor),
        SchemaNode::Logical(l) => skip_inner(schema, l.base, cursor, depth),
        SchemaNode::Array(items) => {
            depth.enter()?;
            skip_blocks(cursor, |c| skip_inner(schema, *items, c, depth))?;
            depth.leave();
            Ok(())
        }
        SchemaNode::Map(values) => {
            depth.enter()?;
            skip_blocks(cursor, |c| {
                let len = decode_length(c, None)?;
                c.skip(len)?;
                skip_inner(schema, *values, c, depth)
            })?;
            depth.leave();
            Ok(())
        }
        SchemaNode::Union(branches) => {
            let index = decode_union_index(cursor, branches.len())?;
            depth.enter()?;
            skip_inner(schema, branches[index], cursor, depth)?;
            depth.leave();
            Ok(())
        }
        SchemaNode::Record(r) => {
            depth.enter()?;
            for field in &r.fields {
                skip_inner(schema, field.schema, cursor, depth)?;
            }
            depth.leave();
            Ok(())
        }
    }
}

fn skip_blocks<C, F>(cursor: &mut C, mut skip_item: F) -> Result<(), DecodeError>
where
    C: ByteCursor + ?Sized,
    F: FnMut(&mut C) -> Result<(), DecodeError>,
{
    while let Some(block) = decode_block_header(cursor)? {
        match block.byte_size {
            // Block has byte size - we can skip directly
            Some(size) => cursor.skip(size)?,
            None => {
                for _ in 0..block.count {
                    skip_item(cursor)?;
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// Schema-directed decoding
// ============================================================================

/// Decodes datums written with the same schema they are read with.
///
/// Values are built bottom-up. A conversion table, when present, is applied
/// to each value right after its own decode and before it is attached to its
/// parent.
pub struct DatumDecoder<'a, C: ByteCursor + ?Sized> {
    schema: &'a Schema,
    cursor: &'a mut C,
    options: &'a DecoderOptions,
    conversions: Option<&'a ConversionTable>,
    depth: DepthGuard,
}

impl<'a, C: ByteCursor + ?Sized> DatumDecoder<'a, C> {
    /// Create a decoder reading from `cursor`.
    pub fn new(schema: &'a Schema, cursor: &'a mut C, options: &'a DecoderOptions) -> Self {
        Self {
            schema,
            cursor,
            options,
            conversions: None,
            depth: DepthGuard::new(options.max_depth),
        }
    }

    /// Apply `conversions` to decoded values.
    pub fn with_conversions(mut self, conversions: Option<&'a ConversionTable>) -> Self {
        self.conversions = conversions;
        self
    }

    /// Decode one datum of the schema's root type.
    pub fn decode_datum(&mut self) -> Result<DecodedValue, DecodeError> {
        self.decode(self.schema.root())
    }

    /// Decode one value of `node` and apply its conversion.
    pub fn decode(&mut self, node: NodeId) -> Result<DecodedValue, DecodeError> {
        let value = self.decode_raw(node)?;
        match self.conversions {
            Some(table) => Ok(table.convert_node(node, value)?),
            None => Ok(value),
        }
    }

    fn decode_raw(&mut self, node: NodeId) -> Result<DecodedValue, DecodeError> {
        let schema = self.schema;
        match schema.node(node) {
            SchemaNode::Primitive(kind) => decode_primitive(self.cursor, *kind, self.options),
            // The annotation's conversion replaces the base's
            SchemaNode::Logical(l) => self.decode_raw(l.base),
            SchemaNode::Fixed(f) => Ok(DecodedValue::Fixed(decode_fixed(self.cursor, f.size)?)),
            SchemaNode::Enum(e) => {
                let index = decode_enum_index(self.cursor, e.symbols.len())?;
                Ok(DecodedValue::EnumSymbol {
                    index,
                    symbol: e.symbols[index].clone(),
                })
            }
            SchemaNode::Record(r) => {
                self.depth.enter()?;
                let value = self.decode_record(r)?;
                self.depth.leave();
                Ok(value)
            }
            SchemaNode::Array(items) => {
                self.depth.enter()?;
                let value = self.decode_array(*items)?;
                self.depth.leave();
                Ok(value)
            }
            SchemaNode::Map(values) => {
                self.depth.enter()?;
                let value = self.decode_map(*values)?;
                self.depth.leave();
                Ok(value)
            }
            SchemaNode::Union(branches) => {
                let branch = decode_union_index(self.cursor, branches.len())?;
                self.depth.enter()?;
                let value = self.decode(branches[branch])?;
                self.depth.leave();
                Ok(DecodedValue::Union {
                    branch,
                    value: Box::new(value),
                })
            }
        }
    }

    fn decode_record(&mut self, record: &RecordSchema) -> Result<DecodedValue, DecodeError> {
        let mut fields = Vec::with_capacity(record.fields.len());

        for field in &record.fields {
            let value = self.decode_raw(field.schema)?;
            let value = match self.conversions {
                Some(table) => table.convert_field(record, &field.name, field.schema, value)?,
                None => value,
            };
            fields.push((field.name.clone(), value));
        }

        Ok(DecodedValue::Record(fields))
    }

    fn decode_array(&mut self, items: NodeId) -> Result<DecodedValue, DecodeError> {
        let mut values = Vec::new();

        while let Some(block) = decode_block_header(self.cursor)? {
            values.reserve(block.count.min(MAX_PREALLOC_ITEMS));
            for _ in 0..block.count {
                values.push(self.decode(items)?);
            }
        }

        Ok(DecodedValue::Array(values))
    }

    fn decode_map(&mut self, values: NodeId) -> Result<DecodedValue, DecodeError> {
        let mut entries = HashMap::new();

        while let Some(block) = decode_block_header(self.cursor)? {
            entries.reserve(block.count.min(MAX_PREALLOC_ITEMS));
            for _ in 0..block.count {
                let key = decode_string(self.cursor, self.options.max_length, self.options.utf8_policy)?;
                let value = self.decode(values)?;
                entries.insert(key, value);
            }
        }

        Ok(DecodedValue::Map(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::varint::encode_zigzag;
    use crate::reader::SliceCursor;

    fn cursor(data: &[u8]) -> SliceCursor {
        SliceCursor::from_slice(data)
    }

    fn decode_with(schema_json: &str, data: &[u8]) -> Result<DecodedValue, DecodeError> {
        let schema = Schema::parse(schema_json).unwrap();
        let options = DecoderOptions::default();
        let mut c = cursor(data);
        DatumDecoder::new(&schema, &mut c, &options).decode_datum()
    }

    // ========================================================================
    // Primitive tests
    // ========================================================================

    #[test]
    fn test_decode_boolean() {
        assert!(!decode_boolean(&mut cursor(&[0x00]), BooleanPolicy::Strict).unwrap());
        assert!(decode_boolean(&mut cursor(&[0x01]), BooleanPolicy::Strict).unwrap());
        assert!(matches!(
            decode_boolean(&mut cursor(&[0x02]), BooleanPolicy::Strict),
            Err(DecodeError::InvalidBoolean(2))
        ));
        assert!(decode_boolean(&mut cursor(&[0x02]), BooleanPolicy::Lenient).unwrap());
        assert!(matches!(
            decode_boolean(&mut cursor(&[]), BooleanPolicy::Strict),
            Err(DecodeError::EndOfInput)
        ));
    }

    #[test]
    fn test_decode_int_overflow() {
        let data = encode_zigzag(i32::MAX as i64 + 1);
        assert!(matches!(
            decode_int(&mut cursor(&data)),
            Err(DecodeError::InvalidData(_))
        ));
        let data = encode_zigzag(i32::MIN as i64);
        assert_eq!(decode_int(&mut cursor(&data)).unwrap(), i32::MIN);
    }

    #[test]
    fn test_decode_float_and_double() {
        let data = 3.5f32.to_le_bytes();
        assert_eq!(decode_float(&mut cursor(&data)).unwrap(), 3.5);
        let data = (-0.25f64).to_le_bytes();
        assert_eq!(decode_double(&mut cursor(&data)).unwrap(), -0.25);
        assert!(matches!(
            decode_double(&mut cursor(&data[..7])),
            Err(DecodeError::EndOfInput)
        ));
    }

    #[test]
    fn test_decode_bytes_and_string() {
        let mut data = encode_zigzag(3);
        data.extend_from_slice(b"abc");
        assert_eq!(decode_bytes(&mut cursor(&data), None).unwrap(), b"abc");
        assert_eq!(
            decode_string(&mut cursor(&data), None, Utf8Policy::Strict).unwrap(),
            "abc"
        );

        // Empty string is a single zero byte
        assert_eq!(
            decode_string(&mut cursor(&[0x00]), None, Utf8Policy::Strict).unwrap(),
            ""
        );
    }

    #[test]
    fn test_decode_length_errors() {
        let data = encode_zigzag(-1);
        assert!(matches!(
            decode_bytes(&mut cursor(&data), None),
            Err(DecodeError::MalformedLength(-1))
        ));

        let mut data = encode_zigzag(10);
        data.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            decode_bytes(&mut cursor(&data), Some(9)),
            Err(DecodeError::MalformedLength(10))
        ));

        // Length larger than the remaining input
        let data = encode_zigzag(1_000_000);
        assert!(matches!(
            decode_bytes(&mut cursor(&data), None),
            Err(DecodeError::EndOfInput)
        ));
    }

    #[test]
    fn test_decode_string_utf8_policy() {
        let mut data = encode_zigzag(2);
        data.extend_from_slice(&[0xC3, 0x28]);
        assert!(matches!(
            decode_string(&mut cursor(&data), None, Utf8Policy::Strict),
            Err(DecodeError::InvalidUtf8(_))
        ));
        let s = decode_string(&mut cursor(&data), None, Utf8Policy::Lossy).unwrap();
        assert_eq!(s, "\u{FFFD}(");
    }

    #[test]
    fn test_block_header() {
        assert_eq!(decode_block_header(&mut cursor(&[0x00])).unwrap(), None);

        let mut data = encode_zigzag(-2);
        data.extend(encode_zigzag(6));
        assert_eq!(
            decode_block_header(&mut cursor(&data)).unwrap(),
            Some(BlockHeader {
                count: 2,
                byte_size: Some(6)
            })
        );

        let mut data = encode_zigzag(-2);
        data.extend(encode_zigzag(-6));
        assert!(matches!(
            decode_block_header(&mut cursor(&data)),
            Err(DecodeError::MalformedLength(-6))
        ));

        let mut data = encode_zigzag(i64::MIN);
        data.extend(encode_zigzag(0));
        assert!(matches!(
            decode_block_header(&mut cursor(&data)),
            Err(DecodeError::MalformedLength(i64::MIN))
        ));
    }

    // ========================================================================
    // Complex type tests
    // ========================================================================

    #[test]
    fn test_decode_record() {
        let mut data = encode_zigzag(42);
        data.extend(encode_zigzag(2));
        data.extend_from_slice(b"hi");
        let value = decode_with(
            r#"{"type": "record", "name": "R", "fields": [
                {"name": "a", "type": "int"}, {"name": "b", "type": "string"}
            ]}"#,
            &data,
        )
        .unwrap();
        assert_eq!(
            value,
            DecodedValue::Record(vec![
                ("a".to_string(), DecodedValue::Long(42)),
                ("b".to_string(), DecodedValue::String("hi".to_string())),
            ])
        );
    }

    #[test]
    fn test_decode_array_blocks() {
        // Two blocks, the second with a byte size, then the terminator
        let mut data = encode_zigzag(2);
        data.extend(encode_zigzag(1));
        data.extend(encode_zigzag(2));
        data.extend(encode_zigzag(-1));
        data.extend(encode_zigzag(1));
        data.extend(encode_zigzag(3));
        data.push(0x00);

        let value = decode_with(r#"{"type": "array", "items": "long"}"#, &data).unwrap();
        assert_eq!(
            value,
            DecodedValue::Array(vec![
                DecodedValue::Long(1),
                DecodedValue::Long(2),
                DecodedValue::Long(3)
            ])
        );
    }

    #[test]
    fn test_decode_map_repeated_key_keeps_last() {
        let mut data = encode_zigzag(2);
        for v in [1, 2] {
            data.extend(encode_zigzag(1));
            data.extend_from_slice(b"k");
            data.extend(encode_zigzag(v));
        }
        data.push(0x00);

        let value = decode_with(r#"{"type": "map", "values": "int"}"#, &data).unwrap();
        assert_eq!(value.key("k"), Some(&DecodedValue::Long(2)));
    }

    #[test]
    fn test_decode_enum_out_of_range() {
        let data = encode_zigzag(10);
        let err = decode_with(
            r#"{"type": "enum", "name": "E", "symbols": ["A", "B", "C"]}"#,
            &data,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::EnumIndexOutOfRange {
                index: 10,
                symbols: 3
            }
        ));
    }

    #[test]
    fn test_decode_union() {
        let schema = r#"["int", "string", "null"]"#;
        let value = decode_with(schema, &encode_zigzag(2)).unwrap();
        assert_eq!(
            value,
            DecodedValue::Union {
                branch: 2,
                value: Box::new(DecodedValue::Null)
            }
        );

        let err = decode_with(schema, &encode_zigzag(5)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnionIndexOutOfRange {
                index: 5,
                branches: 3
            }
        ));
    }

    #[test]
    fn test_decode_recursive_depth_limit() {
        let schema = Schema::parse(
            r#"{"type": "record", "name": "Node", "fields": [
                {"name": "next", "type": ["null", "Node"]}
            ]}"#,
        )
        .unwrap();
        // Every level picks the "Node" branch; the data never terminates the chain
        let data = vec![0x02u8; 64];
        let options = DecoderOptions::default().with_max_depth(10);
        let mut c = cursor(&data);
        let err = DatumDecoder::new(&schema, &mut c, &options)
            .decode_datum()
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidData(msg) if msg.contains("depth")));
    }

    #[test]
    fn test_skip_value_uses_block_size() {
        let schema = Schema::parse(r#"{"type": "array", "items": "string"}"#).unwrap();
        // One sized block whose payload is opaque to the skipper
        let mut data = encode_zigzag(-1);
        data.extend(encode_zigzag(3));
        data.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        data.push(0x00);
        data.push(0x7F);

        let mut c = cursor(&data);
        skip_value(&schema, schema.root(), &mut c, 512).unwrap();
        assert_eq!(c.remaining(), 1);
    }

    #[test]
    fn test_decode_truncated_fails_with_end_of_input() {
        let schema = r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "long"}, {"name": "b", "type": "double"}
        ]}"#;
        let mut data = encode_zigzag(1_000_000);
        data.extend_from_slice(&1.5f64.to_le_bytes());
        for len in 0..data.len() {
            assert!(matches!(
                decode_with(schema, &data[..len]),
                Err(DecodeError::EndOfInput)
            ));
        }
        assert!(decode_with(schema, &data).is_ok());
    }
}
