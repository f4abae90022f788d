//! Avro binary encoder for [`DecodedValue`] trees.
//!
//! This is the inverse of [`DatumDecoder`](crate::reader::DatumDecoder): a
//! value decoded against a schema encodes back to the same bytes, except
//! that arrays and maps are always written as a single block.

use std::sync::Arc;

use crate::error::EncodeError;
use crate::reader::varint::write_zigzag;
use crate::reader::DecodedValue;
use crate::schema::{json_to_value, NodeId, PrimitiveKind, RecordSchema, Schema, SchemaNode};

/// Encode `value` as `node` of `schema`, appending the bytes to `out`.
///
/// On error `out` may hold a partial encoding.
pub fn encode_value(
    schema: &Schema,
    node: NodeId,
    value: &DecodedValue,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    Encoder {
        schema,
        sized_blocks: false,
    }
    .encode(node, value, out)
}

/// Serializes values for one schema.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use contrail::reader::DecodedValue;
/// use contrail::schema::Schema;
/// use contrail::writer::Serializer;
///
/// let schema = Arc::new(Schema::parse(r#""long""#).unwrap());
/// let bytes = Serializer::new(schema).serialize(&DecodedValue::Long(-1)).unwrap();
/// assert_eq!(bytes, vec![0x01]);
/// ```
#[derive(Debug, Clone)]
pub struct Serializer {
    schema: Arc<Schema>,
    sized_blocks: bool,
}

impl Serializer {
    /// Create a serializer for `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            sized_blocks: false,
        }
    }

    /// Write array and map blocks with a negative count followed by the
    /// block's byte size, which lets readers skip them without decoding.
    pub fn with_sized_blocks(mut self, sized_blocks: bool) -> Self {
        self.sized_blocks = sized_blocks;
        self
    }

    /// The schema values are encoded against.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Encode `value` as the schema's root.
    pub fn serialize(&self, value: &DecodedValue) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.serialize_into(value, &mut out)?;
        Ok(out)
    }

    /// Encode `value` as the schema's root, appending to `out`.
    pub fn serialize_into(&self, value: &DecodedValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        Encoder {
            schema: &self.schema,
            sized_blocks: self.sized_blocks,
        }
        .encode(self.schema.root(), value, out)
    }
}

struct Encoder<'a> {
    schema: &'a Schema,
    sized_blocks: bool,
}

impl Encoder<'_> {
    fn encode(
        &self,
        node: NodeId,
        value: &DecodedValue,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        if let DecodedValue::Host(_) = value {
            return Err(EncodeError::InvalidValue(format!(
                "Host values cannot be encoded (schema node {})",
                node
            )));
        }

        match self.schema.node(node) {
            SchemaNode::Primitive(kind) => encode_primitive(*kind, value, out),
            SchemaNode::Logical(l) => self.encode(l.base, value, out),
            SchemaNode::Record(record) => self.encode_record(record, value, out),
            SchemaNode::Enum(e) => {
                let symbol = match value {
                    DecodedValue::EnumSymbol { symbol, .. } => symbol,
                    DecodedValue::String(symbol) => symbol,
                    other => return Err(mismatch(other, "enum")),
                };
                let index = e.symbol_index(symbol).ok_or_else(|| {
                    EncodeError::InvalidValue(format!(
                        "Symbol '{}' is not in enum '{}'",
                        symbol,
                        e.fullname()
                    ))
                })?;
                write_zigzag(index as i64, out);
                Ok(())
            }
            SchemaNode::Array(items) => match value {
                DecodedValue::Array(values) => self.encode_block(values.len(), out, |out| {
                    values
                        .iter()
                        .try_for_each(|item| self.encode(*items, item, out))
                }),
                other => Err(mismatch(other, "array")),
            },
            SchemaNode::Map(values) => match value {
                DecodedValue::Map(entries) => {
                    // Sorted so equal maps encode to equal bytes
                    let mut entries: Vec<_> = entries.iter().collect();
                    entries.sort_by(|a, b| a.0.cmp(b.0));
                    self.encode_block(entries.len(), out, |out| {
                        entries.iter().try_for_each(|(key, value)| {
                            write_bytes(key.as_bytes(), out);
                            self.encode(*values, value, out)
                        })
                    })
                }
                other => Err(mismatch(other, "map")),
            },
            SchemaNode::Union(branches) => {
                let (branch, inner) = match value {
                    DecodedValue::Union { branch, value } => (*branch, value.as_ref()),
                    untagged => (self.select_branch(branches, untagged)?, untagged),
                };
                let branch_node = branches.get(branch).ok_or_else(|| {
                    EncodeError::InvalidValue(format!(
                        "Union branch {} out of range for {} branches",
                        branch,
                        branches.len()
                    ))
                })?;
                write_zigzag(branch as i64, out);
                self.encode(*branch_node, inner, out)
            }
            SchemaNode::Fixed(fixed) => match value {
                DecodedValue::Fixed(bytes) if bytes.len() == fixed.size => {
                    out.extend_from_slice(bytes);
                    Ok(())
                }
                DecodedValue::Fixed(bytes) => Err(EncodeError::InvalidValue(format!(
                    "Fixed '{}' needs {} bytes, got {}",
                    fixed.fullname(),
                    fixed.size,
                    bytes.len()
                ))),
                other => Err(mismatch(other, "fixed")),
            },
        }
    }

    fn encode_record(
        &self,
        record: &RecordSchema,
        value: &DecodedValue,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        if !matches!(value, DecodedValue::Record(_)) {
            return Err(mismatch(value, "record"));
        }

        for field in &record.fields {
            match value.get(&field.name) {
                Some(field_value) => self.encode(field.schema, field_value, out)?,
                None => {
                    let default = field
                        .default
                        .as_ref()
                        .ok_or_else(|| {
                            EncodeError::InvalidValue(format!(
                                "Field '{}' of record '{}' has no value and no default",
                                field.name,
                                record.fullname()
                            ))
                        })
                        .and_then(|json| {
                            json_to_value(json, self.schema, field.schema)
                                .map_err(EncodeError::InvalidValue)
                        })?;
                    self.encode(field.schema, &default, out)?;
                }
            }
        }
        Ok(())
    }

    /// Write `count` items as one block followed by the terminating zero.
    fn encode_block<F>(&self, count: usize, out: &mut Vec<u8>, write_items: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), EncodeError>,
    {
        if count > 0 {
            if self.sized_blocks {
                let mut block = Vec::new();
                write_items(&mut block)?;
                write_zigzag(-(count as i64), out);
                write_zigzag(block.len() as i64, out);
                out.extend_from_slice(&block);
            } else {
                write_zigzag(count as i64, out);
                write_items(out)?;
            }
        }
        write_zigzag(0, out);
        Ok(())
    }

    /// Pick the first branch an untagged value can be written as.
    fn select_branch(&self, branches: &[NodeId], value: &DecodedValue) -> Result<usize, EncodeError> {
        branches
            .iter()
            .position(|&b| accepts(self.schema, b, value))
            .ok_or_else(|| {
                EncodeError::TypeMismatch(format!("No union branch accepts {}", value_kind(value)))
            })
    }
}

fn encode_primitive(
    kind: PrimitiveKind,
    value: &DecodedValue,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match (kind, value) {
        (PrimitiveKind::Null, DecodedValue::Null) => {}
        (PrimitiveKind::Boolean, DecodedValue::Bool(b)) => out.push(u8::from(*b)),
        (PrimitiveKind::Int, DecodedValue::Long(v)) => {
            let v = i32::try_from(*v).map_err(|_| {
                EncodeError::InvalidValue(format!("Value {} out of range for int", v))
            })?;
            write_zigzag(i64::from(v), out);
        }
        (PrimitiveKind::Long, DecodedValue::Long(v)) => write_zigzag(*v, out),
        (PrimitiveKind::Float, DecodedValue::Double(v)) => {
            out.extend_from_slice(&(*v as f32).to_le_bytes())
        }
        (PrimitiveKind::Double, DecodedValue::Double(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (PrimitiveKind::Bytes, DecodedValue::Bytes(b)) => write_bytes(b, out),
        (PrimitiveKind::String, DecodedValue::String(s)) => write_bytes(s.as_bytes(), out),
        (kind, other) => return Err(mismatch(other, kind.name())),
    }
    Ok(())
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    write_zigzag(bytes.len() as i64, out);
    out.extend_from_slice(bytes);
}

fn accepts(schema: &Schema, node: NodeId, value: &DecodedValue) -> bool {
    match (schema.node(schema.strip_logical(node)), value) {
        (SchemaNode::Primitive(kind), value) => matches!(
            (kind, value),
            (PrimitiveKind::Null, DecodedValue::Null)
                | (PrimitiveKind::Boolean, DecodedValue::Bool(_))
                | (PrimitiveKind::Int, DecodedValue::Long(_))
                | (PrimitiveKind::Long, DecodedValue::Long(_))
                | (PrimitiveKind::Float, DecodedValue::Double(_))
                | (PrimitiveKind::Double, DecodedValue::Double(_))
                | (PrimitiveKind::Bytes, DecodedValue::Bytes(_))
                | (PrimitiveKind::String, DecodedValue::String(_))
        ),
        (SchemaNode::Record(_), DecodedValue::Record(_))
        | (SchemaNode::Enum(_), DecodedValue::EnumSymbol { .. })
        | (SchemaNode::Array(_), DecodedValue::Array(_))
        | (SchemaNode::Map(_), DecodedValue::Map(_)) => true,
        (SchemaNode::Fixed(f), DecodedValue::Fixed(b)) => b.len() == f.size,
        _ => false,
    }
}

fn value_kind(value: &DecodedValue) -> &'static str {
    match value {
        DecodedValue::Null => "null",
        DecodedValue::Bool(_) => "boolean",
        DecodedValue::Long(_) => "integer",
        DecodedValue::Double(_) => "floating point",
        DecodedValue::Bytes(_) => "bytes",
        DecodedValue::String(_) => "string",
        DecodedValue::Record(_) => "record",
        DecodedValue::Array(_) => "array",
        DecodedValue::Map(_) => "map",
        DecodedValue::EnumSymbol { .. } => "enum symbol",
        DecodedValue::Fixed(_) => "fixed",
        DecodedValue::Union { .. } => "union",
        DecodedValue::Host(_) => "host value",
    }
}

fn mismatch(value: &DecodedValue, expected: &str) -> EncodeError {
    EncodeError::TypeMismatch(format!(
        "Cannot encode {} as {}",
        value_kind(value),
        expected
    ))
}
