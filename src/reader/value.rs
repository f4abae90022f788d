//! Generic decoded values.

use std::collections::HashMap;

use base64::Engine;
use serde_json::{Map, Number, Value};

use crate::convert::HostValue;

/// A decoded Avro datum.
///
/// `int` and `long` both decode to [`DecodedValue::Long`]; `float` and
/// `double` both decode to [`DecodedValue::Double`]. Values that went through
/// a conversion table entry are [`DecodedValue::Host`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Signed integer (int or long)
    Long(i64),
    /// Floating point (float or double)
    Double(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Record fields in reader schema order
    Record(Vec<(String, DecodedValue)>),
    /// Array items
    Array(Vec<DecodedValue>),
    /// Map entries; a key repeated in the data keeps its last value
    Map(HashMap<String, DecodedValue>),
    /// Enum symbol with its index in the reader's symbol list
    EnumSymbol { index: usize, symbol: String },
    /// Fixed-size byte array
    Fixed(Vec<u8>),
    /// Union branch (reader branch index) and its value
    Union {
        branch: usize,
        value: Box<DecodedValue>,
    },
    /// Value produced by a conversion table entry
    Host(HostValue),
}

impl DecodedValue {
    /// Look up a record field by name.
    pub fn get(&self, field: &str) -> Option<&DecodedValue> {
        match self {
            DecodedValue::Record(fields) => {
                fields.iter().find(|(name, _)| name == field).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Look up an array item by index.
    pub fn index(&self, i: usize) -> Option<&DecodedValue> {
        match self {
            DecodedValue::Array(items) => items.get(i),
            _ => None,
        }
    }

    /// Look up a map entry by key.
    pub fn key(&self, key: &str) -> Option<&DecodedValue> {
        match self {
            DecodedValue::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Strip union tags, returning the innermost value.
    pub fn untagged(&self) -> &DecodedValue {
        match self {
            DecodedValue::Union { value, .. } => value.untagged(),
            other => other,
        }
    }

    /// Downcast a host value produced by a conversion.
    pub fn as_host<T: 'static>(&self) -> Option<&T> {
        match self {
            DecodedValue::Host(h) => h.downcast_ref(),
            _ => None,
        }
    }

    /// Convert the value to a serde_json::Value.
    ///
    /// Bytes and fixed values become base64 strings, unions are written
    /// without their tag, and host values become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            DecodedValue::Null | DecodedValue::Host(_) => Value::Null,
            DecodedValue::Bool(b) => Value::Bool(*b),
            DecodedValue::Long(l) => Value::Number((*l).into()),
            DecodedValue::Double(d) => Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DecodedValue::Bytes(b) | DecodedValue::Fixed(b) => {
                Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            DecodedValue::String(s) => Value::String(s.clone()),
            DecodedValue::Record(fields) => {
                let mut map = Map::new();
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                Value::Object(map)
            }
            DecodedValue::Array(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            DecodedValue::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json());
                }
                Value::Object(map)
            }
            DecodedValue::EnumSymbol { symbol, .. } => Value::String(symbol.clone()),
            DecodedValue::Union { value, .. } => value.to_json(),
        }
    }
}
