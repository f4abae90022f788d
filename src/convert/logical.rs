//! Built-in conversions for Avro logical types.

use std::fmt;

use crate::convert::{ConversionTable, HostValue};
use crate::error::ConversionError;
use crate::reader::DecodedValue;
use crate::schema::{LogicalTypeName, Schema, SchemaNode};

/// A logical type value produced by [`ConversionTable::logical_types`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalValue {
    /// Decimal value (unscaled bytes, precision, scale)
    Decimal {
        /// The unscaled value as big-endian two's complement bytes
        unscaled: Vec<u8>,
        /// The precision (total number of digits)
        precision: u32,
        /// The scale (number of digits after decimal point)
        scale: u32,
    },
    /// UUID in its canonical 36-character form
    Uuid(String),
    /// Date value (days since Unix epoch, 1970-01-01)
    Date(i32),
    /// Time in milliseconds since midnight
    TimeMillis(i32),
    /// Time in microseconds since midnight
    TimeMicros(i64),
    /// Timestamp in milliseconds since Unix epoch
    TimestampMillis(i64),
    /// Timestamp in microseconds since Unix epoch
    TimestampMicros(i64),
    /// Local timestamp in milliseconds (no timezone)
    LocalTimestampMillis(i64),
    /// Local timestamp in microseconds (no timezone)
    LocalTimestampMicros(i64),
    /// Duration (months, days, milliseconds)
    Duration {
        /// Number of months
        months: u32,
        /// Number of days
        days: u32,
        /// Number of milliseconds
        milliseconds: u32,
    },
}

impl LogicalValue {
    /// Interpret a decoded base value as `logical_type`.
    pub fn from_decoded(
        logical_type: &LogicalTypeName,
        value: DecodedValue,
    ) -> Result<Self, ConversionError> {
        match (logical_type, value) {
            (LogicalTypeName::Decimal { precision, scale }, DecodedValue::Bytes(b))
            | (LogicalTypeName::Decimal { precision, scale }, DecodedValue::Fixed(b)) => {
                Ok(LogicalValue::Decimal {
                    unscaled: b,
                    precision: *precision,
                    scale: *scale,
                })
            }
            (LogicalTypeName::Uuid, DecodedValue::String(s)) => {
                // Basic validation: 32 hex digits and 4 dashes
                if s.len() != 36 {
                    return Err(ConversionError::new(format!(
                        "Invalid UUID string length: expected 36, got {}",
                        s.len()
                    )));
                }
                Ok(LogicalValue::Uuid(s))
            }
            (LogicalTypeName::Uuid, DecodedValue::Fixed(b)) if b.len() == 16 => {
                Ok(LogicalValue::Uuid(format_uuid(&b)))
            }
            (LogicalTypeName::Date, DecodedValue::Long(days)) => Ok(LogicalValue::Date(
                i32::try_from(days)
                    .map_err(|_| ConversionError::new(format!("Date {} out of range", days)))?,
            )),
            (LogicalTypeName::TimeMillis, DecodedValue::Long(millis)) => {
                // Must be in range [0, 86400000) (24 hours in milliseconds)
                if !(0..86_400_000).contains(&millis) {
                    return Err(ConversionError::new(format!(
                        "Invalid time-millis value: {} (must be in range [0, 86400000))",
                        millis
                    )));
                }
                Ok(LogicalValue::TimeMillis(millis as i32))
            }
            (LogicalTypeName::TimeMicros, DecodedValue::Long(micros)) => {
                if !(0..86_400_000_000).contains(&micros) {
                    return Err(ConversionError::new(format!(
                        "Invalid time-micros value: {} (must be in range [0, 86400000000))",
                        micros
                    )));
                }
                Ok(LogicalValue::TimeMicros(micros))
            }
            (LogicalTypeName::TimestampMillis, DecodedValue::Long(v)) => {
                Ok(LogicalValue::TimestampMillis(v))
            }
            (LogicalTypeName::TimestampMicros, DecodedValue::Long(v)) => {
                Ok(LogicalValue::TimestampMicros(v))
            }
            (LogicalTypeName::LocalTimestampMillis, DecodedValue::Long(v)) => {
                Ok(LogicalValue::LocalTimestampMillis(v))
            }
            (LogicalTypeName::LocalTimestampMicros, DecodedValue::Long(v)) => {
                Ok(LogicalValue::LocalTimestampMicros(v))
            }
            (LogicalTypeName::Duration, DecodedValue::Fixed(b)) if b.len() == 12 => {
                // Three little-endian unsigned 32-bit integers
                Ok(LogicalValue::Duration {
                    months: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
                    days: u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
                    milliseconds: u32::from_le_bytes([b[8], b[9], b[10], b[11]]),
                })
            }
            (logical_type, value) => Err(ConversionError::new(format!(
                "Cannot interpret {:?} as {}",
                value,
                logical_type.name()
            ))),
        }
    }

    /// The unscaled decimal value, if this is a decimal of at most 16 bytes.
    pub fn unscaled_i128(&self) -> Option<i128> {
        match self {
            LogicalValue::Decimal { unscaled, .. } if unscaled.len() <= 16 => {
                if unscaled.is_empty() {
                    return Some(0);
                }
                // Big-endian two's complement, sign-extended
                let mut value: i128 = if unscaled[0] & 0x80 != 0 { -1 } else { 0 };
                for &byte in unscaled {
                    value = (value << 8) | (byte as i128);
                }
                Some(value)
            }
            _ => None,
        }
    }
}

impl fmt::Display for LogicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalValue::Decimal { scale, .. } => match self.unscaled_i128() {
                Some(value) => write!(f, "{}", format_decimal(value, *scale)),
                None => f.write_str("<decimal out of range>"),
            },
            LogicalValue::Uuid(s) => f.write_str(s),
            LogicalValue::Date(v) | LogicalValue::TimeMillis(v) => write!(f, "{}", v),
            LogicalValue::TimeMicros(v)
            | LogicalValue::TimestampMillis(v)
            | LogicalValue::TimestampMicros(v)
            | LogicalValue::LocalTimestampMillis(v)
            | LogicalValue::LocalTimestampMicros(v) => write!(f, "{}", v),
            LogicalValue::Duration {
                months,
                days,
                milliseconds,
            } => write!(f, "P{}M{}DT{}ms", months, days, milliseconds),
        }
    }
}

fn format_decimal(value: i128, scale: u32) -> String {
    if scale == 0 {
        return value.to_string();
    }

    let abs_value = value.unsigned_abs();
    let divisor = 10u128.pow(scale.min(38));
    let integer_part = abs_value / divisor;
    let fractional_part = abs_value % divisor;

    let sign = if value < 0 { "-" } else { "" };
    format!(
        "{}{}.{:0>width$}",
        sign,
        integer_part,
        fractional_part,
        width = scale as usize
    )
}

fn format_uuid(b: &[u8]) -> String {
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        b[0], b[1], b[2], b[3],
        b[4], b[5],
        b[6], b[7],
        b[8], b[9],
        b[10], b[11], b[12], b[13], b[14], b[15]
    )
}

impl ConversionTable {
    /// Build a table converting every logical type node of `schema` into a
    /// [`LogicalValue`] host value.
    ///
    /// # Example
    /// ```
    /// use contrail::convert::{ConversionTable, LogicalValue};
    /// use contrail::schema::Schema;
    ///
    /// let schema = Schema::parse(r#"{"type": "int", "logicalType": "date"}"#).unwrap();
    /// let table = ConversionTable::logical_types(&schema);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn logical_types(schema: &Schema) -> Self {
        let mut table = ConversionTable::new();
        for (id, node) in schema.nodes() {
            if let SchemaNode::Logical(l) = node {
                let logical_type = l.logical_type.clone();
                table.register_node(id, move |value| {
                    LogicalValue::from_decoded(&logical_type, value).map(HostValue::new)
                });
            }
        }
        table
    }
}
