//! Avro binary encoding of generic values.

mod encode;

pub use encode::{encode_value, Serializer};
