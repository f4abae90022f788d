//! Avro datum reader components
//!
//! This module provides the byte cursors, the primitive and schema-driven
//! binary decoders, and decoding under a reader/writer resolution plan.

mod cursor;
pub mod decode;
mod resolving;
mod value;
pub mod varint;

pub use cursor::{ByteCursor, ReadCursor, SliceCursor};
pub use decode::{
    decode_block_header,
    // Primitive type decoders
    decode_boolean,
    decode_bytes,
    decode_double,
    decode_enum_index,
    decode_fixed,
    decode_float,
    decode_int,
    decode_length,
    decode_long,
    decode_primitive,
    decode_string,
    decode_union_index,
    // Schema-aware skipping
    skip_value,
    BlockHeader,
    DatumDecoder,
};
pub use resolving::ResolvingDecoder;
pub use value::DecodedValue;
pub use varint::{decode_varint, decode_zigzag, encode_varint, encode_zigzag};
