//! Shared varint encoding and decoding utilities.
//!
//! Avro encodes `int` and `long` values, lengths, block counts and union
//! indices as variable-length integers:
//! - Each byte has 7 bits of data and 1 continuation bit (MSB)
//! - The continuation bit indicates if more bytes follow
//! - Groups are in little-endian order
//!
//! Signed values are zigzag encoded first:
//! - 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
//! - Encoding formula: (n << 1) ^ (n >> 63)
//! - Decoding formula: (n >> 1) ^ -(n & 1)

use crate::error::DecodeError;
use crate::reader::ByteCursor;

/// Longest valid encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

// ============================================================================
// Decoding Functions
// ============================================================================

/// Decode an unsigned variable-length integer.
///
/// # Errors
/// - `DecodeError::EndOfInput` if the input is truncated
/// - `DecodeError::MalformedVarint` if no terminating byte is found within
///   10 bytes
#[inline]
pub fn decode_varint<C: ByteCursor + ?Sized>(cursor: &mut C) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let byte = cursor.read_byte()?;

        // The tenth byte holds only bit 63
        if shift == 63 && byte > 0x01 {
            return Err(DecodeError::MalformedVarint);
        }

        // Add the 7 data bits to the result
        result |= ((byte & 0x7F) as u64) << shift;

        // Check if this is the last byte (MSB is 0)
        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;

        // Prevent overflow (max 10 bytes for 64-bit varint)
        if shift >= 64 {
            return Err(DecodeError::MalformedVarint);
        }
    }
}

/// Decode a signed variable-length integer (zigzag encoded).
///
/// # Errors
/// Same as [`decode_varint`].
#[inline]
pub fn decode_zigzag<C: ByteCursor + ?Sized>(cursor: &mut C) -> Result<i64, DecodeError> {
    let unsigned = decode_varint(cursor)?;
    // Zigzag decode: (n >> 1) ^ -(n & 1)
    Ok(((unsigned >> 1) as i64) ^ (-((unsigned & 1) as i64)))
}

/// Skip over a varint without decoding its value.
#[inline]
pub fn skip_varint<C: ByteCursor + ?Sized>(cursor: &mut C) -> Result<(), DecodeError> {
    for i in 0..MAX_VARINT_LEN {
        let byte = cursor.read_byte()?;
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            break;
        }
        if byte & 0x80 == 0 {
            return Ok(());
        }
    }
    Err(DecodeError::MalformedVarint)
}

// ============================================================================
// Encoding Functions
// ============================================================================

/// Encode an unsigned integer as a variable-length integer.
#[inline]
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut result = Vec::with_capacity(MAX_VARINT_LEN);
    write_varint(value, &mut result);
    result
}

/// Encode a signed integer as a zigzag-encoded variable-length integer.
#[inline]
pub fn encode_zigzag(value: i64) -> Vec<u8> {
    let mut result = Vec::with_capacity(MAX_VARINT_LEN);
    write_zigzag(value, &mut result);
    result
}

/// Append the varint encoding of `value` to `out`.
#[inline]
pub fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80; // Set continuation bit
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Append the zigzag varint encoding of `value` to `out`.
#[inline]
pub fn write_zigzag(value: i64, out: &mut Vec<u8>) {
    // Zigzag encode: (n << 1) ^ (n >> 63)
    write_varint(((value << 1) ^ (value >> 63)) as u64, out);
}
