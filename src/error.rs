//! Error types for Avro datum decoding

use std::io;
use thiserror::Error;

/// Errors that can occur during schema operations
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Invalid schema format
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Unknown type keyword
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    /// Schema text is not valid JSON
    #[error("Parse error: {0}")]
    ParseError(String),
    /// A name, field or symbol is defined twice in one scope
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
    /// A named type reference that names nothing defined before it
    #[error("Unresolved named type reference: '{0}'")]
    UnresolvedReference(String),
}

/// Errors that can occur during decoding
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The byte source ran out in the middle of a datum
    #[error("Unexpected end of input")]
    EndOfInput,
    /// Varint did not terminate within 10 bytes
    #[error("Invalid varint encoding")]
    MalformedVarint,
    /// Negative, oversized or overflowing length or block count
    #[error("Malformed length: {0}")]
    MalformedLength(i64),
    /// Boolean byte other than 0 or 1 under the strict policy
    #[error("Invalid boolean value: {0:#04x}, expected 0 or 1")]
    InvalidBoolean(u8),
    /// String is not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// Enum index outside the symbol list
    #[error("Enum index {index} out of range for {symbols} symbols")]
    EnumIndexOutOfRange { index: i64, symbols: usize },
    /// Union index outside the branch list
    #[error("Union index {index} out of range for {branches} branches")]
    UnionIndexOutOfRange { index: i64, branches: usize },
    /// Writer and reader schemas cannot be reconciled for this value
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    /// Writer enum symbol unknown to the reader, and no reader default
    #[error("Symbol '{symbol}' cannot be resolved in enum '{enum_name}'")]
    UnresolvableSymbol { symbol: String, enum_name: String },
    /// Reader field absent from the writer and without a default
    #[error("Field '{field}' of record '{record}' is missing from the writer schema and has no default")]
    MissingDefault { record: String, field: String },
    /// Data that decodes but violates the schema
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// A conversion table entry failed
    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),
    /// IO error from a streamed source
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// A previous decode failed and the cursor position is undefined
    #[error("Deserializer is unusable after a failed decode; reset it with a new cursor")]
    Poisoned,
}

/// Errors that can occur while encoding a value
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Value shape does not match the schema node
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    /// Value has the right shape but an unencodable content
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Failure reported by a host-side conversion function
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

impl ConversionError {
    /// Create a new ConversionError
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for ConversionError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ConversionError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Top-level error for entry points that parse schemas and decode data
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Schema error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Decode error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Encode error
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
}
