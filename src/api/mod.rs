//! Public API module for contrail.
//!
//! # Module Structure
//! - `options`: Decoder options (`DecoderOptions`, `BooleanPolicy`, `Utf8Policy`)
//! - `deserializer`: The `Deserializer` handle and its datum iterator

pub mod deserializer;
pub mod options;

// Re-export main types
pub use deserializer::{DatumIter, Deserializer};
pub use options::{BooleanPolicy, DecoderOptions, Utf8Policy};
