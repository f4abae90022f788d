//! Conversion of decoded values into host-side values.
//!
//! A [`ConversionTable`] attaches transformation functions to schema nodes
//! or record fields. The built-in [`ConversionTable::logical_types`] table
//! maps logical type annotations to [`LogicalValue`]s.

mod logical;
mod table;

pub use logical::LogicalValue;
pub use table::{ConversionFn, ConversionTable, HostValue};
