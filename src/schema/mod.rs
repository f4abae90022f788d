//! Avro schema types and parsing.
//!
//! This module defines the Avro schema model (an arena of nodes addressed by
//! [`NodeId`]), JSON parsing with named type resolution, an explicit schema
//! cache, and reader/writer schema resolution plans.

mod cache;
mod parser;
mod reader_writer_resolution;
mod types;

pub use cache::SchemaCache;
pub use parser::{parse_schema, parse_schema_with_options, SchemaParser};
pub use reader_writer_resolution::{
    json_to_value, PlanNode, ReaderDefault, ResolutionPlan, Step, StepId, TypePromotion,
    WriterField,
};
pub use types::*;
