//! Decoding driven by a compiled [`ResolutionPlan`].

use std::collections::HashMap;

use crate::api::DecoderOptions;
use crate::convert::ConversionTable;
use crate::error::DecodeError;
use crate::reader::decode::{
    decode_block_header, decode_bytes, decode_enum_index, decode_fixed, decode_float, decode_int,
    decode_long, decode_primitive, decode_string, decode_union_index, skip_value, DepthGuard,
};
use crate::reader::{ByteCursor, DecodedValue};
use crate::schema::{
    ReaderDefault, ResolutionPlan, SchemaNode, Step, StepId, TypePromotion, WriterField,
};

/// Decodes writer-schema data into reader-schema values.
pub struct ResolvingDecoder<'a, C: ByteCursor + ?Sized> {
    plan: &'a ResolutionPlan,
    cursor: &'a mut C,
    options: &'a DecoderOptions,
    conversions: Option<&'a ConversionTable>,
    depth: DepthGuard,
}

impl<'a, C: ByteCursor + ?Sized> ResolvingDecoder<'a, C> {
    /// Create a decoder reading from `cursor`.
    pub fn new(plan: &'a ResolutionPlan, cursor: &'a mut C, options: &'a DecoderOptions) -> Self {
        Self {
            plan,
            cursor,
            options,
            conversions: None,
            depth: DepthGuard::new(options.max_depth),
        }
    }

    /// Apply `conversions` (keyed on the reader schema) to decoded values.
    pub fn with_conversions(mut self, conversions: Option<&'a ConversionTable>) -> Self {
        self.conversions = conversions;
        self
    }

    /// Decode one datum.
    pub fn decode_datum(&mut self) -> Result<DecodedValue, DecodeError> {
        self.run(self.plan.root())
    }

    /// Run a step and apply the conversion for its reader node.
    fn run(&mut self, id: StepId) -> Result<DecodedValue, DecodeError> {
        let value = self.run_unconverted(id)?;
        match self.conversions {
            Some(table) => Ok(table.convert_node(self.plan.node(id).reader, value)?),
            None => Ok(value),
        }
    }

    /// Run a step without the conversion for its own reader node.
    ///
    /// A writer union shares its reader node with the selected branch, so
    /// the branch is run unconverted as well and converted once by the caller.
    fn run_unconverted(&mut self, id: StepId) -> Result<DecodedValue, DecodeError> {
        let plan = self.plan;
        match &plan.node(id).step {
            Step::WriterUnion(branches) => {
                let index = decode_union_index(self.cursor, branches.len())?;
                self.depth.enter()?;
                let value = self.run_unconverted(branches[index])?;
                self.depth.leave();
                Ok(value)
            }
            _ => self.run_raw(id),
        }
    }

    fn run_raw(&mut self, id: StepId) -> Result<DecodedValue, DecodeError> {
        let plan = self.plan;
        let node = plan.node(id);

        match &node.step {
            Step::Primitive(kind) => decode_primitive(self.cursor, *kind, self.options),
            Step::Promote(promotion) => self.promote(*promotion),
            Step::Fixed(size) => Ok(DecodedValue::Fixed(decode_fixed(self.cursor, *size)?)),
            Step::Enum { mapping } => {
                let index = decode_enum_index(self.cursor, mapping.len())?;
                match &mapping[index] {
                    Ok(reader_index) => {
                        let symbol = match plan.reader().node(plan.reader().strip_logical(node.reader)) {
                            SchemaNode::Enum(e) => e.symbols[*reader_index].clone(),
                            other => {
                                return Err(DecodeError::SchemaMismatch(format!(
                                    "Enum step resolved against {}",
                                    other.kind_name()
                                )))
                            }
                        };
                        Ok(DecodedValue::EnumSymbol {
                            index: *reader_index,
                            symbol,
                        })
                    }
                    Err(symbol) => Err(DecodeError::UnresolvableSymbol {
                        symbol: symbol.clone(),
                        enum_name: plan
                            .reader()
                            .node(plan.reader().strip_logical(node.reader))
                            .fullname()
                            .unwrap_or_default(),
                    }),
                }
            }
            Step::Record { fields, defaults } => {
                self.depth.enter()?;
                let value = self.run_record(id, fields, defaults)?;
                self.depth.leave();
                Ok(value)
            }
            Step::Array(items) => {
                self.depth.enter()?;
                let mut values = Vec::new();
                while let Some(block) = decode_block_header(self.cursor)? {
                    values.reserve(block.count.min(1024));
                    for _ in 0..block.count {
                        values.push(self.run(*items)?);
                    }
                }
                self.depth.leave();
                Ok(DecodedValue::Array(values))
            }
            Step::Map(values) => {
                self.depth.enter()?;
                let mut entries = HashMap::new();
                while let Some(block) = decode_block_header(self.cursor)? {
                    entries.reserve(block.count.min(1024));
                    for _ in 0..block.count {
                        let key = decode_string(
                            self.cursor,
                            self.options.max_length,
                            self.options.utf8_policy,
                        )?;
                        let value = self.run(*values)?;
                        entries.insert(key, value);
                    }
                }
                self.depth.leave();
                Ok(DecodedValue::Map(entries))
            }
            Step::ReaderUnion { branch, step } => {
                self.depth.enter()?;
                let value = self.run(*step)?;
                self.depth.leave();
                Ok(DecodedValue::Union {
                    branch: *branch,
                    value: Box::new(value),
                })
            }
            Step::WriterUnion(_) => self.run_unconverted(id),
            Step::Fail(reason) => Err(DecodeError::SchemaMismatch(reason.clone())),
        }
    }

    fn run_record(
        &mut self,
        id: StepId,
        fields: &[WriterField],
        defaults: &[ReaderDefault],
    ) -> Result<DecodedValue, DecodeError> {
        let plan = self.plan;
        let reader_schema = plan.reader();
        let record = match reader_schema.node(reader_schema.strip_logical(plan.node(id).reader)) {
            SchemaNode::Record(r) => r,
            other => {
                return Err(DecodeError::SchemaMismatch(format!(
                    "Record step resolved against {}",
                    other.kind_name()
                )))
            }
        };

        let mut slots: Vec<Option<DecodedValue>> = vec![None; record.fields.len()];

        // Writer fields arrive in writer order
        for field in fields {
            match field {
                WriterField::Read { reader_index, step } => {
                    let reader_field = &record.fields[*reader_index];
                    let value = self.run_unconverted(*step)?;
                    let value = match self.conversions {
                        Some(table) => table.convert_field(
                            record,
                            &reader_field.name,
                            reader_field.schema,
                            value,
                        )?,
                        None => value,
                    };
                    slots[*reader_index] = Some(value);
                }
                WriterField::Skip(writer_node) => {
                    skip_value(plan.writer(), *writer_node, self.cursor, self.options.max_depth)?;
                }
            }
        }

        for default in defaults {
            match default {
                ReaderDefault::Value {
                    reader_index,
                    value,
                } => {
                    let reader_field = &record.fields[*reader_index];
                    let value = match self.conversions {
                        Some(table) => table.convert_field(
                            record,
                            &reader_field.name,
                            reader_field.schema,
                            value.clone(),
                        )?,
                        None => value.clone(),
                    };
                    slots[*reader_index] = Some(value);
                }
                ReaderDefault::Missing { reader_index, .. } => {
                    return Err(DecodeError::MissingDefault {
                        record: record.fullname(),
                        field: record.fields[*reader_index].name.clone(),
                    });
                }
            }
        }

        record
            .fields
            .iter()
            .zip(slots)
            .map(|(field, slot)| {
                slot.map(|value| (field.name.clone(), value)).ok_or_else(|| {
                    DecodeError::SchemaMismatch(format!(
                        "Field '{}' of record '{}' was not filled",
                        field.name,
                        record.fullname()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(DecodedValue::Record)
    }

    fn promote(&mut self, promotion: TypePromotion) -> Result<DecodedValue, DecodeError> {
        Ok(match promotion {
            TypePromotion::IntToLong => DecodedValue::Long(decode_int(self.cursor)? as i64),
            TypePromotion::IntToFloat => {
                DecodedValue::Double(decode_int(self.cursor)? as f32 as f64)
            }
            TypePromotion::IntToDouble => DecodedValue::Double(decode_int(self.cursor)? as f64),
            TypePromotion::LongToFloat => {
                DecodedValue::Double(decode_long(self.cursor)? as f32 as f64)
            }
            TypePromotion::LongToDouble => DecodedValue::Double(decode_long(self.cursor)? as f64),
            TypePromotion::FloatToDouble => DecodedValue::Double(decode_float(self.cursor)? as f64),
            TypePromotion::StringToBytes => {
                DecodedValue::Bytes(decode_bytes(self.cursor, self.options.max_length)?)
            }
            TypePromotion::BytesToString => DecodedValue::String(decode_string(
                self.cursor,
                self.options.max_length,
                self.options.utf8_policy,
            )?),
        })
    }
}
