//! The deserializer handle.
//!
//! A [`Deserializer`] binds one reader schema, an optional writer schema, an
//! optional conversion table and a byte cursor. Each [`Deserializer::decode`]
//! call consumes exactly one datum from the cursor.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::api::DecoderOptions;
use crate::convert::ConversionTable;
use crate::error::{DecodeError, ReaderError, SchemaError};
use crate::reader::{ByteCursor, DatumDecoder, DecodedValue, ResolvingDecoder, SliceCursor};
use crate::schema::{ResolutionPlan, Schema, SchemaCache};

/// Decodes a sequence of Avro datums from a cursor.
///
/// A failed decode leaves the cursor at an undefined position, so the handle
/// is poisoned: every later call fails with [`DecodeError::Poisoned`] until
/// [`reset`](Deserializer::reset) installs a new cursor.
///
/// # Example
/// ```
/// use contrail::api::Deserializer;
/// use contrail::reader::{DecodedValue, SliceCursor};
///
/// let cursor = SliceCursor::from_slice(&[0x02, 0x04]);
/// let mut de = Deserializer::new(r#""long""#, cursor).unwrap();
/// assert_eq!(de.decode().unwrap(), DecodedValue::Long(1));
/// assert_eq!(de.decode().unwrap(), DecodedValue::Long(2));
/// assert!(de.decode().is_err());
/// assert!(de.is_poisoned());
/// ```
pub struct Deserializer<C: ByteCursor = SliceCursor> {
    reader_schema: Arc<Schema>,
    writer: Option<Arc<ResolutionPlan>>,
    /// Plans for writer schemas passed to `decode_with_writer`.
    ///
    /// Keyed by the writer's address; each plan holds its writer alive, so an
    /// address cannot be reused while its entry exists. Writer JSON parsed by
    /// the handle goes through `writer_schemas`, so equal texts share one key.
    plans: HashMap<usize, Arc<ResolutionPlan>>,
    writer_schemas: Arc<SchemaCache>,
    conversions: Option<Arc<ConversionTable>>,
    options: DecoderOptions,
    cursor: C,
    poisoned: bool,
}

impl<C: ByteCursor> Deserializer<C> {
    /// Parse `schema_json` as the reader schema and read from `cursor`.
    pub fn new(schema_json: &str, cursor: C) -> Result<Self, SchemaError> {
        let schema = Schema::parse(schema_json)?;
        Ok(Self::from_schema(Arc::new(schema), cursor))
    }

    /// Read from `cursor` with an already parsed reader schema.
    pub fn from_schema(schema: Arc<Schema>, cursor: C) -> Self {
        debug!(
            nodes = schema.len(),
            root = %schema.root_node().kind_name(),
            "Created deserializer"
        );
        Self {
            reader_schema: schema,
            writer: None,
            plans: HashMap::new(),
            writer_schemas: Arc::new(SchemaCache::new()),
            conversions: None,
            options: DecoderOptions::default(),
            cursor,
            poisoned: false,
        }
    }

    /// Apply `conversions` to decoded values.
    ///
    /// The table is keyed on nodes of the reader schema.
    pub fn with_conversions(mut self, conversions: Arc<ConversionTable>) -> Self {
        self.conversions = Some(conversions);
        self
    }

    /// Set decoding options.
    pub fn with_options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse writer schema JSON through `cache` instead of a private one.
    ///
    /// Handles sharing a cache also share the parsed writer schemas.
    pub fn with_schema_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.writer_schemas = cache;
        self
    }

    /// Parse `writer_json` as the schema the data was written with.
    pub fn with_writer_schema(self, writer_json: &str) -> Result<Self, SchemaError> {
        let writer = self.writer_schemas.get_or_parse(writer_json)?;
        Ok(self.with_writer(writer))
    }

    /// Resolve data written with `writer` into the reader schema.
    pub fn with_writer(mut self, writer: Arc<Schema>) -> Self {
        self.writer = Some(self.plan_for(&writer));
        self
    }

    /// Decode the next datum.
    pub fn decode(&mut self) -> Result<DecodedValue, DecodeError> {
        let plan = self.writer.clone();
        self.guarded(|de| de.decode_inner(plan.as_deref()))
    }

    /// Decode the next datum, which was written with `writer`.
    ///
    /// Resolution plans are compiled once per writer `Arc` and reused, so
    /// pass the same `Arc` (for example from a [`SchemaCache`]) on every call.
    pub fn decode_with_writer(&mut self, writer: &Arc<Schema>) -> Result<DecodedValue, DecodeError> {
        if self.poisoned {
            return Err(DecodeError::Poisoned);
        }
        let plan = self.plan_for(writer);
        self.guarded(|de| de.decode_inner(Some(&plan)))
    }

    /// Install a new cursor, returning the old one and clearing poisoning.
    pub fn reset(&mut self, cursor: C) -> C {
        debug!(
            was_poisoned = self.poisoned,
            position = self.cursor.position(),
            "Resetting deserializer"
        );
        self.poisoned = false;
        std::mem::replace(&mut self.cursor, cursor)
    }

    /// Bytes consumed from the current cursor.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Whether a previous decode failed.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// The reader schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.reader_schema
    }

    /// The writer schema set with `with_writer`, if any.
    pub fn writer_schema(&self) -> Option<&Arc<Schema>> {
        self.writer.as_ref().map(|plan| plan.writer())
    }

    /// The options in effect.
    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Consume the handle, returning its cursor.
    pub fn into_cursor(self) -> C {
        self.cursor
    }

    /// Iterate over the remaining datums.
    ///
    /// Iteration ends at the end of input, or after the first error.
    pub fn iter(&mut self) -> DatumIter<'_, C> {
        DatumIter {
            deserializer: self,
            done: false,
        }
    }

    fn plan_for(&mut self, writer: &Arc<Schema>) -> Arc<ResolutionPlan> {
        let key = Arc::as_ptr(writer) as usize;
        if let Some(plan) = self.plans.get(&key) {
            return Arc::clone(plan);
        }

        let plan = Arc::new(ResolutionPlan::compile(writer, &self.reader_schema));
        debug!(
            steps = plan.step_count(),
            has_failures = plan.has_failures(),
            "Compiled resolution plan"
        );
        self.plans.insert(key, Arc::clone(&plan));
        plan
    }

    fn guarded<F>(&mut self, f: F) -> Result<DecodedValue, DecodeError>
    where
        F: FnOnce(&mut Self) -> Result<DecodedValue, DecodeError>,
    {
        if self.poisoned {
            return Err(DecodeError::Poisoned);
        }
        let result = f(self);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn decode_inner(&mut self, plan: Option<&ResolutionPlan>) -> Result<DecodedValue, DecodeError> {
        let conversions = self.conversions.as_deref();
        match plan {
            // A plan against the reader schema itself adds nothing
            Some(plan) if !Arc::ptr_eq(plan.writer(), &self.reader_schema) => {
                ResolvingDecoder::new(plan, &mut self.cursor, &self.options)
                    .with_conversions(conversions)
                    .decode_datum()
            }
            _ => DatumDecoder::new(&self.reader_schema, &mut self.cursor, &self.options)
                .with_conversions(conversions)
                .decode_datum(),
        }
    }
}

impl Deserializer<SliceCursor> {
    /// Decode the single datum in `bytes`.
    ///
    /// Replaces the cursor. Bytes left over after the datum are an error.
    pub fn deserialize(&mut self, bytes: impl Into<Bytes>) -> Result<DecodedValue, ReaderError> {
        self.reset(SliceCursor::new(bytes.into()));
        let value = self.decode()?;
        self.finish_single()?;
        Ok(value)
    }

    /// Decode the single datum in `bytes`, written with `writer_json`.
    pub fn deserialize_with_writer(
        &mut self,
        bytes: impl Into<Bytes>,
        writer_json: &str,
    ) -> Result<DecodedValue, ReaderError> {
        let writer = self.writer_schemas.get_or_parse(writer_json)?;
        self.reset(SliceCursor::new(bytes.into()));
        let value = self.decode_with_writer(&writer)?;
        self.finish_single()?;
        Ok(value)
    }

    fn finish_single(&mut self) -> Result<(), DecodeError> {
        let trailing = self.cursor.remaining();
        if trailing > 0 {
            self.poisoned = true;
            return Err(DecodeError::InvalidData(format!(
                "{} trailing bytes after datum",
                trailing
            )));
        }
        Ok(())
    }
}

impl<C: ByteCursor> std::fmt::Debug for Deserializer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deserializer")
            .field("reader_schema", &self.reader_schema.root_node().kind_name())
            .field("has_writer", &self.writer.is_some())
            .field("cached_plans", &self.plans.len())
            .field("options", &self.options)
            .field("position", &self.cursor.position())
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

/// Iterator over the datums remaining in a [`Deserializer`]'s cursor.
pub struct DatumIter<'a, C: ByteCursor> {
    deserializer: &'a mut Deserializer<C>,
    done: bool,
}

impl<C: ByteCursor> Iterator for DatumIter<'_, C> {
    type Item = Result<DecodedValue, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.deserializer.cursor.is_at_end() {
            Ok(true) => {
                self.done = true;
                return None;
            }
            Ok(false) => {}
            Err(e) => {
                self.done = true;
                self.deserializer.poisoned = true;
                return Some(Err(e));
            }
        }
        let result = self.deserializer.decode();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::encode_zigzag;

    #[test]
    fn test_decode_sequence_and_iter() {
        let mut data = Vec::new();
        for v in [1i64, -2, 300] {
            data.extend(encode_zigzag(v));
        }
        let mut de = Deserializer::new(r#""long""#, SliceCursor::from(data)).unwrap();
        let values: Vec<_> = de.iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            values,
            vec![
                DecodedValue::Long(1),
                DecodedValue::Long(-2),
                DecodedValue::Long(300)
            ]
        );
        assert!(!de.is_poisoned());
    }

    #[test]
    fn test_poisoned_until_reset() {
        let mut de = Deserializer::new(r#""string""#, SliceCursor::from_slice(&[0x0A, b'a'])).unwrap();
        assert!(matches!(de.decode(), Err(DecodeError::EndOfInput)));
        assert!(matches!(de.decode(), Err(DecodeError::Poisoned)));

        let old = de.reset(SliceCursor::from_slice(&[0x02, b'z']));
        assert_eq!(old.remaining(), 1);
        assert_eq!(de.decode().unwrap(), DecodedValue::String("z".to_string()));
        assert_eq!(de.position(), 2);
    }

    #[test]
    fn test_deserialize_rejects_trailing_bytes() {
        let mut de = Deserializer::new(r#""int""#, SliceCursor::from_slice(&[])).unwrap();
        assert_eq!(de.deserialize(vec![0x04]).unwrap(), DecodedValue::Long(2));
        assert!(matches!(
            de.deserialize(vec![0x04, 0x00]),
            Err(ReaderError::Decode(DecodeError::InvalidData(_)))
        ));
        // deserialize resets the cursor itself
        assert_eq!(de.deserialize(vec![0x01]).unwrap(), DecodedValue::Long(-1));
    }

    #[test]
    fn test_plans_cached_per_writer() {
        let writer = Arc::new(Schema::parse(r#""int""#).unwrap());
        let mut de =
            Deserializer::new(r#""long""#, SliceCursor::from_slice(&[0x02, 0x04])).unwrap();
        assert_eq!(de.decode_with_writer(&writer).unwrap(), DecodedValue::Long(1));
        assert_eq!(de.decode_with_writer(&writer).unwrap(), DecodedValue::Long(2));
        assert_eq!(de.plans.len(), 1);
    }

    #[test]
    fn test_deserialize_with_writer_reuses_plan() {
        let mut de = Deserializer::new(r#""long""#, SliceCursor::from_slice(&[])).unwrap();
        for _ in 0..1000 {
            assert_eq!(
                de.deserialize_with_writer(vec![0x02], r#""int""#).unwrap(),
                DecodedValue::Long(1)
            );
        }
        // Formatting differences do not defeat the cache
        de.deserialize_with_writer(vec![0x02], r#"  "int" "#).unwrap();
        assert_eq!(de.plans.len(), 1);
        assert_eq!(de.writer_schemas.len(), 1);

        assert_eq!(
            de.deserialize_with_writer(vec![0x04], r#""long""#).unwrap(),
            DecodedValue::Long(2)
        );
        assert_eq!(de.plans.len(), 2);
    }

    #[test]
    fn test_shared_schema_cache() {
        let cache = Arc::new(SchemaCache::new());
        let a = Deserializer::new(r#""long""#, SliceCursor::from_slice(&[]))
            .unwrap()
            .with_schema_cache(Arc::clone(&cache))
            .with_writer_schema(r#""int""#)
            .unwrap();
        let b = Deserializer::new(r#""double""#, SliceCursor::from_slice(&[]))
            .unwrap()
            .with_schema_cache(Arc::clone(&cache))
            .with_writer_schema(r#""int""#)
            .unwrap();
        assert!(Arc::ptr_eq(
            a.writer_schema().unwrap(),
            b.writer_schema().unwrap()
        ));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalid_schema_fails_fast() {
        assert!(matches!(
            Deserializer::new("{", SliceCursor::from_slice(&[])),
            Err(SchemaError::ParseError(_))
        ));
        let de = Deserializer::new(r#""long""#, SliceCursor::from_slice(&[])).unwrap();
        assert!(de.with_writer_schema(r#"{"type": "wat"}"#).is_err());
    }
}
