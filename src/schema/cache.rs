//! Explicit cache of parsed schemas.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::error::SchemaError;
use crate::schema::{parse_schema, Schema};

/// Cache of parsed schemas keyed by their normalized JSON text.
///
/// Two schema texts that differ only in whitespace or key order share one
/// entry. The cache is owned by the caller and safe to share between threads.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use contrail::schema::SchemaCache;
///
/// let cache = SchemaCache::new();
/// let a = cache.get_or_parse(r#"{"type": "array", "items": "int"}"#).unwrap();
/// let b = cache.get_or_parse(r#"{ "items": "int", "type": "array" }"#).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<String, Arc<Schema>>>,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached schema for `json`, parsing it on first use.
    pub fn get_or_parse(&self, json: &str) -> Result<Arc<Schema>, SchemaError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| SchemaError::ParseError(format!("Invalid JSON: {}", e)))?;
        // serde_json's default map is ordered by key, so this is canonical
        let key = value.to_string();

        if let Some(schema) = self.read_entries().get(&key) {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(parse_schema(&key)?);
        let mut entries = self.write_entries();
        let entry = entries.entry(key).or_insert_with(|| {
            debug!(nodes = schema.len(), "Cached parsed schema");
            Arc::clone(&schema)
        });
        Ok(Arc::clone(entry))
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Drop all cached schemas. Handles holding an `Arc<Schema>` keep theirs.
    pub fn clear(&self) {
        self.write_entries().clear();
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Schema>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Schema>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
