//! Conversion table: host-side transformations keyed by schema identity.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConversionError;
use crate::reader::DecodedValue;
use crate::schema::{NodeId, RecordSchema};

/// Opaque value produced by a conversion.
///
/// Cheap to clone. Two host values compare equal only when they share the
/// same allocation.
#[derive(Clone)]
pub struct HostValue(Arc<dyn Any + Send + Sync>);

impl HostValue {
    /// Wrap any thread-safe value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the wrapped value as `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether the wrapped value is a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostValue(..)")
    }
}

/// A conversion function.
pub type ConversionFn =
    Arc<dyn Fn(DecodedValue) -> Result<HostValue, ConversionError> + Send + Sync>;

/// Host-side conversions applied to decoded values.
///
/// Entries are keyed either by schema node ([`NodeId`] of the reader schema)
/// or by a record full name and field name. Each materialized value is
/// converted at most once, after its own structural decode and before it is
/// attached to its parent; a field entry takes precedence over a node entry
/// for that field's value.
///
/// Immutable once built; share it between handles with `Arc`.
///
/// # Example
/// ```
/// use contrail::convert::{ConversionTable, HostValue};
/// use contrail::reader::DecodedValue;
///
/// let mut table = ConversionTable::new();
/// table.register_field("User", "name", |value| match value {
///     DecodedValue::String(s) => Ok(HostValue::new(s.to_uppercase())),
///     other => Err(format!("expected string, got {:?}", other).into()),
/// });
/// assert!(table.field("User", "name").is_some());
/// ```
#[derive(Clone, Default)]
pub struct ConversionTable {
    by_node: HashMap<NodeId, ConversionFn>,
    by_field: HashMap<(String, String), ConversionFn>,
}

impl ConversionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a conversion for every value decoded at `node`.
    pub fn register_node<F>(&mut self, node: NodeId, f: F) -> &mut Self
    where
        F: Fn(DecodedValue) -> Result<HostValue, ConversionError> + Send + Sync + 'static,
    {
        self.by_node.insert(node, Arc::new(f));
        self
    }

    /// Register a conversion for one field of a record.
    pub fn register_field<F>(&mut self, record: &str, field: &str, f: F) -> &mut Self
    where
        F: Fn(DecodedValue) -> Result<HostValue, ConversionError> + Send + Sync + 'static,
    {
        self.by_field
            .insert((record.to_string(), field.to_string()), Arc::new(f));
        self
    }

    /// Conversion registered for a node.
    pub fn node(&self, node: NodeId) -> Option<&ConversionFn> {
        self.by_node.get(&node)
    }

    /// Conversion registered for a record field.
    pub fn field(&self, record: &str, field: &str) -> Option<&ConversionFn> {
        if self.by_field.is_empty() {
            return None;
        }
        self.by_field.get(&(record.to_string(), field.to_string()))
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.by_node.len() + self.by_field.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty() && self.by_field.is_empty()
    }

    /// Merge entries from `other`, replacing entries with the same key.
    pub fn extend(&mut self, other: ConversionTable) {
        self.by_node.extend(other.by_node);
        self.by_field.extend(other.by_field);
    }

    /// Apply the node conversion for `node`, if any.
    pub(crate) fn convert_node(
        &self,
        node: NodeId,
        value: DecodedValue,
    ) -> Result<DecodedValue, ConversionError> {
        match self.by_node.get(&node) {
            Some(f) => f(value).map(DecodedValue::Host),
            None => Ok(value),
        }
    }

    /// Apply the conversion for a record field: the field entry if one is
    /// registered, else the node entry for the field's schema.
    pub(crate) fn convert_field(
        &self,
        record: &RecordSchema,
        field: &str,
        node: NodeId,
        value: DecodedValue,
    ) -> Result<DecodedValue, ConversionError> {
        if self.by_field.is_empty() {
            return self.convert_node(node, value);
        }
        match self.field(&record.fullname(), field) {
            Some(f) => f(value).map(DecodedValue::Host),
            None => self.convert_node(node, value),
        }
    }
}

impl fmt::Debug for ConversionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nodes: Vec<_> = self.by_node.keys().collect();
        nodes.sort();
        let mut fields: Vec<_> = self.by_field.keys().collect();
        fields.sort();
        f.debug_struct("ConversionTable")
            .field("nodes", &nodes)
            .field("fields", &fields)
            .finish()
    }
}
