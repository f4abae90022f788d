//! Avro schema types and representations.
//!
//! A parsed schema is an arena of [`SchemaNode`]s addressed by [`NodeId`].
//! Named type references resolve to the id of their definition during
//! parsing, so recursive records are cycles of ids rather than owned
//! pointers, and conversion tables can key on node identity.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::{json, Map, Value};

use crate::error::SchemaError;

/// Stable identity of a node inside one [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of the node in the schema arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Avro primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,
}

impl PrimitiveKind {
    /// The Avro type name.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Null => "null",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Bytes => "bytes",
            PrimitiveKind::String => "string",
        }
    }

    /// Look up a primitive by its Avro type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(PrimitiveKind::Null),
            "boolean" => Some(PrimitiveKind::Boolean),
            "int" => Some(PrimitiveKind::Int),
            "long" => Some(PrimitiveKind::Long),
            "float" => Some(PrimitiveKind::Float),
            "double" => Some(PrimitiveKind::Double),
            "bytes" => Some(PrimitiveKind::Bytes),
            "string" => Some(PrimitiveKind::String),
            _ => None,
        }
    }
}

/// One node of a parsed Avro schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// Primitive type.
    Primitive(PrimitiveKind),
    /// Record type with named fields.
    Record(RecordSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Array of items with a single schema.
    Array(NodeId),
    /// Map with string keys and values of a single schema.
    Map(NodeId),
    /// Union of multiple schemas, in wire order.
    Union(Vec<NodeId>),
    /// Fixed-size byte array.
    Fixed(FixedSchema),
    /// Logical type annotation over a base node.
    Logical(LogicalType),
}

impl SchemaNode {
    /// Check if this node is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(self, SchemaNode::Primitive(_))
    }

    /// Check if this node is a named type (record, enum, or fixed).
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            SchemaNode::Record(_) | SchemaNode::Enum(_) | SchemaNode::Fixed(_)
        )
    }

    /// Get the fully qualified name of a named type, if applicable.
    pub fn fullname(&self) -> Option<String> {
        match self {
            SchemaNode::Record(r) => Some(r.fullname()),
            SchemaNode::Enum(e) => Some(e.fullname()),
            SchemaNode::Fixed(f) => Some(f.fullname()),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn kind_name(&self) -> String {
        match self {
            SchemaNode::Primitive(kind) => kind.name().to_string(),
            SchemaNode::Record(r) => format!("record {}", r.fullname()),
            SchemaNode::Enum(e) => format!("enum {}", e.fullname()),
            SchemaNode::Array(_) => "array".to_string(),
            SchemaNode::Map(_) => "map".to_string(),
            SchemaNode::Union(_) => "union".to_string(),
            SchemaNode::Fixed(f) => format!("fixed {}", f.fullname()),
            SchemaNode::Logical(l) => l.logical_type.name().to_string(),
        }
    }
}

fn join_name(namespace: &Option<String>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}.{}", ns, name),
        None => name.to_string(),
    }
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The name of the record.
    pub name: String,
    /// Optional namespace for the record.
    pub namespace: Option<String>,
    /// The fields of the record.
    pub fields: Vec<FieldSchema>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this record.
    pub aliases: Vec<String>,
}

impl RecordSchema {
    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        join_name(&self.namespace, &self.name)
    }

    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The name of the field.
    pub name: String,
    /// The schema of the field's value.
    pub schema: NodeId,
    /// Optional default value for the field.
    pub default: Option<Value>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Field ordering (ascending, descending, ignore).
    pub order: FieldOrder,
    /// Aliases for this field.
    pub aliases: Vec<String>,
}

/// Field ordering for record comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldOrder {
    #[default]
    Ascending,
    Descending,
    Ignore,
}

impl FieldOrder {
    fn as_str(&self) -> &'static str {
        match self {
            FieldOrder::Ascending => "ascending",
            FieldOrder::Descending => "descending",
            FieldOrder::Ignore => "ignore",
        }
    }
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The name of the enum.
    pub name: String,
    /// Optional namespace for the enum.
    pub namespace: Option<String>,
    /// The symbols (variants) of the enum.
    pub symbols: Vec<String>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this enum.
    pub aliases: Vec<String>,
    /// Default symbol (for schema resolution).
    pub default: Option<String>,
}

impl EnumSchema {
    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        join_name(&self.namespace, &self.name)
    }

    /// Get the index of a symbol.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Schema for a fixed-size byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The name of the fixed type.
    pub name: String,
    /// Optional namespace for the fixed type.
    pub namespace: Option<String>,
    /// The size in bytes.
    pub size: usize,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this fixed type.
    pub aliases: Vec<String>,
}

impl FixedSchema {
    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        join_name(&self.namespace, &self.name)
    }
}

/// Logical type annotation around a base node.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalType {
    /// The annotated node. Decoding reads this node's wire format.
    pub base: NodeId,
    /// The logical type name and parameters.
    pub logical_type: LogicalTypeName,
}

/// Logical type names with their parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalTypeName {
    /// Decimal with precision and scale.
    Decimal { precision: u32, scale: u32 },
    /// UUID (string or fixed[16]).
    Uuid,
    /// Date (days since Unix epoch).
    Date,
    /// Time in milliseconds.
    TimeMillis,
    /// Time in microseconds.
    TimeMicros,
    /// Timestamp in milliseconds since Unix epoch.
    TimestampMillis,
    /// Timestamp in microseconds since Unix epoch.
    TimestampMicros,
    /// Local timestamp in milliseconds (no timezone).
    LocalTimestampMillis,
    /// Local timestamp in microseconds (no timezone).
    LocalTimestampMicros,
    /// Duration (months, days, milliseconds) over fixed[12].
    Duration,
}

impl LogicalTypeName {
    /// Get the string name of the logical type.
    pub fn name(&self) -> &'static str {
        match self {
            LogicalTypeName::Decimal { .. } => "decimal",
            LogicalTypeName::Uuid => "uuid",
            LogicalTypeName::Date => "date",
            LogicalTypeName::TimeMillis => "time-millis",
            LogicalTypeName::TimeMicros => "time-micros",
            LogicalTypeName::TimestampMillis => "timestamp-millis",
            LogicalTypeName::TimestampMicros => "timestamp-micros",
            LogicalTypeName::LocalTimestampMillis => "local-timestamp-millis",
            LogicalTypeName::LocalTimestampMicros => "local-timestamp-micros",
            LogicalTypeName::Duration => "duration",
        }
    }
}

/// A parsed Avro schema.
///
/// Immutable after parsing; share it between handles and threads with
/// `Arc<Schema>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    nodes: Vec<SchemaNode>,
    root: NodeId,
    named_types: HashMap<String, NodeId>,
}

impl Schema {
    pub(crate) fn from_parts(
        nodes: Vec<SchemaNode>,
        root: NodeId,
        named_types: HashMap<String, NodeId>,
    ) -> Self {
        Self {
            nodes,
            root,
            named_types,
        }
    }

    /// Parse a schema from JSON text. Shorthand for [`crate::schema::parse_schema`].
    pub fn parse(json: &str) -> Result<Self, SchemaError> {
        super::parse_schema(json)
    }

    /// The top-level node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by id.
    ///
    /// # Panics
    /// If `id` was produced by a different schema and is out of range.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    /// Get a node by id, returning `None` for ids outside this schema.
    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id.index())
    }

    /// The root node.
    pub fn root_node(&self) -> &SchemaNode {
        self.node(self.root)
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty (never true for a parsed schema).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes with their ids.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SchemaNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Look up a named type by its fully qualified name.
    pub fn lookup(&self, fullname: &str) -> Option<NodeId> {
        self.named_types.get(fullname).copied()
    }

    /// Get all registered named types.
    pub fn named_types(&self) -> &HashMap<String, NodeId> {
        &self.named_types
    }

    /// Follow logical annotations down to the node that defines the wire format.
    pub fn strip_logical(&self, mut id: NodeId) -> NodeId {
        while let SchemaNode::Logical(l) = self.node(id) {
            id = l.base;
        }
        id
    }

    /// Find a field of a record node by name, returning its schema node.
    pub fn field_node(&self, record: NodeId, field: &str) -> Option<NodeId> {
        match self.node(self.strip_logical(record)) {
            SchemaNode::Record(r) => r.field(field).map(|f| f.schema),
            _ => None,
        }
    }

    /// Serialize the schema to a JSON string.
    ///
    /// Named types are written in full at their first occurrence and by
    /// full name afterwards, so recursive schemas serialize finitely and the
    /// output parses back to an equivalent schema.
    ///
    /// # Example
    /// ```
    /// use contrail::schema::Schema;
    ///
    /// let schema = Schema::parse(r#""string""#).unwrap();
    /// assert_eq!(schema.to_json(), r#""string""#);
    /// ```
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Serialize the schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        let mut emitted = HashSet::new();
        self.node_to_json(self.root, &mut emitted)
    }

    fn node_to_json(&self, id: NodeId, emitted: &mut HashSet<String>) -> Value {
        match self.node(id) {
            SchemaNode::Primitive(kind) => json!(kind.name()),
            SchemaNode::Record(r) => {
                let fullname = r.fullname();
                if !emitted.insert(fullname.clone()) {
                    return json!(fullname);
                }
                let mut obj = named_header("record", &r.name, &r.namespace, &r.doc, &r.aliases);
                let fields: Vec<Value> = r
                    .fields
                    .iter()
                    .map(|field| {
                        let mut f = Map::new();
                        f.insert("name".to_string(), json!(&field.name));
                        f.insert("type".to_string(), self.node_to_json(field.schema, emitted));
                        if let Some(default) = &field.default {
                            f.insert("default".to_string(), default.clone());
                        }
                        if let Some(doc) = &field.doc {
                            f.insert("doc".to_string(), json!(doc));
                        }
                        if field.order != FieldOrder::Ascending {
                            f.insert("order".to_string(), json!(field.order.as_str()));
                        }
                        if !field.aliases.is_empty() {
                            f.insert("aliases".to_string(), json!(&field.aliases));
                        }
                        Value::Object(f)
                    })
                    .collect();
                obj.insert("fields".to_string(), Value::Array(fields));
                Value::Object(obj)
            }
            SchemaNode::Enum(e) => {
                let fullname = e.fullname();
                if !emitted.insert(fullname.clone()) {
                    return json!(fullname);
                }
                let mut obj = named_header("enum", &e.name, &e.namespace, &e.doc, &e.aliases);
                obj.insert("symbols".to_string(), json!(&e.symbols));
                if let Some(default) = &e.default {
                    obj.insert("default".to_string(), json!(default));
                }
                Value::Object(obj)
            }
            SchemaNode::Fixed(f) => {
                let fullname = f.fullname();
                if !emitted.insert(fullname.clone()) {
                    return json!(fullname);
                }
                let mut obj = named_header("fixed", &f.name, &f.namespace, &f.doc, &f.aliases);
                obj.insert("size".to_string(), json!(f.size));
                Value::Object(obj)
            }
            SchemaNode::Array(items) => json!({
                "type": "array",
                "items": self.node_to_json(*items, emitted)
            }),
            SchemaNode::Map(values) => json!({
                "type": "map",
                "values": self.node_to_json(*values, emitted)
            }),
            SchemaNode::Union(branches) => Value::Array(
                branches
                    .iter()
                    .map(|b| self.node_to_json(*b, emitted))
                    .collect(),
            ),
            SchemaNode::Logical(l) => {
                let mut obj = match self.node_to_json(l.base, emitted) {
                    Value::Object(m) => m,
                    // Primitive base, or a fixed already written by name.
                    other => {
                        let mut m = Map::new();
                        m.insert("type".to_string(), other);
                        m
                    }
                };
                obj.insert("logicalType".to_string(), json!(l.logical_type.name()));
                if let LogicalTypeName::Decimal { precision, scale } = &l.logical_type {
                    obj.insert("precision".to_string(), json!(precision));
                    if *scale > 0 {
                        obj.insert("scale".to_string(), json!(scale));
                    }
                }
                Value::Object(obj)
            }
        }
    }
}

fn named_header(
    kind: &str,
    name: &str,
    namespace: &Option<String>,
    doc: &Option<String>,
    aliases: &[String],
) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!(kind));
    obj.insert("name".to_string(), json!(name));
    if let Some(ns) = namespace {
        obj.insert("namespace".to_string(), json!(ns));
    }
    if let Some(doc) = doc {
        obj.insert("doc".to_string(), json!(doc));
    }
    if !aliases.is_empty() {
        obj.insert("aliases".to_string(), json!(aliases));
    }
    obj
}
