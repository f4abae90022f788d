//! JSON schema parser for Avro schemas.
//!
//! Parses Avro schema JSON into a [`Schema`] arena in one left-to-right pass.
//! Named types are registered before their children are parsed, so a record
//! may refer to itself from its own fields.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::SchemaError;
use crate::schema::{
    EnumSchema, FieldOrder, FieldSchema, FixedSchema, LogicalType, LogicalTypeName, NodeId,
    PrimitiveKind, RecordSchema, Schema, SchemaNode,
};

/// Parse an Avro schema from a JSON string.
///
/// # Example
/// ```
/// use contrail::schema::parse_schema;
///
/// let schema = parse_schema(r#""string""#).unwrap();
/// assert_eq!(schema.len(), 1);
/// ```
pub fn parse_schema(json: &str) -> Result<Schema, SchemaError> {
    parse_schema_with_options(json, false)
}

/// Parse an Avro schema from a JSON string with validation options.
///
/// In strict mode, names must follow Avro naming rules (start with a letter
/// or underscore, contain only alphanumerics and underscores). In permissive
/// mode (default) violations are logged and parsing continues, which keeps
/// schemas produced by lenient writers readable.
///
/// Structural rules (duplicate names, union collisions, unknown references)
/// are enforced in both modes.
///
/// # Example
/// ```
/// use contrail::schema::parse_schema_with_options;
///
/// let lenient = parse_schema_with_options(r#"{"type": "enum", "name": "E", "symbols": ["a-b"]}"#, false);
/// assert!(lenient.is_ok());
///
/// let strict = parse_schema_with_options(r#"{"type": "enum", "name": "E", "symbols": ["a-b"]}"#, true);
/// assert!(strict.is_err());
/// ```
pub fn parse_schema_with_options(json: &str, strict: bool) -> Result<Schema, SchemaError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SchemaError::ParseError(format!("Invalid JSON: {}", e)))?;

    SchemaParser::new().with_strict(strict).parse(&value)
}

/// Schema parser with named type resolution context.
///
/// Maintains the node arena and a registry of named types (records, enums,
/// fixed) for resolving type references during parsing.
#[derive(Debug, Default)]
pub struct SchemaParser {
    /// Nodes parsed so far
    nodes: Vec<SchemaNode>,
    /// Registry of named types by their fully qualified name
    named_types: HashMap<String, NodeId>,
    /// Current namespace for resolving unqualified names
    current_namespace: Option<String>,
    /// Whether to enforce strict name validation
    strict_schema: bool,
}

impl SchemaParser {
    /// Create a new SchemaParser with default settings (permissive mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new SchemaParser with strict name validation enabled.
    pub fn new_strict() -> Self {
        Self::new().with_strict(true)
    }

    /// Set whether to use strict name validation.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }

    /// Parse a JSON value into a Schema, consuming the parser.
    pub fn parse(mut self, value: &Value) -> Result<Schema, SchemaError> {
        let root = self.parse_node(value)?;
        Ok(Schema::from_parts(self.nodes, root, self.named_types))
    }

    fn push(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn parse_node(&mut self, value: &Value) -> Result<NodeId, SchemaError> {
        match value {
            Value::String(s) => self.parse_string_schema(s),
            Value::Object(obj) => self.parse_object_schema(obj),
            Value::Array(arr) => self.parse_union_schema(arr),
            _ => Err(SchemaError::InvalidSchema(format!(
                "Expected string, object, or array, found: {}",
                value
            ))),
        }
    }

    /// Parse a primitive type or named type reference from a string.
    fn parse_string_schema(&mut self, s: &str) -> Result<NodeId, SchemaError> {
        match PrimitiveKind::from_name(s) {
            Some(kind) => Ok(self.push(SchemaNode::Primitive(kind))),
            None => self.resolve_reference(s),
        }
    }

    /// Parse a complex type from a JSON object.
    fn parse_object_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::InvalidSchema("Missing 'type' field".to_string()))?;

        let base = match type_value {
            Value::String(type_str) => match type_str.as_str() {
                "record" | "error" => self.parse_record_schema(obj)?,
                "enum" => self.parse_enum_schema(obj)?,
                "array" => self.parse_array_schema(obj)?,
                "map" => self.parse_map_schema(obj)?,
                "fixed" => self.parse_fixed_schema(obj)?,
                other => match PrimitiveKind::from_name(other) {
                    Some(kind) => self.push(SchemaNode::Primitive(kind)),
                    None => match self.lookup_reference(other) {
                        Some(id) => id,
                        None => {
                            return Err(SchemaError::UnsupportedType(format!(
                                "Unknown type: {}",
                                other
                            )))
                        }
                    },
                },
            },
            // {"type": {...}} and {"type": [...]} wrap a nested schema
            nested => self.parse_node(nested)?,
        };

        match obj.get("logicalType") {
            Some(logical) => {
                let id = self.wrap_logical(obj, logical, base)?;
                // Later references to an annotated fixed keep the annotation
                if id != base && type_value.as_str() == Some("fixed") {
                    if let Some(fullname) = self.nodes[base.index()].fullname() {
                        self.named_types.insert(fullname, id);
                    }
                }
                Ok(id)
            }
            None => Ok(base),
        }
    }

    /// Parse a union schema from a JSON array.
    fn parse_union_schema(&mut self, arr: &[Value]) -> Result<NodeId, SchemaError> {
        if arr.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "Union schema cannot be empty".to_string(),
            ));
        }

        let branches = arr
            .iter()
            .map(|v| self.parse_node(v))
            .collect::<Result<Vec<_>, _>>()?;

        self.validate_union(&branches)?;

        Ok(self.push(SchemaNode::Union(branches)))
    }

    /// Parse a record schema.
    fn parse_record_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let (name, namespace) = self.parse_name(obj, "Record")?;
        let fullname = join(&namespace, &name);

        let doc = string_attr(obj, "doc");
        let aliases = self.parse_aliases(obj, &namespace);

        // Register before parsing fields so the record can refer to itself.
        // Fields are filled in once parsed; until then self-references see
        // the record's full name.
        let id = self.push(SchemaNode::Record(RecordSchema {
            name,
            namespace: namespace.clone(),
            fields: Vec::new(),
            doc,
            aliases,
        }));
        self.register(&fullname, id)?;

        let fields_value = obj
            .get("fields")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::InvalidSchema(format!("Record '{}' missing 'fields' array", fullname))
            })?;

        // Nested named types inherit the record's namespace.
        let prev_namespace = std::mem::replace(&mut self.current_namespace, namespace.clone());
        let fields = fields_value
            .iter()
            .map(|f| self.parse_field_schema(f))
            .collect::<Result<Vec<_>, _>>();
        self.current_namespace = prev_namespace;
        let fields = fields?;

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateName(format!(
                    "Field '{}' appears twice in record '{}'",
                    field.name, fullname
                )));
            }
        }

        if let SchemaNode::Record(record) = &mut self.nodes[id.index()] {
            record.fields = fields;
        }

        Ok(id)
    }

    /// Parse a field schema within a record.
    fn parse_field_schema(&mut self, value: &Value) -> Result<FieldSchema, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::InvalidSchema("Field must be an object".to_string()))?;

        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Field missing 'name'".to_string()))?
            .to_string();

        self.validate_name(&name, "Field")?;

        let type_value = obj.get("type").ok_or_else(|| {
            SchemaError::InvalidSchema(format!("Field '{}' missing 'type'", name))
        })?;

        let schema = self.parse_node(type_value)?;

        let order = match obj.get("order").and_then(|v| v.as_str()) {
            None | Some("ascending") => FieldOrder::Ascending,
            Some("descending") => FieldOrder::Descending,
            Some("ignore") => FieldOrder::Ignore,
            Some(other) => {
                return Err(SchemaError::InvalidSchema(format!(
                    "Field '{}' has invalid order '{}'",
                    name, other
                )))
            }
        };

        let aliases = obj
            .get("aliases")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(FieldSchema {
            name,
            schema,
            default: obj.get("default").cloned(),
            doc: string_attr(obj, "doc"),
            order,
            aliases,
        })
    }

    /// Parse an enum schema.
    fn parse_enum_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let (name, namespace) = self.parse_name(obj, "Enum")?;
        let fullname = join(&namespace, &name);

        let symbols = obj
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SchemaError::InvalidSchema("Enum missing 'symbols' array".to_string()))?
            .iter()
            .map(|v| {
                v.as_str().map(String::from).ok_or_else(|| {
                    SchemaError::InvalidSchema(format!(
                        "Enum '{}' has a non-string symbol: {}",
                        fullname, v
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if symbols.is_empty() {
            return Err(SchemaError::InvalidSchema(format!(
                "Enum '{}' must have at least one symbol",
                fullname
            )));
        }

        let mut seen = HashSet::new();
        for symbol in &symbols {
            self.validate_name(symbol, "Enum symbol")?;
            if !seen.insert(symbol.as_str()) {
                return Err(SchemaError::DuplicateName(format!(
                    "Symbol '{}' appears twice in enum '{}'",
                    symbol, fullname
                )));
            }
        }

        let default = string_attr(obj, "default");
        if let Some(default) = &default {
            if !seen.contains(default.as_str()) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Enum '{}' default '{}' is not one of its symbols",
                    fullname, default
                )));
            }
        }

        let aliases = self.parse_aliases(obj, &namespace);
        let id = self.push(SchemaNode::Enum(EnumSchema {
            name,
            namespace,
            symbols,
            doc: string_attr(obj, "doc"),
            aliases,
            default,
        }));
        self.register(&fullname, id)?;

        Ok(id)
    }

    /// Parse an array schema.
    fn parse_array_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let items = obj
            .get("items")
            .ok_or_else(|| SchemaError::InvalidSchema("Array missing 'items' field".to_string()))?;

        let item_schema = self.parse_node(items)?;
        Ok(self.push(SchemaNode::Array(item_schema)))
    }

    /// Parse a map schema.
    fn parse_map_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let values = obj
            .get("values")
            .ok_or_else(|| SchemaError::InvalidSchema("Map missing 'values' field".to_string()))?;

        let value_schema = self.parse_node(values)?;
        Ok(self.push(SchemaNode::Map(value_schema)))
    }

    /// Parse a fixed schema.
    fn parse_fixed_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let (name, namespace) = self.parse_name(obj, "Fixed")?;
        let fullname = join(&namespace, &name);

        let size = obj
            .get("size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                SchemaError::InvalidSchema(format!(
                    "Fixed '{}' missing non-negative integer 'size'",
                    fullname
                ))
            })?;
        let size = usize::try_from(size).map_err(|_| {
            SchemaError::InvalidSchema(format!("Fixed '{}' size {} is too large", fullname, size))
        })?;

        let aliases = self.parse_aliases(obj, &namespace);
        let id = self.push(SchemaNode::Fixed(FixedSchema {
            name,
            namespace,
            size,
            doc: string_attr(obj, "doc"),
            aliases,
        }));
        self.register(&fullname, id)?;

        Ok(id)
    }

    /// Wrap `base` in a logical type annotation.
    ///
    /// Unknown logical types, and known ones on a base type they do not
    /// support, are ignored and the base schema is used as-is.
    fn wrap_logical(
        &mut self,
        obj: &Map<String, Value>,
        logical: &Value,
        base: NodeId,
    ) -> Result<NodeId, SchemaError> {
        let logical_name = logical.as_str().ok_or_else(|| {
            SchemaError::InvalidSchema("logicalType must be a string".to_string())
        })?;

        let base_node = &self.nodes[base.index()];
        let base_kind = match base_node {
            SchemaNode::Primitive(kind) => Some(*kind),
            _ => None,
        };
        let fixed_size = match base_node {
            SchemaNode::Fixed(f) => Some(f.size),
            _ => None,
        };

        let logical_type = match logical_name {
            "decimal" if base_kind == Some(PrimitiveKind::Bytes) || fixed_size.is_some() => {
                let precision = obj.get("precision").and_then(|v| v.as_u64()).unwrap_or(0);
                let scale = obj.get("scale").and_then(|v| v.as_u64()).unwrap_or(0);
                if precision == 0 || scale > precision || precision > u32::MAX as u64 {
                    None
                } else {
                    Some(LogicalTypeName::Decimal {
                        precision: precision as u32,
                        scale: scale as u32,
                    })
                }
            }
            "uuid" if base_kind == Some(PrimitiveKind::String) || fixed_size == Some(16) => {
                Some(LogicalTypeName::Uuid)
            }
            "date" if base_kind == Some(PrimitiveKind::Int) => Some(LogicalTypeName::Date),
            "time-millis" if base_kind == Some(PrimitiveKind::Int) => {
                Some(LogicalTypeName::TimeMillis)
            }
            "time-micros" if base_kind == Some(PrimitiveKind::Long) => {
                Some(LogicalTypeName::TimeMicros)
            }
            "timestamp-millis" if base_kind == Some(PrimitiveKind::Long) => {
                Some(LogicalTypeName::TimestampMillis)
            }
            "timestamp-micros" if base_kind == Some(PrimitiveKind::Long) => {
                Some(LogicalTypeName::TimestampMicros)
            }
            "local-timestamp-millis" if base_kind == Some(PrimitiveKind::Long) => {
                Some(LogicalTypeName::LocalTimestampMillis)
            }
            "local-timestamp-micros" if base_kind == Some(PrimitiveKind::Long) => {
                Some(LogicalTypeName::LocalTimestampMicros)
            }
            "duration" if fixed_size == Some(12) => Some(LogicalTypeName::Duration),
            _ => None,
        };

        match logical_type {
            Some(logical_type) => Ok(self.push(SchemaNode::Logical(LogicalType {
                base,
                logical_type,
            }))),
            None => {
                warn!(
                    logical_type = logical_name,
                    base = %self.nodes[base.index()].kind_name(),
                    "Ignoring unsupported logical type annotation"
                );
                Ok(base)
            }
        }
    }

    /// Split the `name`/`namespace` attributes of a named type.
    ///
    /// A dotted name carries its own namespace; otherwise the explicit
    /// `namespace` attribute wins, then the enclosing namespace.
    fn parse_name(
        &self,
        obj: &Map<String, Value>,
        context: &str,
    ) -> Result<(String, Option<String>), SchemaError> {
        let raw = obj.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
            SchemaError::InvalidSchema(format!("{} missing 'name' field", context))
        })?;

        let (name, namespace) = match raw.rsplit_once('.') {
            Some((ns, name)) => (name.to_string(), Some(ns.to_string())),
            None => {
                let namespace = match obj.get("namespace").and_then(|v| v.as_str()) {
                    Some("") => None,
                    Some(ns) => Some(ns.to_string()),
                    None => self.current_namespace.clone(),
                };
                (raw.to_string(), namespace)
            }
        };

        self.validate_name(&name, context)?;
        Ok((name, namespace))
    }

    fn parse_aliases(&self, obj: &Map<String, Value>, namespace: &Option<String>) -> Vec<String> {
        obj.get("aliases")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .map(|alias| {
                        if alias.contains('.') {
                            alias.to_string()
                        } else {
                            join(namespace, alias)
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn register(&mut self, fullname: &str, id: NodeId) -> Result<(), SchemaError> {
        if self.named_types.contains_key(fullname) {
            return Err(SchemaError::DuplicateName(format!(
                "Named type '{}' is defined more than once",
                fullname
            )));
        }
        self.named_types.insert(fullname.to_string(), id);
        Ok(())
    }

    /// Find a previously defined named type, trying the enclosing namespace
    /// first and the null namespace second.
    fn lookup_reference(&self, name: &str) -> Option<NodeId> {
        if !name.contains('.') {
            if let Some(ns) = &self.current_namespace {
                if let Some(id) = self.named_types.get(&format!("{}.{}", ns, name)) {
                    return Some(*id);
                }
            }
        }
        self.named_types.get(name).copied()
    }

    fn resolve_reference(&self, name: &str) -> Result<NodeId, SchemaError> {
        self.lookup_reference(name)
            .ok_or_else(|| SchemaError::UnresolvedReference(name.to_string()))
    }

    /// Get a named type from the registry.
    pub fn get_named_type(&self, name: &str) -> Option<&SchemaNode> {
        self.named_types
            .get(name)
            .map(|id| &self.nodes[id.index()])
    }

    /// Validate that a name follows Avro naming rules.
    ///
    /// Avro names must:
    /// - Start with [A-Za-z_]
    /// - Contain only [A-Za-z0-9_]
    fn validate_name(&self, name: &str, context: &str) -> Result<(), SchemaError> {
        let problem = match name.chars().next() {
            None => Some(format!("{} name cannot be empty", context)),
            Some(first) if !first.is_ascii_alphabetic() && first != '_' => Some(format!(
                "{} name '{}' must start with a letter or underscore",
                context, name
            )),
            Some(_) => name
                .chars()
                .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_')
                .map(|ch| {
                    format!(
                        "{} name '{}' contains invalid character '{}'",
                        context, name, ch
                    )
                }),
        };

        match problem {
            Some(msg) if self.strict_schema => Err(SchemaError::InvalidSchema(msg)),
            Some(msg) => {
                warn!("{}", msg);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Validate union schema rules.
    ///
    /// Avro unions must not contain nested unions, and no two branches may
    /// share a primitive kind, a container kind, or a named type.
    fn validate_union(&self, branches: &[NodeId]) -> Result<(), SchemaError> {
        let mut seen_types = HashSet::new();
        for (i, branch) in branches.iter().enumerate() {
            if matches!(self.nodes[branch.index()], SchemaNode::Union(_)) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Union contains nested union at position {}",
                    i
                )));
            }
            let type_key = self.type_key(*branch);
            if !seen_types.insert(type_key.clone()) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Union contains duplicate type '{}' at position {}",
                    type_key, i
                )));
            }
        }
        Ok(())
    }

    /// Get a unique key for a schema type (for duplicate detection in unions).
    fn type_key(&self, id: NodeId) -> String {
        match &self.nodes[id.index()] {
            SchemaNode::Primitive(kind) => kind.name().to_string(),
            SchemaNode::Array(_) => "array".to_string(),
            SchemaNode::Map(_) => "map".to_string(),
            SchemaNode::Union(_) => "union".to_string(),
            SchemaNode::Record(r) => r.fullname(),
            SchemaNode::Enum(e) => e.fullname(),
            SchemaNode::Fixed(f) => f.fullname(),
            SchemaNode::Logical(l) => self.type_key(l.base),
        }
    }
}

fn join(namespace: &Option<String>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}.{}", ns, name),
        None => name.to_string(),
    }
}

fn string_attr(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(String::from)
}
