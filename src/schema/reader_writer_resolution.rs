//! Schema resolution for reader/writer schema evolution.
//!
//! A [`ResolutionPlan`] is compiled once per (writer, reader) schema pair and
//! then drives decoding of every datum written with that writer schema. It
//! handles:
//! - Field reordering, skipping writer-only fields, reader field defaults
//! - Type promotions (int→long, float→double, string↔bytes, ...)
//! - Union branch selection on either side
//! - Enum symbol remapping with the reader's default symbol
//!
//! Compilation never fails. Parts of the schemas that cannot be reconciled
//! compile into steps that fail the datum only when decoding reaches them.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::reader::DecodedValue;
use crate::schema::{NodeId, PrimitiveKind, Schema, SchemaNode};

/// Index of a step inside a [`ResolutionPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepId(u32);

impl StepId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type promotions supported by Avro schema resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePromotion {
    /// int → long
    IntToLong,
    /// int → float
    IntToFloat,
    /// int → double
    IntToDouble,
    /// long → float
    LongToFloat,
    /// long → double
    LongToDouble,
    /// float → double
    FloatToDouble,
    /// string → bytes
    StringToBytes,
    /// bytes → string
    BytesToString,
}

impl TypePromotion {
    /// Determine the promotion from a writer primitive to a reader primitive.
    ///
    /// Returns `None` when the kinds are identical or no promotion exists.
    pub fn between(writer: PrimitiveKind, reader: PrimitiveKind) -> Option<Self> {
        use PrimitiveKind::*;
        match (writer, reader) {
            // int promotions
            (Int, Long) => Some(TypePromotion::IntToLong),
            (Int, Float) => Some(TypePromotion::IntToFloat),
            (Int, Double) => Some(TypePromotion::IntToDouble),

            // long promotions
            (Long, Float) => Some(TypePromotion::LongToFloat),
            (Long, Double) => Some(TypePromotion::LongToDouble),

            // float promotion
            (Float, Double) => Some(TypePromotion::FloatToDouble),

            // string/bytes interchangeable
            (String, Bytes) => Some(TypePromotion::StringToBytes),
            (Bytes, String) => Some(TypePromotion::BytesToString),

            _ => None,
        }
    }

    /// The writer kind this promotion reads from the wire.
    pub fn writer_kind(self) -> PrimitiveKind {
        match self {
            TypePromotion::IntToLong | TypePromotion::IntToFloat | TypePromotion::IntToDouble => {
                PrimitiveKind::Int
            }
            TypePromotion::LongToFloat | TypePromotion::LongToDouble => PrimitiveKind::Long,
            TypePromotion::FloatToDouble => PrimitiveKind::Float,
            TypePromotion::StringToBytes => PrimitiveKind::String,
            TypePromotion::BytesToString => PrimitiveKind::Bytes,
        }
    }
}

/// What to do with one writer field of a record.
#[derive(Debug, Clone)]
pub enum WriterField {
    /// Decode with `step` and store at `reader_index` of the reader record.
    Read { reader_index: usize, step: StepId },
    /// Not known to the reader; skip a value of this writer node.
    Skip(NodeId),
}

/// How a reader field absent from the writer is filled.
#[derive(Debug, Clone)]
pub enum ReaderDefault {
    /// The field's default, already converted to a value.
    Value {
        reader_index: usize,
        value: DecodedValue,
    },
    /// No usable default; the datum fails with `MissingDefault`.
    Missing { reader_index: usize, reason: String },
}

/// One compiled resolution step.
#[derive(Debug, Clone)]
pub enum Step {
    /// Identical primitive on both sides.
    Primitive(PrimitiveKind),
    /// Writer primitive promoted to the reader's type.
    Promote(TypePromotion),
    /// Record resolution: writer fields in wire order, then defaults.
    Record {
        fields: Vec<WriterField>,
        defaults: Vec<ReaderDefault>,
    },
    /// Enum resolution: writer symbol index to reader symbol index, or the
    /// writer symbol the reader cannot represent.
    Enum { mapping: Vec<Result<usize, String>> },
    /// Array with resolved items.
    Array(StepId),
    /// Map with resolved values.
    Map(StepId),
    /// Fixed of matching name and size.
    Fixed(usize),
    /// Writer union: read the branch index, then run that branch's step.
    WriterUnion(Vec<StepId>),
    /// Writer non-union read into one branch of a reader union.
    ReaderUnion { branch: usize, step: StepId },
    /// Irreconcilable schemas; fails the datum with `SchemaMismatch`.
    Fail(String),
}

/// A compiled step and the reader node its output conforms to.
#[derive(Debug, Clone)]
pub struct PlanNode {
    /// Reader node the step produces a value of (conversion key).
    pub reader: NodeId,
    /// Writer node the step consumes from the wire.
    pub writer: NodeId,
    /// The step itself.
    pub step: Step,
}

/// Compiled resolution of a writer schema against a reader schema.
///
/// Immutable; share it between handles with `Arc`. Recursive schemas
/// compile to a plan whose steps refer back to earlier steps.
#[derive(Debug)]
pub struct ResolutionPlan {
    writer: Arc<Schema>,
    reader: Arc<Schema>,
    steps: Vec<PlanNode>,
    root: StepId,
}

impl ResolutionPlan {
    /// Compile the plan for reading `writer` data as `reader`.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use contrail::schema::{ResolutionPlan, Schema};
    ///
    /// let writer = Arc::new(Schema::parse(r#""int""#).unwrap());
    /// let reader = Arc::new(Schema::parse(r#""double""#).unwrap());
    /// let plan = ResolutionPlan::compile(&writer, &reader);
    /// assert!(!plan.has_failures());
    /// ```
    pub fn compile(writer: &Arc<Schema>, reader: &Arc<Schema>) -> Self {
        let mut compiler = PlanCompiler {
            writer,
            reader,
            steps: Vec::new(),
            memo: HashMap::new(),
        };
        let root = compiler.compile(writer.root(), reader.root());
        let steps = compiler.steps;

        Self {
            writer: Arc::clone(writer),
            reader: Arc::clone(reader),
            steps,
            root,
        }
    }

    /// The writer schema.
    pub fn writer(&self) -> &Arc<Schema> {
        &self.writer
    }

    /// The reader schema.
    pub fn reader(&self) -> &Arc<Schema> {
        &self.reader
    }

    /// The step for the root of both schemas.
    pub fn root(&self) -> StepId {
        self.root
    }

    /// Get a compiled step.
    pub fn node(&self, id: StepId) -> &PlanNode {
        &self.steps[id.index()]
    }

    /// Number of compiled steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Whether any part of the plan is known to fail when reached.
    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|n| match &n.step {
            Step::Fail(_) => true,
            Step::Record { defaults, .. } => defaults
                .iter()
                .any(|d| matches!(d, ReaderDefault::Missing { .. })),
            Step::Enum { mapping } => mapping.iter().any(|m| m.is_err()),
            _ => false,
        })
    }
}

struct PlanCompiler<'a> {
    writer: &'a Schema,
    reader: &'a Schema,
    steps: Vec<PlanNode>,
    memo: HashMap<(NodeId, NodeId), StepId>,
}

impl PlanCompiler<'_> {
    fn compile(&mut self, w: NodeId, r: NodeId) -> StepId {
        if let Some(id) = self.memo.get(&(w, r)) {
            return *id;
        }

        // Reserve the slot first so recursive references find it.
        let id = StepId(self.steps.len() as u32);
        self.steps.push(PlanNode {
            reader: r,
            writer: w,
            step: Step::Fail(String::new()),
        });
        self.memo.insert((w, r), id);

        let step = self.compile_step(w, r);
        self.steps[id.index()].step = step;
        id
    }

    fn compile_step(&mut self, w: NodeId, r: NodeId) -> Step {
        let writer = self.writer;
        let reader = self.reader;
        let w_base = writer.strip_logical(w);
        let r_base = reader.strip_logical(r);

        match (writer.node(w_base), reader.node(r_base)) {
            (SchemaNode::Union(branches), _) => Step::WriterUnion(
                branches.iter().map(|b| self.compile(*b, r)).collect(),
            ),
            (_, SchemaNode::Union(branches)) => match self.select_reader_branch(w_base, branches) {
                Some(branch) => Step::ReaderUnion {
                    branch,
                    step: self.compile(w, branches[branch]),
                },
                None => Step::Fail(format!(
                    "Writer type '{}' matches no branch of the reader union",
                    writer.node(w_base).kind_name()
                )),
            },
            (SchemaNode::Primitive(wk), SchemaNode::Primitive(rk)) => {
                if wk == rk {
                    Step::Primitive(*wk)
                } else {
                    match TypePromotion::between(*wk, *rk) {
                        Some(p) => Step::Promote(p),
                        None => mismatch(writer, w_base, reader, r_base),
                    }
                }
            }
            (SchemaNode::Record(wr), SchemaNode::Record(rr)) => {
                if !names_match(&wr.name, &wr.namespace, &rr.name, &rr.aliases) {
                    return mismatch(writer, w_base, reader, r_base);
                }

                let mut matched = vec![false; rr.fields.len()];
                let mut fields = Vec::with_capacity(wr.fields.len());
                for wf in &wr.fields {
                    let reader_index = rr.fields.iter().position(|rf| {
                        rf.name == wf.name || rf.aliases.iter().any(|a| a == &wf.name)
                    });
                    match reader_index {
                        Some(i) if !matched[i] => {
                            matched[i] = true;
                            let step = self.compile(wf.schema, rr.fields[i].schema);
                            fields.push(WriterField::Read {
                                reader_index: i,
                                step,
                            });
                        }
                        _ => fields.push(WriterField::Skip(wf.schema)),
                    }
                }

                let defaults = rr
                    .fields
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !matched[*i])
                    .map(|(i, rf)| match &rf.default {
                        Some(json) => match json_to_value(json, reader, rf.schema) {
                            Ok(value) => ReaderDefault::Value {
                                reader_index: i,
                                value,
                            },
                            Err(reason) => ReaderDefault::Missing {
                                reader_index: i,
                                reason,
                            },
                        },
                        None => ReaderDefault::Missing {
                            reader_index: i,
                            reason: "no default".to_string(),
                        },
                    })
                    .collect();

                Step::Record { fields, defaults }
            }
            (SchemaNode::Enum(we), SchemaNode::Enum(re)) => {
                if !names_match(&we.name, &we.namespace, &re.name, &re.aliases) {
                    return mismatch(writer, w_base, reader, r_base);
                }
                let fallback = re.default.as_deref().and_then(|d| re.symbol_index(d));
                let mapping = we
                    .symbols
                    .iter()
                    .map(|symbol| {
                        re.symbol_index(symbol)
                            .or(fallback)
                            .ok_or_else(|| symbol.clone())
                    })
                    .collect();
                Step::Enum { mapping }
            }
            (SchemaNode::Array(wi), SchemaNode::Array(ri)) => Step::Array(self.compile(*wi, *ri)),
            (SchemaNode::Map(wv), SchemaNode::Map(rv)) => Step::Map(self.compile(*wv, *rv)),
            (SchemaNode::Fixed(wf), SchemaNode::Fixed(rf)) => {
                if names_match(&wf.name, &wf.namespace, &rf.name, &rf.aliases)
                    && wf.size == rf.size
                {
                    Step::Fixed(wf.size)
                } else {
                    mismatch(writer, w_base, reader, r_base)
                }
            }
            _ => mismatch(writer, w_base, reader, r_base),
        }
    }

    /// Pick the reader union branch for a writer non-union type: the first
    /// branch of the same kind (and name, for named types), else the first
    /// branch reachable by promotion.
    fn select_reader_branch(&self, w: NodeId, branches: &[NodeId]) -> Option<usize> {
        let writer_node = self.writer.node(w);
        let reader_nodes: Vec<&SchemaNode> = branches
            .iter()
            .map(|b| self.reader.node(self.reader.strip_logical(*b)))
            .collect();

        let exact = reader_nodes.iter().position(|r| match (writer_node, r) {
            (SchemaNode::Primitive(a), SchemaNode::Primitive(b)) => a == b,
            (SchemaNode::Record(a), SchemaNode::Record(b)) => {
                names_match(&a.name, &a.namespace, &b.name, &b.aliases)
            }
            (SchemaNode::Enum(a), SchemaNode::Enum(b)) => {
                names_match(&a.name, &a.namespace, &b.name, &b.aliases)
            }
            (SchemaNode::Fixed(a), SchemaNode::Fixed(b)) => {
                names_match(&a.name, &a.namespace, &b.name, &b.aliases)
            }
            (SchemaNode::Array(_), SchemaNode::Array(_)) | (SchemaNode::Map(_), SchemaNode::Map(_)) => {
                true
            }
            _ => false,
        });

        exact.or_else(|| {
            reader_nodes.iter().position(|r| match (writer_node, r) {
                (SchemaNode::Primitive(a), SchemaNode::Primitive(b)) => {
                    TypePromotion::between(*a, *b).is_some()
                }
                _ => false,
            })
        })
    }
}

fn mismatch(writer: &Schema, w: NodeId, reader: &Schema, r: NodeId) -> Step {
    Step::Fail(format!(
        "Writer type '{}' cannot be read as '{}'",
        writer.node(w).kind_name(),
        reader.node(r).kind_name()
    ))
}

/// Named types match by unqualified name, or when the writer's name appears
/// among the reader's aliases.
fn names_match(
    writer_name: &str,
    writer_namespace: &Option<String>,
    reader_name: &str,
    reader_aliases: &[String],
) -> bool {
    if writer_name == reader_name {
        return true;
    }
    let writer_fullname = match writer_namespace {
        Some(ns) => format!("{}.{}", ns, writer_name),
        None => writer_name.to_string(),
    };
    reader_aliases.iter().any(|alias| {
        alias == &writer_fullname || alias.rsplit('.').next() == Some(writer_name)
    })
}

/// Convert a JSON default value to a decoded value of `node`.
///
/// Union defaults apply to the first branch. Bytes and fixed defaults are
/// strings whose code points 0-255 are the byte values.
pub fn json_to_value(json: &Value, schema: &Schema, node: NodeId) -> Result<DecodedValue, String> {
    json_to_value_inner(json, schema, node, 0)
}

fn json_to_value_inner(
    json: &Value,
    schema: &Schema,
    node: NodeId,
    depth: usize,
) -> Result<DecodedValue, String> {
    // Self-referential defaults cannot be finite beyond this
    if depth > 256 {
        return Err("default value nests too deeply".to_string());
    }

    match (json, schema.node(node)) {
        (json, SchemaNode::Logical(l)) => json_to_value_inner(json, schema, l.base, depth),

        // Null
        (Value::Null, SchemaNode::Primitive(PrimitiveKind::Null)) => Ok(DecodedValue::Null),

        // Boolean
        (Value::Bool(b), SchemaNode::Primitive(PrimitiveKind::Boolean)) => {
            Ok(DecodedValue::Bool(*b))
        }

        // Integer types
        (Value::Number(n), SchemaNode::Primitive(PrimitiveKind::Int)) => {
            let v = n
                .as_i64()
                .ok_or_else(|| format!("Cannot convert {} to int", n))?;
            if i32::try_from(v).is_err() {
                return Err(format!("Value {} out of range for int", v));
            }
            Ok(DecodedValue::Long(v))
        }
        (Value::Number(n), SchemaNode::Primitive(PrimitiveKind::Long)) => n
            .as_i64()
            .map(DecodedValue::Long)
            .ok_or_else(|| format!("Cannot convert {} to long", n)),

        // Float types
        (Value::Number(n), SchemaNode::Primitive(PrimitiveKind::Float)) => n
            .as_f64()
            .map(|v| DecodedValue::Double(v as f32 as f64))
            .ok_or_else(|| format!("Cannot convert {} to float", n)),
        (Value::Number(n), SchemaNode::Primitive(PrimitiveKind::Double)) => n
            .as_f64()
            .map(DecodedValue::Double)
            .ok_or_else(|| format!("Cannot convert {} to double", n)),

        // String
        (Value::String(s), SchemaNode::Primitive(PrimitiveKind::String)) => {
            Ok(DecodedValue::String(s.clone()))
        }

        // Bytes (encoded as an ISO-8859-1 string in JSON)
        (Value::String(s), SchemaNode::Primitive(PrimitiveKind::Bytes)) => {
            latin1_bytes(s).map(DecodedValue::Bytes)
        }

        (Value::String(s), SchemaNode::Fixed(fixed)) => {
            let bytes = latin1_bytes(s)?;
            if bytes.len() != fixed.size {
                return Err(format!(
                    "Fixed default has wrong size: expected {}, got {}",
                    fixed.size,
                    bytes.len()
                ));
            }
            Ok(DecodedValue::Fixed(bytes))
        }

        (Value::String(s), SchemaNode::Enum(e)) => {
            let index = e
                .symbol_index(s)
                .ok_or_else(|| format!("Unknown enum symbol '{}' for enum '{}'", s, e.name))?;
            Ok(DecodedValue::EnumSymbol {
                index,
                symbol: s.clone(),
            })
        }

        (Value::Array(arr), SchemaNode::Array(items)) => arr
            .iter()
            .map(|item| json_to_value_inner(item, schema, *items, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(DecodedValue::Array),

        (Value::Object(obj), SchemaNode::Map(values)) => obj
            .iter()
            .map(|(k, v)| Ok((k.clone(), json_to_value_inner(v, schema, *values, depth + 1)?)))
            .collect::<Result<HashMap<_, _>, String>>()
            .map(DecodedValue::Map),

        (Value::Object(obj), SchemaNode::Record(record)) => record
            .fields
            .iter()
            .map(|field| {
                let value = match obj.get(&field.name).or(field.default.as_ref()) {
                    Some(v) => json_to_value_inner(v, schema, field.schema, depth + 1)?,
                    None => {
                        return Err(format!(
                            "Missing required field '{}' in default value",
                            field.name
                        ))
                    }
                };
                Ok((field.name.clone(), value))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(DecodedValue::Record),

        // Union - the default value must match the first branch
        (json, SchemaNode::Union(branches)) => {
            let first = branches
                .first()
                .ok_or_else(|| "Empty union".to_string())?;
            let value = json_to_value_inner(json, schema, *first, depth + 1)?;
            Ok(DecodedValue::Union {
                branch: 0,
                value: Box::new(value),
            })
        }

        (json, node) => Err(format!(
            "Cannot convert JSON {} to {}",
            json,
            node.kind_name()
        )),
    }
}

fn latin1_bytes(s: &str) -> Result<Vec<u8>, String> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| format!("Character {:?} is not a byte", c)))
        .collect()
}
