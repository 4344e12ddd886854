//! Schema registry.
//!
//! Block shapes are not compiled into the engine: they arrive as external
//! declarative data (JSON), so adding a block type means adding data, not
//! code. The registry is a lookup table keyed by block type with optional
//! per-label overrides — an exact `(type, labels...)` entry wins over a
//! `(type, first_label)` entry, which wins over the bare `(type)` entry.
//!
//! The default agent-domain registry (runtime, variable, model,
//! plugin local/remote, agent) ships as `schemas/agent.json`.

use indexmap::IndexMap;
use serde::Deserialize;
use smith_adl_ast::Value;

/// Declared attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Bool,
    List,
    Map,
    /// Accepts any value.
    #[default]
    Any,
}

impl SchemaType {
    /// Parse a type name as written in `variable` blocks.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(SchemaType::String),
            "number" => Some(SchemaType::Number),
            "bool" => Some(SchemaType::Bool),
            "list" => Some(SchemaType::List),
            "map" => Some(SchemaType::Map),
            "any" => Some(SchemaType::Any),
            _ => None,
        }
    }

    /// Whether a resolved value satisfies this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            SchemaType::Any => true,
            SchemaType::String => matches!(value, Value::String(_)),
            SchemaType::Number => matches!(value, Value::Number(_)),
            SchemaType::Bool => matches!(value, Value::Bool(_)),
            SchemaType::List => matches!(value, Value::List(_)),
            SchemaType::Map => matches!(value, Value::Map(_)),
        }
    }

    /// Type name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Bool => "bool",
            SchemaType::List => "list",
            SchemaType::Map => "map",
            SchemaType::Any => "any",
        }
    }
}

/// One validation rule on an attribute. Exactly one of `range`, `pattern`,
/// `options` is expected to be set per rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub range: Option<RangeRule>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<serde_json::Value>>,
    /// Custom message reported instead of a generated one.
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RangeRule {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Schema for one attribute.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributeSchema {
    #[serde(rename = "type", default)]
    pub value_type: SchemaType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Element schema applied to list items / map values.
    #[serde(default)]
    pub element: Option<Box<AttributeSchema>>,
    #[serde(default)]
    pub validation: Vec<ValidationRule>,
}

/// How a nested block type may repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    /// At most one block (exactly one when `min_items` is 1).
    Single,
    /// A sequence of blocks, counted against `[min_items, max_items]`.
    List,
}

/// Schema for a nested block type.
#[derive(Debug, Clone, Deserialize)]
pub struct NestedBlockSchema {
    pub nesting_mode: NestingMode,
    #[serde(default)]
    pub min_items: Option<usize>,
    #[serde(default)]
    pub max_items: Option<usize>,
    pub block: BlockSchema,
}

/// The shape of one block body: legal attributes and nested block types.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockSchema {
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeSchema>,
    #[serde(default)]
    pub block_types: IndexMap<String, NestedBlockSchema>,
}

/// Registry entry for one block type, with optional label-specific
/// overrides (e.g. `plugin "local"` vs `plugin "remote"`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaEntry {
    /// Names of the labels this block type takes, e.g. `["kind", "id"]`.
    #[serde(default)]
    pub label_names: Vec<String>,
    /// Shape used when no label-specific entry matches.
    #[serde(default)]
    pub block: Option<BlockSchema>,
    /// Per-first-label (and recursively per-second-label) overrides.
    #[serde(default)]
    pub labels: IndexMap<String, SchemaEntry>,
}

/// The full registry: block type name → entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaRegistry {
    pub schemas: IndexMap<String, SchemaEntry>,
}

impl SchemaRegistry {
    /// Load a registry from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The built-in agent-domain registry.
    pub fn agent_defaults() -> Self {
        Self::from_json(include_str!("schemas/agent.json"))
            .expect("embedded agent schema is valid JSON")
    }

    /// Whether a block type exists at all.
    pub fn contains(&self, block_type: &str) -> bool {
        self.schemas.contains_key(block_type)
    }

    /// Label names declared for a block type.
    pub fn label_names(&self, block_type: &str) -> Option<&[String]> {
        self.schemas
            .get(block_type)
            .map(|entry| entry.label_names.as_slice())
    }

    /// Find the most specific block schema for `(block_type, labels)`.
    ///
    /// Walks label-specific entries as far as the labels match, falling
    /// back to the last entry that carries a shape.
    pub fn lookup(&self, block_type: &str, labels: &[String]) -> Option<&BlockSchema> {
        let mut entry = self.schemas.get(block_type)?;
        let mut best = entry.block.as_ref();
        for label in labels {
            match entry.labels.get(label) {
                Some(sub) => {
                    entry = sub;
                    if sub.block.is_some() {
                        best = sub.block.as_ref();
                    }
                }
                None => break,
            }
        }
        best
    }
}
