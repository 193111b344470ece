//! Provider-side schema representation.
//!
//! MCP servers describe tool inputs with JSON-Schema-like documents. The
//! parser here is lenient: anything it does not understand is kept in a form
//! the translator can report as a soft skip instead of failing the tool.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One node of a provider-described schema.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonSchemaNode {
    /// `true` / `false` schemas (accept-all / accept-none)
    Bool(bool),
    Object(SchemaObject),
}

/// The `type` keyword: a single name or a list of alternatives.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Single(String),
    /// Alternatives in declaration order; `None` marks entries that are not strings
    Union(Vec<Option<String>>),
    /// Present but neither a string nor an array
    Invalid(Value),
}

/// The `items` keyword of an array schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemsSpec {
    Single(Box<JsonSchemaNode>),
    /// Tuple typing (`items: [..]`)
    Tuple(Vec<JsonSchemaNode>),
    Malformed(Value),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaObject {
    pub schema_type: Option<TypeSpec>,
    pub description: Option<String>,
    /// `None` when the keyword is absent; malformed entries are dropped
    pub properties: Option<BTreeMap<String, JsonSchemaNode>>,
    /// Copied verbatim from the provider (string entries only)
    pub required: Option<Vec<String>>,
    pub items: Option<ItemsSpec>,
    pub enum_values: Option<Vec<Value>>,
}

impl JsonSchemaNode {
    /// Interpret a JSON value as a schema node. Returns `None` for values that
    /// are neither booleans nor objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(JsonSchemaNode::Bool(*flag)),
            Value::Object(map) => Some(JsonSchemaNode::Object(SchemaObject::from_map(map))),
            _ => None,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, JsonSchemaNode::Bool(_))
    }

    pub fn as_object(&self) -> Option<&SchemaObject> {
        match self {
            JsonSchemaNode::Object(object) => Some(object),
            JsonSchemaNode::Bool(_) => None,
        }
    }
}

impl SchemaObject {
    fn from_map(map: &Map<String, Value>) -> Self {
        let schema_type = map.get("type").map(|raw| match raw {
            Value::String(name) => TypeSpec::Single(name.clone()),
            Value::Array(entries) => TypeSpec::Union(
                entries
                    .iter()
                    .map(|entry| entry.as_str().map(str::to_string))
                    .collect(),
            ),
            other => TypeSpec::Invalid(other.clone()),
        });

        let description = map
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        let properties = map.get("properties").and_then(Value::as_object).map(|props| {
            props
                .iter()
                .filter_map(|(key, value)| {
                    JsonSchemaNode::from_value(value).map(|node| (key.clone(), node))
                })
                .collect()
        });

        let required = map.get("required").and_then(Value::as_array).map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });

        let items = map.get("items").map(|raw| match raw {
            Value::Array(entries) => {
                ItemsSpec::Tuple(entries.iter().filter_map(JsonSchemaNode::from_value).collect())
            }
            other => match JsonSchemaNode::from_value(other) {
                Some(node) => ItemsSpec::Single(Box::new(node)),
                None => ItemsSpec::Malformed(other.clone()),
            },
        });

        let enum_values = map.get("enum").and_then(Value::as_array).cloned();

        Self {
            schema_type,
            description,
            properties,
            required,
            items,
            enum_values,
        }
    }

    /// True when `type` is exactly the string `"object"`.
    pub fn is_plain_object(&self) -> bool {
        matches!(&self.schema_type, Some(TypeSpec::Single(name)) if name == "object")
    }

    /// Textual form of the declared type, used in log lines.
    pub fn type_label(&self) -> String {
        match &self.schema_type {
            None => "<missing>".to_string(),
            Some(TypeSpec::Single(name)) => name.clone(),
            Some(TypeSpec::Union(names)) => format!(
                "[{}]",
                names
                    .iter()
                    .map(|name| name.as_deref().unwrap_or("?"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Some(TypeSpec::Invalid(value)) => value.to_string(),
        }
    }
}
