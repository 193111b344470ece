use super::node::{ItemsSpec, JsonSchemaNode, SchemaObject, TypeSpec};
use super::param::{ObjectSchema, ParamSchema, SchemaType};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Reason a schema node produced no parameter schema. Always soft: the
/// caller drops the node and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaSkip {
    #[error("boolean schema has no parameter form")]
    BooleanSchema,
    #[error("schema declares no type")]
    MissingType,
    #[error("schema only admits null")]
    NullOnly,
    #[error("unsupported schema type '{0}'")]
    UnsupportedType(String),
    #[error("input schema has root type '{0}' instead of 'object'")]
    NonObjectRoot(String),
}

/// Resolve the `type` keyword to a single LLM type. Unions pick the first
/// non-null alternative.
pub fn resolve_type(spec: &TypeSpec) -> Result<SchemaType, SchemaSkip> {
    match spec {
        TypeSpec::Single(name) if name == "null" => Err(SchemaSkip::NullOnly),
        TypeSpec::Single(name) => {
            SchemaType::from_provider(name).ok_or_else(|| SchemaSkip::UnsupportedType(name.clone()))
        }
        TypeSpec::Union(alternatives) => alternatives
            .iter()
            .flatten()
            .find(|name| name.as_str() != "null")
            .map(|name| resolve_type(&TypeSpec::Single(name.clone())))
            .unwrap_or(Err(SchemaSkip::NullOnly)),
        TypeSpec::Invalid(raw) => Err(SchemaSkip::UnsupportedType(raw.to_string())),
    }
}

/// Translate a tool's whole input schema. The root must be a plain
/// `"object"` schema.
pub fn translate_input_schema(node: &JsonSchemaNode) -> Result<ObjectSchema, SchemaSkip> {
    let object = match node {
        JsonSchemaNode::Bool(_) => return Err(SchemaSkip::BooleanSchema),
        JsonSchemaNode::Object(object) => object,
    };
    if !object.is_plain_object() {
        return Err(SchemaSkip::NonObjectRoot(object.type_label()));
    }

    let mut schema = ObjectSchema::new(
        translate_properties(object.properties.as_ref()),
        object.required.clone(),
    );
    schema.description = object.description.clone();
    Ok(schema)
}

/// Translate a nested schema (a property or an array item). Any resolvable
/// type is accepted here.
pub fn translate_schema(node: &JsonSchemaNode) -> Result<ParamSchema, SchemaSkip> {
    let object = match node {
        JsonSchemaNode::Bool(_) => return Err(SchemaSkip::BooleanSchema),
        JsonSchemaNode::Object(object) => object,
    };
    let spec = object.schema_type.as_ref().ok_or(SchemaSkip::MissingType)?;
    let schema_type = resolve_type(spec)?;

    let mut schema = ParamSchema::of(schema_type);
    schema.description = object.description.clone();

    match schema_type {
        SchemaType::Object => {
            schema.properties = Some(translate_properties(object.properties.as_ref()));
            schema.required = object.required.clone();
        }
        SchemaType::Array => {
            schema.items = translate_items(object);
        }
        SchemaType::String => {
            schema.enum_values = object.enum_values.as_deref().map(stringify_enum);
        }
        SchemaType::Number | SchemaType::Integer | SchemaType::Boolean => {}
    }

    Ok(schema)
}

/// Translate every property independently; untranslatable ones are omitted.
pub fn translate_properties(
    properties: Option<&BTreeMap<String, JsonSchemaNode>>,
) -> BTreeMap<String, ParamSchema> {
    let mut translated = BTreeMap::new();
    let Some(properties) = properties else {
        return translated;
    };

    for (key, node) in properties {
        if node.is_bool() {
            debug!(property = key.as_str(), "Skipping boolean property schema");
            continue;
        }
        match translate_schema(node) {
            Ok(schema) => {
                translated.insert(key.clone(), schema);
            }
            Err(reason) => {
                warn!(property = key.as_str(), %reason, "Skipping untranslatable property");
            }
        }
    }
    translated
}

fn translate_items(object: &SchemaObject) -> Option<Box<ParamSchema>> {
    match object.items.as_ref()? {
        ItemsSpec::Single(node) => match translate_schema(node) {
            Ok(schema) => Some(Box::new(schema)),
            Err(reason) => {
                warn!(%reason, "Array items are not translatable, leaving them unconstrained");
                None
            }
        },
        ItemsSpec::Tuple(_) => {
            warn!("Tuple-typed array items are not supported, leaving them unconstrained");
            None
        }
        ItemsSpec::Malformed(raw) => {
            warn!(items = %raw, "Malformed array items, leaving them unconstrained");
            None
        }
    }
}

fn stringify_enum(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect()
}
