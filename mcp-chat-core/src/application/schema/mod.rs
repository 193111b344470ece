//! # Schema Translation
//!
//! Converts the JSON-Schema-like `inputSchema` an MCP server publishes for a
//! tool into the stricter parameter schema Gemini function declarations
//! accept.
//!
//! Translation is total: nodes that have no Gemini counterpart (boolean
//! schemas, `null`-only types, unknown type names) are dropped with a log
//! line instead of failing the surrounding object. Only the root of a tool
//! schema is held to a hard rule: it must be a plain `"object"`.
//!
//! `required` lists are passed through untouched, even when they name a
//! property that was dropped.

mod node;
mod param;
mod translate;

pub use node::{ItemsSpec, JsonSchemaNode, SchemaObject, TypeSpec};
pub use param::{FunctionDeclaration, ObjectSchema, ParamSchema, SchemaType};
pub use translate::{
    SchemaSkip, resolve_type, translate_input_schema, translate_properties, translate_schema,
};
