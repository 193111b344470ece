use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::error::TransportError;
use crate::application::schema::JsonSchemaNode;

/// A tool as an MCP server describes it in `tools/list`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default)]
    pub annotations: Option<ToolAnnotations>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ToolAnnotations {
    #[serde(default)]
    pub title: Option<String>,
}

impl RawToolDescriptor {
    pub fn new(name: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            title: None,
            input_schema,
            annotations: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn schema(&self) -> Option<JsonSchemaNode> {
        JsonSchemaNode::from_value(&self.input_schema)
    }

    /// Human-readable title, preferring the top-level field over annotations.
    pub fn display_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or_else(|| self.annotations.as_ref().and_then(|a| a.title.as_deref()))
            .filter(|title| !title.trim().is_empty())
    }
}

/// Outcome of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![json!({"type": "text", "text": text.into()})],
            is_error: false,
            structured_content: None,
        }
    }

    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Concatenated text blocks, for display.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Opens connections to MCP servers.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn ToolConnection>, TransportError>;
}

/// One open connection to one MCP server. Used for a single operation and
/// then closed.
#[async_trait]
pub trait ToolConnection: Send {
    /// Tools offered by the server. Listing failures are logged and yield an
    /// empty list.
    async fn list_tools(&mut self) -> Vec<RawToolDescriptor>;

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, TransportError>;

    /// Idempotent.
    async fn close(&mut self);
}
