use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use uuid::Uuid;

/// One configured MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub name: String,
    pub url: String,
    #[serde(default, rename = "default")]
    pub is_default: bool,
}

impl ServerDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            is_default: false,
        }
    }
}

/// Role of a user-facing transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Tool => "tool",
        }
    }

}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            "tool" => Ok(MessageRole::Tool),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallInfo {
    pub name: String,
    pub args: Map<String, Value>,
    pub status: ToolCallStatus,
    pub result: Option<Value>,
}

/// User-facing transcript entry owned by the chat facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub parts: Option<Vec<Part>>,
    pub tool_call: Option<ToolCallInfo>,
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg-{}", Uuid::new_v4()),
            role,
            content: content.into(),
            parts: None,
            tool_call: None,
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    pub fn error(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(role, content)
        }
    }

    pub fn with_parts(mut self, parts: Vec<Part>) -> Self {
        self.parts = Some(parts);
        self
    }

    pub fn with_tool_call(mut self, info: ToolCallInfo) -> Self {
        self.tool_call = Some(info);
        self
    }
}

/// Author of one entry in the provider-neutral LLM history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64 (standard alphabet) payload
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    /// Opaque provider token that must be echoed back with the call in history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
            signature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(Blob),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

impl Part {
    pub fn text(value: impl Into<String>) -> Self {
        Part::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: ChatRole,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: ChatRole::User,
            parts,
        }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: ChatRole::Model,
            parts,
        }
    }
}

/// Payload of a single send to the LLM: the user's text or a structured part list.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnContent {
    Text(String),
    Parts(Vec<Part>),
}

impl TurnContent {
    pub fn into_parts(self) -> Vec<Part> {
        match self {
            TurnContent::Text(text) => vec![Part::Text(text)],
            TurnContent::Parts(parts) => parts,
        }
    }

    pub fn parts(&self) -> Vec<Part> {
        self.clone().into_parts()
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TurnContent::Text(text) => text.trim().is_empty(),
            TurnContent::Parts(parts) => parts.is_empty(),
        }
    }
}

impl Default for TurnContent {
    fn default() -> Self {
        TurnContent::Text(String::new())
    }
}

impl From<String> for TurnContent {
    fn from(value: String) -> Self {
        TurnContent::Text(value)
    }
}

impl From<&str> for TurnContent {
    fn from(value: &str) -> Self {
        TurnContent::Text(value.to_string())
    }
}
