use thiserror::Error;

/// Transport-level failures talking to an MCP server. Provider-level tool
/// failures are not errors; they arrive as `ToolResult { is_error: true, .. }`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid MCP server URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error("MCP server '{server}' request failed: {source}")]
    Http {
        server: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("MCP server '{server}' answered HTTP {status}: {body}")]
    Status {
        server: String,
        status: u16,
        body: String,
    },
    #[error("MCP server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' sent no response to request {request_id}")]
    MissingResponse { server: String, request_id: u64 },
    #[error("MCP server '{server}' timed out during {operation}")]
    Timeout { server: String, operation: String },
    #[error("connection to MCP server '{server}' is closed")]
    Closed { server: String },
}

impl TransportError {
    pub fn timeout(server: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Timeout {
            server: server.into(),
            operation: operation.into(),
        }
    }

    pub fn server(&self) -> &str {
        match self {
            TransportError::InvalidUrl { url, .. } => url,
            TransportError::Http { server, .. }
            | TransportError::Status { server, .. }
            | TransportError::InvalidJson { server, .. }
            | TransportError::Rpc { server, .. }
            | TransportError::MissingResponse { server, .. }
            | TransportError::Timeout { server, .. }
            | TransportError::Closed { server } => server,
        }
    }
}
