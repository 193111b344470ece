use super::error::TransportError;
use super::interface::{RawToolDescriptor, ToolConnection, ToolResult, ToolTransport};
use super::sse;
use crate::constants::{MAX_TOOL_LIST_PAGES, MCP_PROTOCOL_VERSION};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, warn};

pub const SESSION_HEADER: &str = "Mcp-Session-Id";
pub const PROTOCOL_HEADER: &str = "MCP-Protocol-Version";
const ACCEPT_VALUE: &str = "application/json, text/event-stream";

/// Streamable-HTTP MCP transport. Every `connect` performs a fresh
/// `initialize` handshake; connections are never pooled.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(Client::new(), timeout)
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ToolTransport for HttpTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn ToolConnection>, TransportError> {
        let endpoint = Url::parse(url).map_err(|err| TransportError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        let mut connection = HttpConnection::new(self.client.clone(), endpoint, self.timeout);
        if let Err(err) = connection.initialize().await {
            connection.close().await;
            return Err(err);
        }
        Ok(Box::new(connection))
    }
}

pub struct HttpConnection {
    client: Client,
    endpoint: Url,
    label: String,
    timeout: Duration,
    session_id: Option<String>,
    protocol_version: Option<String>,
    next_id: u64,
    closed: bool,
}

impl HttpConnection {
    fn new(client: Client, endpoint: Url, timeout: Duration) -> Self {
        Self {
            client,
            label: endpoint.to_string(),
            endpoint,
            timeout,
            session_id: None,
            protocol_version: None,
            next_id: 1,
            closed: false,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    async fn initialize(&mut self) -> Result<(), TransportError> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        let result = self.request("initialize", params).await?;
        let negotiated = result
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(MCP_PROTOCOL_VERSION);
        self.protocol_version = Some(negotiated.to_string());
        debug!(
            server = %self.label,
            session = ?self.session_id,
            protocol = negotiated,
            "MCP session initialized"
        );

        self.notify("notifications/initialized", json!({})).await
    }

    fn post(&self, payload: &Value) -> RequestBuilder {
        let builder = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, ACCEPT_VALUE)
            .timeout(self.timeout)
            .json(payload);
        self.with_session_headers(builder)
    }

    fn with_session_headers(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if let Some(session) = &self.session_id {
            builder = builder.header(SESSION_HEADER, session);
        }
        if let Some(version) = &self.protocol_version {
            builder = builder.header(PROTOCOL_HEADER, version);
        }
        builder
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed {
                server: self.label.clone(),
            });
        }
        Ok(())
    }

    fn remember_session(&mut self, response: &Response) {
        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            self.session_id = Some(session.to_string());
        }
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, TransportError> {
        self.ensure_open()?;
        let id = self.next_id;
        self.next_id += 1;

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        debug!(server = %self.label, method, request_id = id, "Sending MCP request");

        let response = self
            .post(&payload)
            .send()
            .await
            .map_err(|source| http_error(&self.label, source))?;
        self.remember_session(&response);

        let status = response.status();
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/event-stream"));
        let body = response
            .text()
            .await
            .map_err(|source| http_error(&self.label, source))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                server: self.label.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let message = if is_stream {
            sse::find_response(sse::json_messages(&body), id)
        } else {
            match serde_json::from_str::<Value>(&body) {
                Ok(Value::Array(batch)) => sse::find_response(batch, id),
                Ok(single) => Some(single),
                Err(source) => {
                    return Err(TransportError::InvalidJson {
                        server: self.label.clone(),
                        source,
                    });
                }
            }
        };
        let message = message.ok_or_else(|| TransportError::MissingResponse {
            server: self.label.clone(),
            request_id: id,
        })?;

        if let Some(error) = message.get("error") {
            return Err(TransportError::Rpc {
                server: self.label.clone(),
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }
        Ok(message.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<(), TransportError> {
        self.ensure_open()?;
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        let response = self
            .post(&payload)
            .send()
            .await
            .map_err(|source| http_error(&self.label, source))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                server: self.label.clone(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn fetch_tools(&mut self) -> Result<Vec<RawToolDescriptor>, TransportError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_LIST_PAGES {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;

            for entry in result
                .get("tools")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                match serde_json::from_value::<RawToolDescriptor>(entry.clone()) {
                    Ok(tool) => tools.push(tool),
                    Err(err) => warn!(server = %self.label, %err, "Skipping malformed tool entry"),
                }
            }

            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                return Ok(tools);
            }
        }

        warn!(
            server = %self.label,
            pages = MAX_TOOL_LIST_PAGES,
            "Stopped following tools/list pagination"
        );
        Ok(tools)
    }
}

#[async_trait]
impl ToolConnection for HttpConnection {
    async fn list_tools(&mut self) -> Vec<RawToolDescriptor> {
        match self.fetch_tools().await {
            Ok(tools) => tools,
            Err(err) => {
                warn!(server = %self.label, %err, "Failed to list tools");
                Vec::new()
            }
        }
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, TransportError> {
        let params = json!({
            "name": name,
            "arguments": Value::Object(arguments)
        });
        match self.request("tools/call", params).await {
            Ok(result) => {
                serde_json::from_value(result).map_err(|source| TransportError::InvalidJson {
                    server: self.label.clone(),
                    source,
                })
            }
            Err(TransportError::Rpc { message, .. }) => Ok(ToolResult::error_text(format!(
                "Error calling MCP tool {name}: {message}"
            ))),
            Err(other) => Err(other),
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if self.session_id.is_none() {
            return;
        }
        let request = self.with_session_headers(
            self.client
                .delete(self.endpoint.clone())
                .timeout(self.timeout),
        );
        match request.send().await {
            Ok(response) => {
                debug!(server = %self.label, status = %response.status(), "Closed MCP session")
            }
            Err(err) => debug!(server = %self.label, %err, "Failed to close MCP session"),
        }
        self.session_id = None;
    }
}

fn http_error(server: &str, source: reqwest::Error) -> TransportError {
    if source.is_timeout() {
        return TransportError::timeout(server, "request");
    }
    TransportError::Http {
        server: server.to_string(),
        source,
    }
}
