//! In-memory collaborators used by the unit tests.

use crate::application::orchestrator::TurnObserver;
use crate::application::schema::FunctionDeclaration;
use crate::application::tooling::{
    RawToolDescriptor, ToolConnection, ToolResult, ToolTransport, TransportError,
};
use crate::domain::{Content, TurnContent};
use crate::infrastructure::model::{LlmResponse, ModelError, ModelSession};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Longer than any timeout the tests configure.
const STALL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    pub tools: Vec<RawToolDescriptor>,
    pub refuse: bool,
    /// Tools whose calls fail at the transport level
    pub broken_tools: HashSet<String>,
    /// Tools answering with a provider-level error
    pub erroring_tools: HashSet<String>,
    pub stall_connect: bool,
    pub stall_listing: bool,
    /// Tools whose calls never answer
    pub stalled_tools: HashSet<String>,
}

impl FakeServer {
    pub fn with_tools(tools: Vec<RawToolDescriptor>) -> Self {
        Self {
            tools,
            ..Self::default()
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn broken(mut self, tool: &str) -> Self {
        self.broken_tools.insert(tool.to_string());
        self
    }

    pub fn erroring(mut self, tool: &str) -> Self {
        self.erroring_tools.insert(tool.to_string());
        self
    }

    pub fn stalling_connect(mut self) -> Self {
        self.stall_connect = true;
        self
    }

    pub fn stalling_listing(mut self) -> Self {
        self.stall_listing = true;
        self
    }

    pub fn stalling(mut self, tool: &str) -> Self {
        self.stalled_tools.insert(tool.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    servers: HashMap<String, FakeServer>,
    log: Vec<String>,
    open: usize,
}

/// Records `connect <url>`, `call <url> <tool> <args>` and `close <url>`.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn with_server(self, url: &str, server: FakeServer) -> Self {
        self.state
            .lock()
            .expect("fake state")
            .servers
            .insert(url.to_string(), server);
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().expect("fake state").log.clone()
    }

    pub fn open_connections(&self) -> usize {
        self.state.lock().expect("fake state").open
    }
}

#[async_trait]
impl ToolTransport for FakeTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn ToolConnection>, TransportError> {
        let server = {
            let mut state = self.state.lock().expect("fake state");
            state.log.push(format!("connect {url}"));
            state.servers.get(url).cloned()
        };
        let server = match server {
            Some(server) if !server.refuse => server,
            _ => {
                return Err(TransportError::Closed {
                    server: url.to_string(),
                });
            }
        };
        if server.stall_connect {
            tokio::time::sleep(STALL).await;
        }
        self.state.lock().expect("fake state").open += 1;
        Ok(Box::new(FakeConnection {
            url: url.to_string(),
            server,
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

struct FakeConnection {
    url: String,
    server: FakeServer,
    state: Arc<Mutex<FakeState>>,
    closed: bool,
}

#[async_trait]
impl ToolConnection for FakeConnection {
    async fn list_tools(&mut self) -> Vec<RawToolDescriptor> {
        if self.server.stall_listing {
            tokio::time::sleep(STALL).await;
        }
        self.server.tools.clone()
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, TransportError> {
        let args = Value::Object(arguments);
        self.state
            .lock()
            .expect("fake state")
            .log
            .push(format!("call {} {name} {args}", self.url));

        if self.server.stalled_tools.contains(name) {
            tokio::time::sleep(STALL).await;
        }
        if self.server.broken_tools.contains(name) {
            return Err(TransportError::Closed {
                server: self.url.clone(),
            });
        }
        if self.server.erroring_tools.contains(name) {
            return Ok(ToolResult::error_text(format!("{name} failed")));
        }
        Ok(ToolResult {
            content: vec![json!({"type": "text", "text": format!("{name} ok")})],
            is_error: false,
            structured_content: Some(json!({"tool": name, "args": args})),
        })
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut state = self.state.lock().expect("fake state");
        state.open -= 1;
        state.log.push(format!("close {}", self.url));
    }
}

/// Model session that replays canned replies and records what it was sent.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    replies: VecDeque<Result<LlmResponse, ModelError>>,
    fallback: Option<LlmResponse>,
    pub sent: Vec<TurnContent>,
    pub declarations: Vec<FunctionDeclaration>,
    history: Vec<Content>,
}

impl ScriptedSession {
    pub fn new(replies: Vec<Result<LlmResponse, ModelError>>) -> Self {
        Self {
            replies: replies.into(),
            ..Self::default()
        }
    }

    /// Answers every send with `reply`.
    pub fn repeating(reply: LlmResponse) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ModelSession for ScriptedSession {
    async fn send(&mut self, content: TurnContent) -> Result<LlmResponse, ModelError> {
        self.sent.push(content.clone());
        let reply = match self.replies.pop_front() {
            Some(reply) => reply,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ModelError::invalid_response("scripted", "script exhausted")),
        };
        if reply.is_ok() {
            self.history.push(Content::user(content.into_parts()));
        }
        reply
    }

    fn set_available_functions(&mut self, declarations: Vec<FunctionDeclaration>) {
        self.declarations = declarations;
    }

    fn history(&self) -> &[Content] {
        &self.history
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    started: Mutex<Vec<String>>,
    ended: Mutex<Vec<(String, bool)>>,
}

impl RecordingObserver {
    pub fn started(&self) -> Vec<String> {
        self.started.lock().expect("observer").clone()
    }

    pub fn ended(&self) -> Vec<(String, bool)> {
        self.ended.lock().expect("observer").clone()
    }
}

impl TurnObserver for RecordingObserver {
    fn tool_call_starting(&self, name: &str, _args: &Map<String, Value>) {
        self.started.lock().expect("observer").push(name.to_string());
    }

    fn tool_call_ended(&self, name: &str, _result: &Value, success: bool) {
        self.ended
            .lock()
            .expect("observer")
            .push((name.to_string(), success));
    }
}
