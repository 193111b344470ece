//! Chat facade tying the server list, tool discovery, the turn orchestrator
//! and the LLM session together.

use crate::application::discovery::{DiscoveryCoordinator, DiscoverySummary, ToolRegistry};
use crate::application::events::{ChatEvent, EventBus};
use crate::application::input::prepare_user_content;
use crate::application::orchestrator::{
    EXHAUSTED_MESSAGE, TurnError, TurnErrorKind, TurnObserver, TurnOrchestrator, TurnOutcome,
};
use crate::application::tooling::{HttpTransport, ToolTransport};
use crate::config::{AppConfig, ConfigError, ServerStore, ServerStoreError};
use crate::domain::{
    ConversationMessage, MessageRole, ServerDescriptor, ToolCallInfo, ToolCallStatus, TurnContent,
};
use crate::infrastructure::model::{GeminiSession, ModelSession};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info};

const EMPTY_REPLY_MESSAGE: &str = "Assistant did not provide a text response.";

pub struct ChatController<S: ModelSession> {
    session: S,
    store: ServerStore,
    discovery: DiscoveryCoordinator,
    orchestrator: TurnOrchestrator,
    registry: Arc<ToolRegistry>,
    last_discovery: DiscoverySummary,
    messages: Vec<ConversationMessage>,
    events: EventBus,
}

impl ChatController<GeminiSession> {
    /// Gemini session, HTTP transport and the server list named by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = ServerStore::from_config_path(config.servers_file.as_deref())?;
        let timeout = config.orchestrator.request_timeout();
        let transport: Arc<dyn ToolTransport> = Arc::new(HttpTransport::new(timeout));

        let discovery = DiscoveryCoordinator::new(Arc::clone(&transport))
            .with_mode(config.discovery.mode)
            .with_timeout(timeout);
        let orchestrator = TurnOrchestrator::new(transport)
            .with_max_attempts(config.orchestrator.max_attempts)
            .with_call_timeout(timeout);

        Ok(Self::with_parts(
            GeminiSession::from_config(config),
            store,
            discovery,
            orchestrator,
        ))
    }
}

impl<S: ModelSession> ChatController<S> {
    /// Controller with default discovery and orchestration over `transport`.
    pub fn new(session: S, store: ServerStore, transport: Arc<dyn ToolTransport>) -> Self {
        let discovery = DiscoveryCoordinator::new(Arc::clone(&transport));
        let orchestrator = TurnOrchestrator::new(transport);
        Self::with_parts(session, store, discovery, orchestrator)
    }

    pub fn with_parts(
        session: S,
        store: ServerStore,
        discovery: DiscoveryCoordinator,
        orchestrator: TurnOrchestrator,
    ) -> Self {
        Self {
            session,
            store,
            discovery,
            orchestrator,
            registry: Arc::new(ToolRegistry::empty()),
            last_discovery: DiscoverySummary::default(),
            messages: Vec::new(),
            events: EventBus::new(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn discovered_tools(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn last_discovery(&self) -> &DiscoverySummary {
        &self.last_discovery
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn list_servers(&self) -> Vec<ServerDescriptor> {
        self.store.list()
    }

    pub fn server(&self, name: &str) -> Option<ServerDescriptor> {
        self.store.get(name)
    }

    pub fn default_server(&self) -> Option<ServerDescriptor> {
        self.store.default_server()
    }

    pub fn set_default_server(&mut self, name: &str) -> Result<(), ServerStoreError> {
        self.store.set_default(name)
    }

    /// Add a server and refresh the tool set.
    pub async fn add_server(
        &mut self,
        name: &str,
        url: &str,
    ) -> Result<ServerDescriptor, ServerStoreError> {
        let added = self.store.add(name, url)?;
        self.rediscover_tools().await;
        Ok(added)
    }

    /// Remove a server and refresh the tool set.
    pub async fn remove_server(&mut self, name: &str) -> Result<ServerDescriptor, ServerStoreError> {
        let removed = self.store.remove(name)?;
        self.rediscover_tools().await;
        Ok(removed)
    }

    /// Rebuild the tool registry from scratch over every configured server.
    pub async fn rediscover_tools(&mut self) -> DiscoverySummary {
        let servers = self.store.list();
        let (registry, summary) = if servers.is_empty() {
            info!("No MCP servers configured; clearing tools");
            (ToolRegistry::empty(), DiscoverySummary::default())
        } else {
            let outcome = self
                .discovery
                .discover(&servers, &ToolRegistry::empty())
                .await;
            for report in outcome.servers.iter().filter(|r| !r.status.is_success()) {
                debug!(server = %report.name, status = ?report.status, "Server contributed no tools");
            }
            (outcome.registry, outcome.summary)
        };

        self.registry = Arc::new(registry);
        self.last_discovery = summary.clone();
        self.session
            .set_available_functions(self.registry.declarations());
        self.events
            .emit(&ChatEvent::ToolDiscoveryUpdated(Arc::clone(&self.registry)));
        summary
    }

    /// Run one user turn. Blank input with no attachments is ignored and
    /// yields `None`.
    pub async fn send_message(
        &mut self,
        text: &str,
        attachments: &[PathBuf],
    ) -> Option<TurnOutcome> {
        let content = prepare_user_content(text, attachments).await;
        if content.is_empty() {
            debug!("Ignoring empty user input");
            return None;
        }

        let mut user = ConversationMessage::new(MessageRole::User, text);
        if let TurnContent::Parts(parts) = &content {
            user = user.with_parts(parts.clone());
        }
        self.record(user);

        let recorder = TurnRecorder::new(&self.events);
        let turn = self
            .orchestrator
            .run_turn(&mut self.session, &self.registry, &recorder, content);
        let outcome = match AssertUnwindSafe(turn).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(%message, "Turn panicked");
                TurnOutcome::Failed(message)
            }
        };
        let tool_messages = recorder.into_messages();
        self.messages.extend(tool_messages);

        let reply = match &outcome {
            TurnOutcome::Text(text) => ConversationMessage::new(MessageRole::Assistant, text),
            TurnOutcome::Exhausted => {
                ConversationMessage::new(MessageRole::Assistant, EXHAUSTED_MESSAGE)
            }
            TurnOutcome::Blocked { reason, detail } => {
                let content = format!(
                    "Assistant's response was blocked: {reason}. {}",
                    detail.as_deref().unwrap_or_default()
                );
                ConversationMessage::error(MessageRole::System, content.trim_end())
            }
            TurnOutcome::Empty => ConversationMessage::error(MessageRole::System, EMPTY_REPLY_MESSAGE),
            TurnOutcome::TransportError(_) | TurnOutcome::Failed(_) => {
                ConversationMessage::error(MessageRole::System, outcome.user_message())
            }
        };
        self.record(reply);

        match &outcome {
            TurnOutcome::TransportError(err) => {
                self.events.emit(&ChatEvent::TurnError(err.clone()));
            }
            TurnOutcome::Failed(message) => {
                let err = TurnError::new(TurnErrorKind::Unknown, message.clone());
                self.events.emit(&ChatEvent::TurnError(err));
            }
            _ => {}
        }

        Some(outcome)
    }

    /// Forget the LLM history and the transcript. Servers and tools stay.
    pub fn reset_session(&mut self) {
        self.session.reset();
        self.messages.clear();
        info!("Chat session reset");
    }

    fn record(&mut self, message: ConversationMessage) {
        self.events.emit(&ChatEvent::Message(message.clone()));
        self.messages.push(message);
    }
}

/// Forwards tool-call hooks to the bus and turns them into transcript
/// entries as they happen.
struct TurnRecorder<'a> {
    events: &'a EventBus,
    messages: Mutex<Vec<ConversationMessage>>,
}

impl<'a> TurnRecorder<'a> {
    fn new(events: &'a EventBus) -> Self {
        Self {
            events,
            messages: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, message: ConversationMessage) {
        self.events.emit(&ChatEvent::Message(message.clone()));
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    fn into_messages(self) -> Vec<ConversationMessage> {
        self.messages
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl TurnObserver for TurnRecorder<'_> {
    fn tool_call_starting(&self, name: &str, args: &Map<String, Value>) {
        self.events.tool_call_starting(name, args);
        let rendered = Value::Object(args.clone());
        self.push(
            ConversationMessage::new(
                MessageRole::System,
                format!("Attempting to call tool: {name} with args: {rendered}"),
            )
            .with_tool_call(ToolCallInfo {
                name: name.to_string(),
                args: args.clone(),
                status: ToolCallStatus::Pending,
                result: None,
            }),
        );
    }

    fn tool_call_ended(&self, name: &str, result: &Value, success: bool) {
        self.events.tool_call_ended(name, result, success);
        let verdict = if success { "succeeded" } else { "failed" };
        let status = if success {
            ToolCallStatus::Success
        } else {
            ToolCallStatus::Error
        };
        self.push(
            ConversationMessage::new(
                MessageRole::Tool,
                format!("Tool {name} {verdict}. Result: {result}"),
            )
            .with_tool_call(ToolCallInfo {
                name: name.to_string(),
                args: Map::new(),
                status,
                result: Some(result.clone()),
            }),
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected failure during turn".to_string()
    }
}
