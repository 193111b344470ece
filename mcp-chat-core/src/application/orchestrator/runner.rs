use super::errors::TurnError;
use super::models::{TurnAttemptState, TurnObserver, TurnOutcome, TurnState};
use crate::application::discovery::{ToolMapping, ToolRegistry};
use crate::application::tooling::{ToolResult, ToolTransport, TransportError};
use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::domain::{FunctionCall, FunctionResponse, Part, TurnContent};
use crate::infrastructure::model::{LlmResponse, ModelSession};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Drives one user turn: send, run requested tools, feed results back,
/// until the model answers or the attempt ceiling is hit.
#[derive(Clone)]
pub struct TurnOrchestrator {
    transport: Arc<dyn ToolTransport>,
    max_attempts: u32,
    call_timeout: Duration,
}

impl TurnOrchestrator {
    pub fn new(transport: Arc<dyn ToolTransport>) -> Self {
        Self {
            transport,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            call_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Bound on each connect, tool call and close.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn run_turn<S>(
        &self,
        session: &mut S,
        registry: &ToolRegistry,
        observer: &dyn TurnObserver,
        content: TurnContent,
    ) -> TurnOutcome
    where
        S: ModelSession + ?Sized,
    {
        let mut state = TurnAttemptState::new(content, self.max_attempts);
        let mut phase = TurnState::Sending;

        loop {
            phase = match phase {
                TurnState::Sending => self.send(session, &mut state).await,
                TurnState::AwaitingToolResults(calls) => {
                    state.pending = self.execute_calls(calls, registry, observer).await;
                    TurnState::Sending
                }
                TurnState::Done(outcome) => {
                    debug!(attempts = state.attempt, "Turn finished");
                    return outcome;
                }
            };
        }
    }

    async fn send<S>(&self, session: &mut S, state: &mut TurnAttemptState) -> TurnState
    where
        S: ModelSession + ?Sized,
    {
        if !state.begin_attempt() {
            error!(
                max_attempts = state.max_attempts,
                "Exceeded maximum tool call attempts"
            );
            return TurnState::Done(TurnOutcome::Exhausted);
        }
        debug!(attempt = state.attempt, "Sending turn content to model");

        match session.send(state.take_pending()).await {
            Ok(response) if response.has_function_calls() => {
                info!(
                    attempt = state.attempt,
                    calls = response.function_calls.len(),
                    "Model requested function calls"
                );
                TurnState::AwaitingToolResults(response.function_calls)
            }
            Ok(response) => TurnState::Done(final_outcome(response)),
            Err(err) => {
                let classified = TurnError::classify(&err);
                error!(attempt = state.attempt, %err, kind = %classified.kind, "Model request failed");
                TurnState::Done(TurnOutcome::TransportError(classified))
            }
        }
    }

    /// Run every call in order and package the results as the next send.
    async fn execute_calls(
        &self,
        calls: Vec<FunctionCall>,
        registry: &ToolRegistry,
        observer: &dyn TurnObserver,
    ) -> TurnContent {
        if let Some(first) = calls.first() {
            observer.tool_call_starting(&first.name, &first.args);
        }

        let mut responses = Vec::with_capacity(calls.len());
        for call in calls {
            let (response, success) = self.execute_call(&call, registry).await;
            observer.tool_call_ended(&call.name, &response, success);
            responses.push(Part::FunctionResponse(FunctionResponse {
                name: call.name,
                response,
            }));
        }
        TurnContent::Parts(responses)
    }

    async fn execute_call(&self, call: &FunctionCall, registry: &ToolRegistry) -> (Value, bool) {
        let Some(mapping) = registry.find(&call.name) else {
            warn!(function = %call.name, "Model requested a function that is not mapped");
            return (
                error_payload(format!(
                    "Function {} is not implemented or mapped.",
                    call.name
                )),
                false,
            );
        };

        info!(
            function = %call.name,
            server = %mapping.server_name,
            tool = %mapping.tool_name,
            "Calling MCP tool"
        );
        match self.invoke(mapping, call.args.clone()).await {
            Ok(result) => {
                let success = !result.is_error;
                if !success {
                    warn!(tool = %mapping.tool_name, "MCP tool reported an error");
                }
                let value = serde_json::to_value(&result)
                    .unwrap_or_else(|err| error_payload(err.to_string()));
                (value, success)
            }
            Err(err) => {
                warn!(
                    server = %mapping.server_name,
                    tool = %mapping.tool_name,
                    %err,
                    "MCP tool call failed"
                );
                (
                    error_payload(format!(
                        "Error executing MCP tool {}: {err}",
                        mapping.tool_name
                    )),
                    false,
                )
            }
        }
    }

    /// Connect, call, close. The connection is closed whether or not the
    /// call succeeded.
    async fn invoke(
        &self,
        mapping: &ToolMapping,
        args: Map<String, Value>,
    ) -> Result<ToolResult, TransportError> {
        let mut connection = timeout(self.call_timeout, self.transport.connect(&mapping.server_url))
            .await
            .map_err(|_| TransportError::timeout(&mapping.server_name, "connect"))??;

        let result = match timeout(
            self.call_timeout,
            connection.call_tool(&mapping.tool_name, args),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::timeout(
                &mapping.server_name,
                format!("tools/call {}", mapping.tool_name),
            )),
        };

        if timeout(self.call_timeout, connection.close()).await.is_err() {
            debug!(server = %mapping.server_name, "Timed out closing MCP connection");
        }
        result
    }
}

fn final_outcome(response: LlmResponse) -> TurnOutcome {
    match (response.text, response.block) {
        (Some(text), _) => TurnOutcome::Text(text),
        (None, Some(block)) => {
            warn!(reason = %block.reason, detail = ?block.detail, "Model response was blocked");
            TurnOutcome::Blocked {
                reason: block.reason,
                detail: block.detail,
            }
        }
        (None, None) => {
            warn!(finish_reason = ?response.finish_reason, "Model response had no text");
            TurnOutcome::Empty
        }
    }
}

fn error_payload(message: String) -> Value {
    json!({ "error": message })
}
