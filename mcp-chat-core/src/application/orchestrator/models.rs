use super::errors::TurnError;
use crate::domain::{FunctionCall, TurnContent};
use serde_json::{Map, Value};

pub const EXHAUSTED_MESSAGE: &str =
    "I tried several times, but I'm having trouble completing your request with tools.";
pub const EMPTY_MESSAGE: &str = "I received a response, but it was empty.";

/// How a user turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Text(String),
    Blocked {
        reason: String,
        detail: Option<String>,
    },
    Empty,
    /// Attempt ceiling reached while the model kept requesting tools
    Exhausted,
    TransportError(TurnError),
    /// Unexpected internal failure (a panic inside the turn)
    Failed(String),
}

impl TurnOutcome {
    /// Text shown to the user for this outcome.
    pub fn user_message(&self) -> String {
        match self {
            TurnOutcome::Text(text) => text.clone(),
            TurnOutcome::Blocked { reason, .. } => {
                format!("I'm sorry, your request was blocked: {reason}.")
            }
            TurnOutcome::Empty => EMPTY_MESSAGE.to_string(),
            TurnOutcome::Exhausted => EXHAUSTED_MESSAGE.to_string(),
            TurnOutcome::TransportError(err) => format!("Error: {}", err.user_message()),
            TurnOutcome::Failed(message) => format!("Error: {message}"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TurnOutcome::TransportError(_) | TurnOutcome::Failed(_)
        )
    }
}

/// Per-turn bookkeeping: what to send next and how many sends were made.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnAttemptState {
    pub pending: TurnContent,
    pub attempt: u32,
    pub max_attempts: u32,
}

impl TurnAttemptState {
    pub fn new(pending: TurnContent, max_attempts: u32) -> Self {
        Self {
            pending,
            attempt: 0,
            max_attempts,
        }
    }

    /// Count a new iteration. `false` once the ceiling is exceeded.
    pub fn begin_attempt(&mut self) -> bool {
        self.attempt += 1;
        self.attempt <= self.max_attempts
    }

    pub fn take_pending(&mut self) -> TurnContent {
        std::mem::take(&mut self.pending)
    }
}

/// Phase of the turn loop.
#[derive(Debug)]
pub enum TurnState {
    Sending,
    AwaitingToolResults(Vec<FunctionCall>),
    Done(TurnOutcome),
}

/// Receives tool-call notifications while a turn runs. Both hooks are
/// synchronous and must not block.
pub trait TurnObserver: Send + Sync {
    /// Fired once per batch, for the batch's first call.
    fn tool_call_starting(&self, _name: &str, _args: &Map<String, Value>) {}

    /// Fired for every call once its result is known.
    fn tool_call_ended(&self, _name: &str, _result: &Value, _success: bool) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl TurnObserver for NoopObserver {}
