//! Synchronous event bus for the chat facade.
//!
//! Listeners are grouped by [`EventKind`] and invoked in subscription order.
//! A panicking listener is logged and skipped; the emitter and the remaining
//! listeners are unaffected.

use crate::application::discovery::ToolRegistry;
use crate::application::orchestrator::{TurnError, TurnObserver};
use crate::domain::ConversationMessage;
use serde_json::{Map, Value};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    ToolDiscoveryUpdated,
    ToolCallStarting,
    ToolCallEnded,
    TurnError,
}

#[derive(Debug, Clone)]
pub enum ChatEvent {
    Message(ConversationMessage),
    ToolDiscoveryUpdated(Arc<ToolRegistry>),
    ToolCallStarting {
        name: String,
        args: Map<String, Value>,
    },
    ToolCallEnded {
        name: String,
        result: Value,
        success: bool,
    },
    TurnError(TurnError),
}

impl ChatEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChatEvent::Message(_) => EventKind::Message,
            ChatEvent::ToolDiscoveryUpdated(_) => EventKind::ToolDiscoveryUpdated,
            ChatEvent::ToolCallStarting { .. } => EventKind::ToolCallStarting,
            ChatEvent::ToolCallEnded { .. } => EventKind::ToolCallEnded,
            ChatEvent::TurnError(_) => EventKind::TurnError,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&ChatEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    listener: Listener,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

/// Cloneable handle; clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
    state: Arc<Mutex<BusState>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&ChatEvent) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.subscriptions.push(Subscription {
            id,
            kind,
            listener: Arc::new(listener),
        });
        debug!(?kind, id = id.0, "Listener subscribed");
        id
    }

    /// Returns `false` when the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|sub| sub.id != id);
        before != state.subscriptions.len()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.lock()
            .subscriptions
            .iter()
            .filter(|sub| sub.kind == kind)
            .count()
    }

    pub fn emit(&self, event: &ChatEvent) {
        let kind = event.kind();
        // Snapshot so listeners may subscribe or unsubscribe while running.
        let listeners: Vec<Listener> = self
            .lock()
            .subscriptions
            .iter()
            .filter(|sub| sub.kind == kind)
            .map(|sub| Arc::clone(&sub.listener))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(?kind, "Event listener panicked");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TurnObserver for EventBus {
    fn tool_call_starting(&self, name: &str, args: &Map<String, Value>) {
        self.emit(&ChatEvent::ToolCallStarting {
            name: name.to_string(),
            args: args.clone(),
        });
    }

    fn tool_call_ended(&self, name: &str, result: &Value, success: bool) {
        self.emit(&ChatEvent::ToolCallEnded {
            name: name.to_string(),
            result: result.clone(),
            success,
        });
    }
}
