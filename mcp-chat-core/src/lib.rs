//! Core of the MCP chat client: discovers tools on MCP servers, exposes them
//! to Gemini as function declarations and runs the function-calling loop.

pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::controller::ChatController;
pub use application::events::{ChatEvent, EventBus, EventKind, SubscriptionId};
pub use application::{discovery, orchestrator, schema, tooling};
pub use config::{AppConfig, ServerStore};
pub use domain::types;
pub use infrastructure::model;
