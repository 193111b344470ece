//! Turn orchestration.
//!
//! A turn moves through `Sending` → `AwaitingToolResults` → `Sending` … until
//! it reaches `Done`. Every entry into `Sending` counts as one attempt; the
//! turn ends as [`TurnOutcome::Exhausted`] once the attempt ceiling is passed,
//! so a model that keeps requesting tools is sent to exactly
//! `max_attempts` times.
//!
//! Tool failures never end a turn. They are fed back to the model as
//! `{"error": ...}` function responses. Only a failed send to the model does.

mod errors;
mod models;
mod runner;

pub use errors::{TurnError, TurnErrorKind};
pub use models::{
    EMPTY_MESSAGE, EXHAUSTED_MESSAGE, NoopObserver, TurnAttemptState, TurnObserver, TurnOutcome,
    TurnState,
};
pub use runner::TurnOrchestrator;
