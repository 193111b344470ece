//! Model traits

use super::types::{LlmResponse, ModelError};
use crate::application::schema::FunctionDeclaration;
use crate::domain::{Content, TurnContent};
use async_trait::async_trait;

/// A stateful conversation with an LLM that supports function calling.
///
/// The session owns the provider-side history: a successful `send` appends
/// the user content and the model's reply, a failed one leaves it untouched.
#[async_trait]
pub trait ModelSession: Send {
    async fn send(&mut self, content: TurnContent) -> Result<LlmResponse, ModelError>;

    /// Replace the functions offered to the model on subsequent sends.
    fn set_available_functions(&mut self, declarations: Vec<FunctionDeclaration>);

    fn history(&self) -> &[Content];

    /// Drop the history; available functions are kept.
    fn reset(&mut self);
}
