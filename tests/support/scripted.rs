//! Model session replaying canned replies.

use async_trait::async_trait;
use mcp_chat_core::domain::{Content, TurnContent};
use mcp_chat_core::infrastructure::model::{LlmResponse, ModelError, ModelSession};
use mcp_chat_core::schema::FunctionDeclaration;
use std::collections::VecDeque;

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
