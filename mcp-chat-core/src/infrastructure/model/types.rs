//! Model types - Response and Error types

use crate::domain::FunctionCall;
use thiserror::Error;

/// Why the LLM refused to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReason {
    pub reason: String,
    pub detail: Option<String>,
}

/// One LLM reply, reduced to what the turn loop needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    /// Concatenated visible text, `None` when there is none
    pub text: Option<String>,
    /// Requested function calls in the order the model emitted them
    pub function_calls: Vec<FunctionCall>,
    pub block: Option<BlockReason>,
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn calls(function_calls: Vec<FunctionCall>) -> Self {
        Self {
            function_calls,
            ..Self::default()
        }
    }

    pub fn blocked(reason: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            block: Some(BlockReason {
                reason: reason.into(),
                detail,
            }),
            ..Self::default()
        }
    }

    pub fn has_function_calls(&self) -> bool {
        !self.function_calls.is_empty()
    }
}

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider '{provider}' requires an API key")]
    MissingApiKey { provider: String },
    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' answered HTTP {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },
    #[error("provider '{provider}' returned invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl ModelError {
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn api(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}
