use crate::infrastructure::model::ModelError;
use std::fmt;
use thiserror::Error;

/// Broad cause of a failed LLM send, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnErrorKind {
    InvalidCredential,
    QuotaExceeded,
    Network,
    Unknown,
}

impl TurnErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnErrorKind::InvalidCredential => "invalid_credential",
            TurnErrorKind::QuotaExceeded => "quota_exceeded",
            TurnErrorKind::Network => "network",
            TurnErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TurnErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified LLM transport failure. Ends the turn without retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {detail}")]
pub struct TurnError {
    pub kind: TurnErrorKind,
    /// Underlying error text, for logs
    pub detail: String,
}

impl TurnError {
    pub fn new(kind: TurnErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn classify(err: &ModelError) -> Self {
        let kind = match err {
            ModelError::MissingApiKey { .. } => TurnErrorKind::InvalidCredential,
            ModelError::Network { .. } => TurnErrorKind::Network,
            ModelError::Api {
                status, message, ..
            } => classify_api(*status, message),
            ModelError::InvalidResponse { .. } => TurnErrorKind::Unknown,
        };
        Self::new(kind, err.to_string())
    }

    pub fn user_message(&self) -> &'static str {
        match self.kind {
            TurnErrorKind::InvalidCredential => {
                "The Gemini API key is not valid. Please check your API key."
            }
            TurnErrorKind::QuotaExceeded => {
                "You may have exceeded your API quota or rate limit. Please check your Google AI Studio dashboard."
            }
            TurnErrorKind::Network => {
                "A network error occurred. Please check your internet connection."
            }
            TurnErrorKind::Unknown => "An error occurred while communicating with the AI.",
        }
    }
}

fn classify_api(status: u16, message: &str) -> TurnErrorKind {
    let lowered = message.to_lowercase();
    if status == 401
        || status == 403
        || lowered.contains("api key not valid")
        || lowered.contains("api_key_invalid")
    {
        TurnErrorKind::InvalidCredential
    } else if status == 429
        || lowered.contains("quota")
        || lowered.contains("rate limit")
        || lowered.contains("resource_exhausted")
    {
        TurnErrorKind::QuotaExceeded
    } else {
        TurnErrorKind::Unknown
    }
}
