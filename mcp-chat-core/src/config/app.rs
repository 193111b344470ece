use super::error::ConfigError;
use crate::application::discovery::DiscoveryMode;
use crate::constants::{
    DEFAULT_API_KEY_ENV, DEFAULT_GEMINI_API_PATH, DEFAULT_GEMINI_ENDPOINT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVERS_FILE, DEFAULT_TEMPERATURE,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration loaded from client.toml
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model: String,
    /// Where the MCP server list is persisted; `None` keeps it in memory
    pub servers_file: Option<PathBuf>,
    pub system_prompt: Option<String>,
    pub gemini: GeminiConfig,
    pub orchestrator: OrchestratorConfig,
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub api_path: String,
    /// Name of the environment variable holding the API key
    pub api_key: Option<String>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub max_attempts: u32,
    pub request_timeout_secs: u64,
}

impl OrchestratorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub mode: DiscoveryMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            servers_file: Some(PathBuf::from(DEFAULT_SERVERS_FILE)),
            system_prompt: None,
            gemini: GeminiConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            api_path: DEFAULT_GEMINI_API_PATH.to_string(),
            api_key: Some(DEFAULT_API_KEY_ENV.to_string()),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("model", "must not be empty"));
        }
        if self.gemini.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("gemini.endpoint", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.gemini.temperature) {
            return Err(ConfigError::invalid(
                "gemini.temperature",
                format!("{} is outside 0.0..=2.0", self.gemini.temperature),
            ));
        }
        if self.orchestrator.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "orchestrator.max_attempts",
                "must be at least 1",
            ));
        }
        if self.orchestrator.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "orchestrator.request_timeout_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
