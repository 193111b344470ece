use super::app::{AppConfig, DiscoveryConfig, GeminiConfig, OrchestratorConfig};
use super::error::ConfigError;
use crate::application::discovery::DiscoveryMode;
use crate::constants::{CONFIG_PATH, ENV_PATH};
use dotenvy::from_filename;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, info};

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    model: Option<String>,
    servers_file: Option<String>,
    system_prompt: Option<String>,
    #[serde(default)]
    gemini: RawGemini,
    #[serde(default)]
    orchestrator: RawOrchestrator,
    #[serde(default)]
    discovery: RawDiscovery,
}

#[derive(Debug, Deserialize, Default)]
struct RawGemini {
    endpoint: Option<String>,
    api_path: Option<String>,
    api_key: Option<String>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct RawOrchestrator {
    max_attempts: Option<u32>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawDiscovery {
    mode: Option<DiscoveryMode>,
}

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
    });
}

/// Expand `~` and `$VAR` references, leaving the input untouched when
/// expansion fails.
pub fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Load and validate configuration.
///
/// Without an explicit path a missing default file yields the built-in
/// defaults; an explicit path must exist.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    match path {
        Some(path) => read_config(path),
        None => match read_config(Path::new(CONFIG_PATH)) {
            Err(ConfigError::NotFound { path }) => {
                info!(path = %path.display(), "No configuration file, using defaults");
                Ok(AppConfig::default())
            }
            other => other,
        },
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading client configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, path)
}

/// Parse configuration text; `origin` is only used in error messages.
pub fn parse_config(content: &str, origin: &Path) -> Result<AppConfig, ConfigError> {
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    let config = build(parsed);
    config.validate()?;
    Ok(config)
}

fn build(raw: RawConfig) -> AppConfig {
    let defaults = AppConfig::default();
    let gemini_defaults = defaults.gemini;
    let orchestrator_defaults = defaults.orchestrator;

    let servers_file = match raw.servers_file {
        Some(file) if file.trim().is_empty() => None,
        Some(file) => Some(PathBuf::from(expand(file.trim()))),
        None => defaults.servers_file,
    };

    AppConfig {
        model: raw.model.unwrap_or(defaults.model),
        servers_file,
        system_prompt: raw.system_prompt.filter(|prompt| !prompt.trim().is_empty()),
        gemini: GeminiConfig {
            endpoint: raw
                .gemini
                .endpoint
                .map(|endpoint| expand(&endpoint))
                .unwrap_or(gemini_defaults.endpoint),
            api_path: raw.gemini.api_path.unwrap_or(gemini_defaults.api_path),
            api_key: match raw.gemini.api_key {
                Some(name) if name.trim().is_empty() => None,
                Some(name) => Some(name.trim().to_string()),
                None => gemini_defaults.api_key,
            },
            temperature: raw.gemini.temperature.unwrap_or(gemini_defaults.temperature),
        },
        orchestrator: OrchestratorConfig {
            max_attempts: raw
                .orchestrator
                .max_attempts
                .unwrap_or(orchestrator_defaults.max_attempts),
            request_timeout_secs: raw
                .orchestrator
                .request_timeout_secs
                .unwrap_or(orchestrator_defaults.request_timeout_secs),
        },
        discovery: DiscoveryConfig {
            mode: raw.discovery.mode.unwrap_or_default(),
        },
    }
}
