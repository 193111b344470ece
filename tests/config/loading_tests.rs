// Config loading tests - AppConfig::load from client.toml
//
// File discovery, defaults, validation and environment expansion.

#[path = "../support/mod.rs"]
mod support;

use mcp_chat_core::config::{AppConfig, ConfigError};
use mcp_chat_core::discovery::DiscoveryMode;
use mcp_chat_core::infrastructure::model::{GeminiSession, ModelSession};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use support::mock_gemini::{MockGemini, text_reply};
use tempfile::tempdir;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("client.toml");
    fs::write(&path, content).expect("Failed to write client.toml");
    path
}

#[test]
fn returns_error_when_explicit_file_not_found() {
    let result = AppConfig::load(Some(Path::new("/nonexistent/path/client.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
fn partial_file_falls_back_to_defaults() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "model = \"gemini-2.0-flash\"\n");

    let config = AppConfig::load(Some(&path)).expect("valid config");
    let defaults = AppConfig::default();
    assert_eq!(config.model, "gemini-2.0-flash");
    assert_eq!(config.gemini, defaults.gemini);
    assert_eq!(config.orchestrator.max_attempts, 5);
    assert_eq!(config.orchestrator.request_timeout_secs, 30);
    assert_eq!(config.discovery.mode, DiscoveryMode::Sequential);
    assert_eq!(config.gemini.api_key.as_deref(), Some("GEMINI_API_KEY"));
}

#[test]
fn reads_discovery_mode() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "[discovery]\nmode = \"concurrent\"\n");

    let config = AppConfig::load(Some(&path)).expect("valid config");
    assert_eq!(config.discovery.mode, DiscoveryMode::Concurrent);
}

#[test]
fn rejects_unknown_discovery_mode() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "[discovery]\nmode = \"parallel\"\n");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn rejects_malformed_toml() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "model = \n");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn rejects_invalid_values() {
    let dir = tempdir().expect("tempdir");
    for content in [
        "model = \"  \"\n",
        "[gemini]\ntemperature = 3.5\n",
        "[orchestrator]\nmax_attempts = 0\n",
    ] {
        let path = write_config(dir.path(), content);
        let result = AppConfig::load(Some(&path));
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { .. })),
            "{content}"
        );
    }
}

#[test]
#[serial]
fn servers_file_expands_environment_variables() {
    let dir = tempdir().expect("tempdir");
    unsafe {
        std::env::set_var("MCP_CHAT_IT_DATA", dir.path());
    }
    let path = write_config(dir.path(), "servers_file = \"$MCP_CHAT_IT_DATA/servers.toml\"\n");

    let config = AppConfig::load(Some(&path)).expect("valid config");
    assert_eq!(config.servers_file, Some(dir.path().join("servers.toml")));
    unsafe {
        std::env::remove_var("MCP_CHAT_IT_DATA");
    }
}

#[test]
fn empty_servers_file_keeps_servers_in_memory() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "servers_file = \"\"\n");

    let config = AppConfig::load(Some(&path)).expect("valid config");
    assert!(config.servers_file.is_none());
}

#[tokio::test]
#[serial]
async fn api_key_is_read_from_named_variable() {
    let gemini = MockGemini::start().await;
    gemini.reply(text_reply("hello"));
    unsafe {
        std::env::set_var("MCP_CHAT_IT_KEY", "from-env");
    }

    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        &format!(
            "model = \"gemini-test\"\n[gemini]\nendpoint = \"{}\"\napi_key = \"MCP_CHAT_IT_KEY\"\n",
            gemini.endpoint
        ),
    );
    let config = AppConfig::load(Some(&path)).expect("valid config");
    let mut session = GeminiSession::from_config(&config);
    session.send("hi".into()).await.expect("reply");

    assert_eq!(gemini.requests()[0].key.as_deref(), Some("from-env"));
    unsafe {
        std::env::remove_var("MCP_CHAT_IT_KEY");
    }
}
