//! Application constants
//!
//! Single source of truth for paths, limits and protocol strings.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/client.toml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

/// Default location of the persisted MCP server list
pub const DEFAULT_SERVERS_FILE: &str = "config/servers.toml";

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini endpoint
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini API path (fallback when not specified in config)
pub const DEFAULT_GEMINI_API_PATH: &str = "v1beta/models";

/// Environment variable consulted for the Gemini API key when none is configured
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Upper bound on LLM round-trips within one user turn
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// MCP protocol revision announced during `initialize`
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Maximum length of a Gemini function name
pub const MAX_FUNCTION_NAME_LEN: usize = 63;

/// Cap on `tools/list` pagination so a misbehaving server cannot loop forever
pub const MAX_TOOL_LIST_PAGES: usize = 32;
