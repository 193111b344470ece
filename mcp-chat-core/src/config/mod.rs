pub mod app;
pub mod error;
pub mod loader;
pub mod server;

pub use app::{AppConfig, DiscoveryConfig, GeminiConfig, OrchestratorConfig};
pub use error::ConfigError;
pub use loader::{ensure_env_loaded, load_config};
pub use server::{ServerStore, ServerStoreError};
