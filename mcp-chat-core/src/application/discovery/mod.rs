//! MCP Tool Discovery
//!
//! Connects to every configured MCP server, lists its tools, translates each
//! input schema and mints a unique LLM-facing function name per tool.
//!
//! # Components
//!
//! - **Naming** (`naming.rs`): function-name derivation
//! - **Coordinator** (`coordinator.rs`): one discovery round over a server list
//! - **Types** (`types.rs`): registry, per-server reports and summary
//!
//! # Name collisions
//!
//! Names are minted in server-list order, then tool-list order. A name that
//! is already taken (by an earlier tool in the round or by the carry-over
//! registry) is skipped, so the first-discovered mapping always wins. This
//! holds in both [`DiscoveryMode`]s.
//!
//! ```ignore
//! let coordinator = DiscoveryCoordinator::new(Arc::new(HttpTransport::new(timeout)));
//! let outcome = coordinator.discover(&servers, &ToolRegistry::empty()).await;
//! session.set_available_functions(outcome.registry.declarations());
//! ```

mod coordinator;
mod naming;
mod types;

pub use coordinator::{DiscoveryCoordinator, declare_tool};
pub use naming::{derive_function_name, is_valid_function_name, sanitize};
pub use types::{
    DiscoveryMode, DiscoveryOutcome, DiscoverySummary, LoadStatus, ServerReport, ToolMapping,
    ToolRegistry,
};
