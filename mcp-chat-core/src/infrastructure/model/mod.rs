//! Model infrastructure module
//!
//! # Structure
//! - `types` - Response and Error types
//! - `traits` - ModelSession trait
//! - `factory` - API key resolution
//! - `clients` - HTTP base and the Gemini session

pub mod clients;
pub mod factory;
pub mod traits;
pub mod types;

pub use clients::GeminiSession;
pub use traits::ModelSession;
pub use types::{BlockReason, LlmResponse, ModelError};
