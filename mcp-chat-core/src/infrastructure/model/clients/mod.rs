pub mod base;
pub mod gemini;

pub use base::HttpClientBase;
pub use gemini::GeminiSession;
