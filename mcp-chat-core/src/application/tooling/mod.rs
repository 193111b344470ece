//! MCP transport adapter: the connection capability the discovery and turn
//! layers depend on, plus the streamable-HTTP implementation.

mod error;
mod http;
mod interface;
pub mod sse;

pub use error::TransportError;
pub use http::{HttpConnection, HttpTransport, PROTOCOL_HEADER, SESSION_HEADER};
pub use interface::{RawToolDescriptor, ToolAnnotations, ToolConnection, ToolResult, ToolTransport};
