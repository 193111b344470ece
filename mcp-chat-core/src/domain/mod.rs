pub mod types;

pub use types::{
    Blob, ChatRole, Content, ConversationMessage, FunctionCall, FunctionResponse, MessageRole,
    Part, ServerDescriptor, ToolCallInfo, ToolCallStatus, TurnContent,
};
