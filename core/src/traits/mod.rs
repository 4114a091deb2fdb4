pub mod provider;
pub mod retrieval;
pub mod tool;

pub use provider::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolCall, ToolChoice};
pub use retrieval::{Embedder, RetrievalError, VectorStore};
pub use tool::{
    Tool, ToolDescriptor, ToolParameters, ToolProperty, ToolResult, ToolSpec, error_payload,
};
