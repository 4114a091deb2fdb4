pub mod context;
pub mod loop_;
pub mod observer;
pub mod registry;

pub use context::{ContextBuilder, DEFAULT_SYSTEM_PROMPT};
pub use loop_::{AgentLoop, FinishReason, TurnOutcome};
pub use observer::{TracingObserver, TurnEvent, TurnObserver};
pub use registry::ToolRegistry;
