pub mod agent;
pub mod config;
pub mod embedding;
pub mod providers;
pub mod search;
pub mod tools;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use agent::{AgentLoop, ContextBuilder, FinishReason, ToolRegistry, TurnOutcome};
pub use config::*;
pub use embedding::*;
pub use providers::*;
pub use search::*;
pub use tools::*;
pub use traits::*;
