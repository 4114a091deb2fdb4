use crate::traits::{ChatMessage, ToolSpec};
use std::fmt::Write;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You answer questions using a document index. \
When you need context, call the rag_search tool, as many times as necessary, with a short \
keyword query. rag_search takes a single 'query' argument and returns the raw search \
response JSON with the embedding field removed from every hit. Base your answer on the \
information in those tool results, answer accurately and concisely, and finish with an \
answer the user can easily understand.";

pub struct ContextBuilder {
    system_prompt: String,
    tool_specs: Vec<ToolSpec>,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tool_specs: vec![],
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_tool_specs(mut self, tool_specs: Vec<ToolSpec>) -> Self {
        self.tool_specs = tool_specs;
        self
    }

    pub fn build_system_prompt(&self) -> String {
        let mut parts = vec![self.system_prompt.trim().to_string()];

        if let Some(tools) = self.get_tool_summary() {
            parts.push(tools);
        }
        parts.push(self.get_runtime_context());

        parts.join("\n\n---\n\n")
    }

    fn get_tool_summary(&self) -> Option<String> {
        if self.tool_specs.is_empty() {
            return None;
        }

        let mut summary = String::from("## Available Tools\n\n");
        for tool in &self.tool_specs {
            let _ = writeln!(summary, "- **{}**: {}", tool.name, tool.description);
        }
        Some(summary.trim_end().to_string())
    }

    fn get_runtime_context(&self) -> String {
        let today = chrono::Local::now().format("%Y-%m-%d (%A)");
        format!("## Runtime Context\n\n### Current Date\n{}", today)
    }

    /// Initial history for a turn: system prompt followed by the question.
    pub fn build_messages(&self, user_input: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.build_system_prompt()),
            ChatMessage::user(user_input),
        ]
    }
}
