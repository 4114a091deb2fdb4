use crate::traits::{Tool, ToolSpec, error_payload};
use std::sync::Arc;

/// Name → implementation table. Populated during startup, then shared
/// read-only behind an `Arc` for the rest of the process.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if self.contains(tool.name()) {
            tracing::warn!(tool = tool.name(), "Replacing previously registered tool");
            self.tools.retain(|t| t.name() != tool.name());
            self.specs.retain(|s| s.name != tool.name());
        }
        self.specs.push(tool.spec());
        self.tools.push(tool);
    }

    pub fn get_specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Runs the named tool and returns the tool-message content. Never fails:
    /// unknown tools and tool errors come back as `{"error": ...}` documents.
    pub async fn execute(&self, name: &str, args: serde_json::Value) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return error_payload(&format!("no implementation for tool '{}'", name));
        };

        match tool.execute(args).await {
            Ok(result) => result.into_content(),
            Err(e) => error_payload(&format!("tool '{}' failed: {}", name, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ToolResult;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the arguments back"
        }

        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": { "text": { "type": "string" } } })
        }

        async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
            match args.get("text").and_then(Value::as_str) {
                Some("boom") => Err(anyhow::anyhow!("exploded")),
                Some(text) => Ok(ToolResult::success(text)),
                None => Ok(ToolResult::error("text missing")),
            }
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new().with_tool(Arc::new(EchoTool))
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let output = registry().execute("echo", json!({ "text": "hi" })).await;
        assert_eq!(output, "hi");
    }

    #[tokio::test]
    async fn unknown_tool_names_the_tool() {
        let output = registry().execute("web_search", json!({})).await;
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["error"], "no implementation for tool 'web_search'");
    }

    #[tokio::test]
    async fn tool_errors_are_folded_into_output() {
        let registry = registry();

        let value: Value =
            serde_json::from_str(&registry.execute("echo", json!({ "text": "boom" })).await)
                .unwrap();
        assert_eq!(value["error"], "tool 'echo' failed: exploded");

        let value: Value =
            serde_json::from_str(&registry.execute("echo", json!({})).await).unwrap();
        assert_eq!(value["error"], "text missing");
    }

    #[test]
    fn registering_twice_keeps_one_spec() {
        let registry = registry().with_tool(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_specs().len(), 1);
        assert_eq!(registry.get_specs()[0].parameters.properties["text"].kind, "string");
    }
}
