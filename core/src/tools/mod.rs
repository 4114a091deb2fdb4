use serde_json::Value;

pub mod rag_search;

pub use rag_search::{RagSearchTool, sanitize_hits};

pub fn extract_string_arg_opt(args: &Value, key: &str, default: &str) -> String {
    args.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}
