use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const RAGLOOP_DIR: &str = ".ragloop";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub temperature: f64,
    pub top_p: f64,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: "none".to_string(),
            temperature: 0.6,
            top_p: 0.95,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub url: String,
    pub batch_size: usize,
    pub normalize: bool,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/embed".to_string(),
            batch_size: 64,
            normalize: true,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub host: String,
    pub port: u16,
    pub index: String,
    /// Vector field in the index mapping; stripped from every returned hit.
    pub embedding_field: String,
    pub top_k: usize,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
            index: "rag-index".to_string(),
            embedding_field: "embedding".to_string(),
            top_k: 5,
            timeout_secs: 30,
        }
    }
}

impl SearchConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub max_tool_calls: usize,
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: 6,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub agent: AgentConfig,
}

pub fn get_ragloop_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(RAGLOOP_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_ragloop_dir().join("config.toml")
}

impl Config {
    /// File (if present) then process environment, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

        let mut config = if path.exists() {
            load_config(&path)?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OPENAI_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = lookup("EMBEDDING_URL") {
            self.embedding.url = v;
        }
        if let Some(v) = lookup("OS_HOST") {
            self.search.host = v;
        }
        if let Some(v) = lookup("OS_PORT") {
            self.search.port = parse_var("OS_PORT", &v)?;
        }
        if let Some(v) = lookup("OS_INDEX") {
            self.search.index = v;
        }
        if let Some(v) = lookup("OS_EMBED_FIELD") {
            self.search.embedding_field = v;
        }
        if let Some(v) = lookup("RAG_TOP_K") {
            self.search.top_k = parse_var("RAG_TOP_K", &v)?;
        }
        if let Some(v) = lookup("MAX_TOOL_CALLS") {
            self.agent.max_tool_calls = parse_var("MAX_TOOL_CALLS", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_tool_calls == 0 {
            return Err(ConfigError::InvalidValue(
                "max_tool_calls".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if self.search.top_k == 0 {
            return Err(ConfigError::InvalidValue(
                "top_k".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if self.search.index.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "index".to_string(),
                "must not be empty".to_string(),
            ));
        }
        if self.search.embedding_field.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "embedding_field".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    toml::from_str(&content).with_context(|| format!("Failed to parse config from {}", path.display()))
}
