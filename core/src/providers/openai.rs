use crate::config::LlmConfig;
use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolCall, ToolSpec};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    temperature: f64,
    top_p: f64,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCallRequest<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCallRequest<'a> {
    id: &'a str,
    r#type: &'a str,
    function: OpenAIFunctionRequest<'a>,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionRequest<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    r#type: &'static str,
    function: OpenAIToolFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(default = "default_call_type")]
    r#type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

fn default_call_type() -> String {
    "function".to_string()
}

pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
    top_p: f64,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, Duration::from_secs(120))
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.6,
            top_p: 0.95,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::with_timeout(&config.api_key, Duration::from_secs(config.timeout_secs))
            .with_model(&config.model)
            .with_base_url(&config.base_url)
            .with_sampling(config.temperature, config.top_p)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_sampling(mut self, temperature: f64, top_p: f64) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }

    fn convert_messages<'a>(&self, messages: &'a [ChatMessage]) -> Vec<OpenAIMessage<'a>> {
        messages
            .iter()
            .map(|m| {
                let tool_calls = m.tool_calls.as_ref().map(|tool_calls| {
                    tool_calls
                        .iter()
                        .map(|tc| OpenAIToolCallRequest {
                            id: &tc.id,
                            r#type: "function",
                            function: OpenAIFunctionRequest {
                                name: &tc.name,
                                arguments: &tc.arguments,
                            },
                        })
                        .collect()
                });

                OpenAIMessage {
                    role: &m.role,
                    content: m.content.as_deref(),
                    tool_calls,
                    tool_call_id: m.tool_call_id.as_deref(),
                    name: m.name.as_deref(),
                }
            })
            .collect()
    }

    fn convert_tools(&self, tools: &[ToolSpec]) -> Vec<OpenAITool> {
        tools
            .iter()
            .map(|t| OpenAITool {
                r#type: "function",
                function: OpenAIToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.to_json_schema(),
                },
            })
            .collect()
    }

    fn build_request<'a>(&'a self, request: &ChatRequest<'a>) -> OpenAIRequest<'a> {
        let tools = request.tools.map(|t| self.convert_tools(t));
        OpenAIRequest {
            model: &self.model,
            messages: self.convert_messages(request.messages),
            tool_choice: tools.as_ref().map(|_| request.tool_choice.as_str()),
            tools,
            temperature: self.temperature,
            top_p: self.top_p,
            stream: false,
        }
    }
}

fn synthesize_call_id(index: usize, name: &str, arguments: &str) -> String {
    let digest = md5::compute(format!("{index}:{name}:{arguments}").as_bytes());
    format!("call_{:x}", digest)
}

fn normalize_response(response: OpenAIResponse) -> anyhow::Result<ChatResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No choices in response"))?;

    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, call)| {
            if call.r#type != "function" {
                tracing::debug!(kind = %call.r#type, "Skipping non-function tool call");
                return None;
            }
            let arguments = call.function.arguments.unwrap_or_else(|| "{}".to_string());
            let id = call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| synthesize_call_id(index, &call.function.name, &arguments));
            Some(ToolCall {
                id,
                name: call.function.name,
                arguments,
            })
        })
        .collect();

    let has_content = choice
        .message
        .content
        .as_ref()
        .is_some_and(|c| !c.trim().is_empty());
    if !has_content && tool_calls.is_empty() {
        return Err(anyhow::anyhow!(
            "Empty response from API: no content or tool calls"
        ));
    }

    Ok(ChatResponse {
        text: choice.message.content,
        tool_calls,
    })
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        let openai_request = self.build_request(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .context("Completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "OpenAI API error {}: {}",
                status,
                error_text
            ));
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .context("Failed to decode completion response")?;

        normalize_response(openai_response)
    }
}
