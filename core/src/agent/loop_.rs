use crate::agent::{ContextBuilder, ToolRegistry, TracingObserver, TurnEvent, TurnObserver};
use crate::traits::{ChatMessage, ChatRequest, Provider, ToolCall, ToolChoice, error_payload};
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_MAX_TOOL_CALLS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The model answered without requesting further tools.
    Answered,
    /// The call budget ran out and the answer came from a tool-free request.
    BudgetExhausted,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer: String,
    pub finish: FinishReason,
    pub tool_calls_used: usize,
    pub model_calls: usize,
    pub messages: Vec<ChatMessage>,
}

enum TurnState {
    RequestModel,
    DispatchTools(Vec<ToolCall>),
    ForceFinalize,
    Done(String),
}

/// Per-turn state. Created fresh by every call to [`AgentLoop::run_turn`].
struct Turn {
    messages: Vec<ChatMessage>,
    calls_used: usize,
    model_calls: usize,
}

pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    context_builder: ContextBuilder,
    tool_registry: Arc<ToolRegistry>,
    observer: Arc<dyn TurnObserver>,
    max_tool_calls: usize,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        context_builder: ContextBuilder,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            context_builder,
            tool_registry,
            observer: Arc::new(TracingObserver),
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
        }
    }

    pub fn with_max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = max.max(1);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn process(&self, user_input: &str) -> Result<String> {
        self.run_turn(user_input).await.map(|outcome| outcome.answer)
    }

    pub async fn run_turn(&self, user_input: &str) -> Result<TurnOutcome> {
        self.observer
            .on_event(&TurnEvent::TurnStarted { input: user_input });

        let mut turn = Turn {
            messages: self.context_builder.build_messages(user_input),
            calls_used: 0,
            model_calls: 0,
        };
        let mut finish = FinishReason::Answered;
        let mut state = TurnState::RequestModel;

        let answer = loop {
            state = match state {
                TurnState::RequestModel => {
                    let message = self.request_model(&mut turn, ToolChoice::Auto).await?;
                    let calls = message.tool_calls.clone().unwrap_or_default();
                    let text = message.text_or_empty().to_string();
                    turn.messages.push(message);

                    if calls.is_empty() {
                        TurnState::Done(text)
                    } else {
                        TurnState::DispatchTools(calls)
                    }
                }
                TurnState::DispatchTools(calls) => {
                    if self.dispatch_tools(&mut turn, calls).await {
                        finish = FinishReason::BudgetExhausted;
                        TurnState::ForceFinalize
                    } else {
                        TurnState::RequestModel
                    }
                }
                TurnState::ForceFinalize => {
                    let mut message = self.request_model(&mut turn, ToolChoice::None).await?;
                    if message.tool_calls.take().is_some() {
                        tracing::warn!("Model requested tools with tool_choice=none; ignoring");
                    }
                    let text = message.text_or_empty().to_string();
                    if text.trim().is_empty() {
                        anyhow::bail!(
                            "Model returned no answer after the tool call budget was exhausted"
                        );
                    }
                    turn.messages.push(message);
                    TurnState::Done(text)
                }
                TurnState::Done(answer) => break answer,
            };
        };

        self.observer.on_event(&TurnEvent::Finalized {
            answer: &answer,
            calls_used: turn.calls_used,
        });

        Ok(TurnOutcome {
            answer,
            finish,
            tool_calls_used: turn.calls_used,
            model_calls: turn.model_calls,
            messages: turn.messages,
        })
    }

    async fn request_model(&self, turn: &mut Turn, tool_choice: ToolChoice) -> Result<ChatMessage> {
        turn.model_calls += 1;
        self.observer.on_event(&TurnEvent::ModelRequested {
            round: turn.model_calls,
            tool_choice,
            messages: turn.messages.len(),
        });

        let tools = self.tool_registry.get_specs();
        let request = ChatRequest {
            messages: &turn.messages,
            tools: if tools.is_empty() { None } else { Some(tools) },
            tool_choice,
        };

        let response = self
            .provider
            .chat(request)
            .await
            .with_context(|| format!("Completion request {} failed", turn.model_calls))?;

        Ok(ChatMessage::from(response))
    }

    /// Runs the batch in order. Returns `true` once the budget is spent, in
    /// which case the remaining calls are answered without being executed.
    async fn dispatch_tools(&self, turn: &mut Turn, calls: Vec<ToolCall>) -> bool {
        let total = calls.len();
        let mut calls = calls.into_iter().enumerate();

        for (index, call) in calls.by_ref() {
            let args = parse_arguments(&call);
            self.observer.on_event(&TurnEvent::ToolDispatched {
                id: &call.id,
                name: &call.name,
                arguments: &args,
            });

            let content = self.tool_registry.execute(&call.name, args).await;
            turn.calls_used += 1;

            self.observer.on_event(&TurnEvent::ToolCompleted {
                id: &call.id,
                name: &call.name,
                content: &content,
                calls_used: turn.calls_used,
            });
            turn.messages
                .push(ChatMessage::tool_result(call.id, call.name, content));

            if turn.calls_used >= self.max_tool_calls {
                self.observer.on_event(&TurnEvent::BudgetExhausted {
                    calls_used: turn.calls_used,
                    skipped: total - index - 1,
                });
                break;
            }
        }

        if turn.calls_used < self.max_tool_calls {
            return false;
        }

        // Every requested id still needs a reply for the history to stay valid.
        let skipped = error_payload("tool call budget exhausted; call was not executed");
        for (_, call) in calls {
            turn.messages
                .push(ChatMessage::tool_result(call.id, call.name, skipped.clone()));
        }
        true
    }
}

fn parse_arguments(call: &ToolCall) -> Value {
    match serde_json::from_str::<Value>(&call.arguments) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) if call.arguments.trim().is_empty() => Value::Object(Default::default()),
        _ => {
            tracing::warn!(
                id = %call.id,
                name = %call.name,
                "Tool arguments are not a JSON object; using {{}}"
            );
            Value::Object(Default::default())
        }
    }
}
