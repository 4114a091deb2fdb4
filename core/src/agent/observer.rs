use crate::traits::ToolChoice;

/// Progress of a single turn, reported to a [`TurnObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent<'a> {
    TurnStarted {
        input: &'a str,
    },
    ModelRequested {
        round: usize,
        tool_choice: ToolChoice,
        messages: usize,
    },
    ToolDispatched {
        id: &'a str,
        name: &'a str,
        arguments: &'a serde_json::Value,
    },
    ToolCompleted {
        id: &'a str,
        name: &'a str,
        content: &'a str,
        calls_used: usize,
    },
    BudgetExhausted {
        calls_used: usize,
        skipped: usize,
    },
    Finalized {
        answer: &'a str,
        calls_used: usize,
    },
}

pub trait TurnObserver: Send + Sync {
    fn on_event(&self, event: &TurnEvent<'_>);
}

/// Reports turn events as `tracing` events under the `ragloop::turn` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TurnObserver for TracingObserver {
    fn on_event(&self, event: &TurnEvent<'_>) {
        match event {
            TurnEvent::TurnStarted { input } => {
                tracing::info!(target: "ragloop::turn", chars = input.chars().count(), "Turn started");
            }
            TurnEvent::ModelRequested {
                round,
                tool_choice,
                messages,
            } => {
                tracing::debug!(
                    target: "ragloop::turn",
                    round,
                    tool_choice = tool_choice.as_str(),
                    messages,
                    "Requesting completion"
                );
            }
            TurnEvent::ToolDispatched { id, name, arguments } => {
                tracing::info!(target: "ragloop::turn", id, name, %arguments, "Tool dispatched");
            }
            TurnEvent::ToolCompleted {
                id,
                name,
                content,
                calls_used,
            } => {
                tracing::info!(
                    target: "ragloop::turn",
                    id,
                    name,
                    bytes = content.len(),
                    calls_used,
                    "Tool completed"
                );
                tracing::trace!(target: "ragloop::turn", id, content, "Tool output");
            }
            TurnEvent::BudgetExhausted { calls_used, skipped } => {
                tracing::warn!(
                    target: "ragloop::turn",
                    calls_used,
                    skipped,
                    "Tool call budget exhausted, forcing final answer"
                );
            }
            TurnEvent::Finalized { answer, calls_used } => {
                tracing::info!(
                    target: "ragloop::turn",
                    calls_used,
                    chars = answer.chars().count(),
                    "Turn finished"
                );
            }
        }
    }
}
