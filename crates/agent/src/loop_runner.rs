//! The agent reasoning loop implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dbgagent_core::event::{AgentEvent, EventBus};
use dbgagent_core::message::{Conversation, Message};
use dbgagent_core::provider::{AssistantReply, LlmClient};
use dbgagent_core::tool::ToolRegistry;
use dbgagent_core::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Assistant turns allowed after one user message unless configured otherwise.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// How a call to [`AgentLoop::process_last_user_message`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered with text and requested no tools.
    Completed { answer: String },

    /// The budget tripped before the model produced a final answer.
    BudgetExhausted { assistant_turns: usize },
}

/// Owns one conversation and drives it against an LLM client and a tool registry.
pub struct AgentLoop {
    /// The LLM client to ask
    client: Arc<dyn LlmClient>,

    /// Tools exposed to the model, in declaration order
    tools: Arc<ToolRegistry>,

    /// The conversation; opened by exactly one system message
    conversation: Conversation,

    /// Maximum assistant turns after one user message
    max_turns: usize,

    /// Observers of appended messages and tool runs
    event_bus: Arc<EventBus>,

    /// Aborts the pending LLM or tool call when cancelled
    cancel: CancellationToken,
}

impl AgentLoop {
    /// Create a loop whose conversation starts with `system_prompt`.
    pub fn new(
        client: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tools,
            conversation: Conversation::new(system_prompt),
            max_turns: DEFAULT_MAX_TURNS,
            event_bus: Arc::new(EventBus::default()),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the turn budget.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Publish events on a shared bus instead of a private one.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Abort in-flight work when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Append a user message and notify observers.
    pub fn add_user_message(&mut self, text: impl Into<String>) {
        let message = self.conversation.push_user(text).clone();
        self.publish_message(message);
    }

    /// Run the loop for the most recent user message until the model answers,
    /// the budget runs out, or something fails.
    ///
    /// Errors from the LLM client or a tool abort the turn unchanged. Messages
    /// appended before the failure stay in the conversation.
    pub async fn process_last_user_message(&mut self) -> Result<TurnOutcome> {
        let declarations = self.tools.declarations();

        info!(
            conversation_id = %self.conversation.id,
            messages = self.conversation.len(),
            tools = declarations.len(),
            "Processing user message"
        );

        loop {
            let reply = self
                .cancellable(
                    self.client
                        .call_model(self.conversation.messages(), &declarations),
                )
                .await??;

            let AssistantReply {
                text,
                tool_call_requests,
                ..
            } = reply;

            let message = self
                .conversation
                .push_assistant(text, tool_call_requests)
                .clone();
            self.publish_message(message.clone());

            if is_task_complete(&message) {
                debug!(conversation_id = %self.conversation.id, "Task complete");
                return Ok(TurnOutcome::Completed {
                    answer: message.text().to_string(),
                });
            }

            debug!(
                tool_count = message.tool_call_requests().len(),
                "Executing tool calls"
            );

            for request in message.tool_call_requests() {
                let started = Instant::now();
                let result = self.cancellable(self.tools.invoke(request)).await?;
                let duration_ms = started.elapsed().as_millis() as u64;

                self.event_bus.publish(AgentEvent::ToolExecuted {
                    tool_name: request.name().to_string(),
                    success: result.is_ok(),
                    duration_ms,
                    timestamp: Utc::now(),
                });

                let output = result.map_err(|e| {
                    warn!(tool = %request.name(), error = %e, "Tool call failed");
                    e
                })?;

                let message = self
                    .conversation
                    .push_tool_result(request.clone(), output)
                    .clone();
                self.publish_message(message);
            }

            let assistant_turns = self.conversation.assistant_turns_since_last_user();
            if assistant_turns > self.max_turns {
                warn!(
                    conversation_id = %self.conversation.id,
                    assistant_turns,
                    max_turns = self.max_turns,
                    "Turn budget exhausted"
                );
                self.event_bus.publish(AgentEvent::TurnBudgetExhausted {
                    conversation_id: self.conversation.id.to_string(),
                    assistant_turns,
                    timestamp: Utc::now(),
                });
                return Ok(TurnOutcome::BudgetExhausted { assistant_turns });
            }
        }
    }

    /// Await `fut` unless the cancellation token fires first.
    async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!(conversation_id = %self.conversation.id, "Turn cancelled");
                Err(Error::Cancelled)
            }
            out = fut => Ok(out),
        }
    }

    fn publish_message(&self, message: Message) {
        self.event_bus.publish(AgentEvent::MessageAdded {
            conversation_id: self.conversation.id.to_string(),
            message,
        });
    }
}

/// Text with no tool calls ends the turn. Tool calls always continue it,
/// even when the model also wrote text.
fn is_task_complete(message: &Message) -> bool {
    message.tool_call_requests().is_empty() && !message.text().is_empty()
}
