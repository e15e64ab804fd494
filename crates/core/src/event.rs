//! Agent events: how observers (the terminal UI, the eval harness) follow a turn.
//!
//! The agent loop publishes events as it appends messages and runs tools.
//! Observers subscribe without the loop knowing who they are.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::message::Message;

/// All events published by the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    /// A message was appended to the conversation
    MessageAdded {
        conversation_id: String,
        message: Message,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The turn budget ran out before the model produced a final answer
    TurnBudgetExhausted {
        conversation_id: String,
        assistant_turns: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for agent events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<AgentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AgentEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AgentEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(AgentEvent::ToolExecuted {
            tool_name: "stdin_write".into(),
            success: true,
            duration_ms: 42,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            AgentEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "stdin_write");
                assert!(success);
            }
            _ => panic!("Expected ToolExecuted event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(AgentEvent::MessageAdded {
            conversation_id: "test".into(),
            message: Message::user("no subscribers"),
        });
    }
}
