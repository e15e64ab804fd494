//! Scripted LLM clients and fake tools for loop tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dbgagent_core::error::{ProviderError, ToolError};
use dbgagent_core::message::{Message, Role, ToolCallRequest};
use dbgagent_core::provider::{AssistantReply, LlmClient, ToolDeclaration};
use dbgagent_core::tool::Tool;

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest::new(id, name, arguments)
}

/// Replies with a queue of scripted results, one per call.
///
/// Once the queue is empty it returns `repeat` if set, otherwise an error.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<AssistantReply, ProviderError>>>,
    repeat: Option<AssistantReply>,
    seen: Mutex<Vec<Vec<Role>>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<AssistantReply, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            repeat: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// A client that returns `reply` forever.
    pub fn repeating(reply: AssistantReply) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::new(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Conversation length at each call.
    pub fn seen_lengths(&self) -> Vec<usize> {
        self.seen.lock().unwrap().iter().map(Vec::len).collect()
    }

    /// The roles of the conversation passed to each call.
    pub fn seen_roles(&self) -> Vec<Vec<Role>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn call_model(
        &self,
        conversation: &[Message],
        _tools: &[ToolDeclaration],
    ) -> Result<AssistantReply, ProviderError> {
        self.seen
            .lock()
            .unwrap()
            .push(conversation.iter().map(Message::role).collect());
        if let Some(next) = self.replies.lock().unwrap().pop_front() {
            return next;
        }
        self.repeat
            .clone()
            .ok_or_else(|| ProviderError::MalformedResponse("script exhausted".into()))
    }
}

/// Never answers.
pub struct PendingClient;

#[async_trait]
impl LlmClient for PendingClient {
    fn name(&self) -> &str {
        "pending"
    }

    async fn call_model(
        &self,
        _conversation: &[Message],
        _tools: &[ToolDeclaration],
    ) -> Result<AssistantReply, ProviderError> {
        std::future::pending().await
    }
}

/// Records every argument string it is invoked with.
pub struct RecordingTool {
    name: &'static str,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingTool {
    pub fn new(name: &'static str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                name,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Records its arguments"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn invoke(&self, arguments_json: &str) -> Result<String, ToolError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(arguments_json.to_string());
        Ok(format!("call #{}", calls.len()))
    }
}

pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn invoke(&self, _arguments_json: &str) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "broken".into(),
            reason: "debugger went away".into(),
        })
    }
}
