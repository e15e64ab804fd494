//! LLM client trait: the abstraction over the model backend.
//!
//! An `LlmClient` takes the whole conversation plus the tool declarations and
//! returns exactly one assistant turn. It is stateless: no retries, no
//! streaming, one blocking round trip per call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::{Message, ToolCallRequest};

/// A tool declaration sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's arguments
    pub parameters: serde_json::Value,
}

/// One assistant turn as returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    /// Text content; empty when the model only requested tools.
    pub text: String,

    /// Tool invocations the model asked for, in the order it listed them.
    #[serde(default)]
    pub tool_call_requests: Vec<ToolCallRequest>,

    /// Which model actually responded
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl AssistantReply {
    /// A plain text reply, mostly useful in tests and scripted clients.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_call_requests: Vec::new(),
            model: String::new(),
            usage: None,
        }
    }

    /// A reply requesting tools, with optional accompanying text.
    pub fn tool_calls(text: impl Into<String>, requests: Vec<ToolCallRequest>) -> Self {
        Self {
            text: text.into(),
            tool_call_requests: requests,
            model: String::new(),
            usage: None,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core LLM client trait.
///
/// The agent loop calls `call_model()` without knowing which backend is used.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// A human-readable name for this client (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send the conversation and tool declarations, get one assistant turn back.
    async fn call_model(
        &self,
        conversation: &[Message],
        tools: &[ToolDeclaration],
    ) -> std::result::Result<AssistantReply, ProviderError>;
}
