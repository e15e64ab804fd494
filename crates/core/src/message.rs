//! Message and Conversation domain types.
//!
//! These are the core value objects that flow through the entire system:
//! User types a message → Agent loop appends it → LLM answers or requests tools
//! → tool results are appended → LLM is asked again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (one chat session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model
    Assistant,
    /// Conversation preamble
    System,
    /// Tool execution result
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        };
        f.write_str(name)
    }
}

/// A tool invocation requested by the model. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments_json: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments_json.into(),
        }
    }

    /// Provider-assigned opaque id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments as the raw JSON string the model produced.
    pub fn arguments_json(&self) -> &str {
        &self.arguments
    }
}

/// A single entry in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        text: String,
        timestamp: DateTime<Utc>,
    },
    User {
        text: String,
        timestamp: DateTime<Utc>,
    },
    Assistant {
        /// May be empty when the model only requested tools.
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_call_requests: Vec<ToolCallRequest>,
        /// 1-based position among the assistant messages since the last user message.
        turn_index: u32,
        timestamp: DateTime<Utc>,
    },
    ToolResult {
        request: ToolCallRequest,
        result: String,
        timestamp: DateTime<Utc>,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(
        text: impl Into<String>,
        tool_call_requests: Vec<ToolCallRequest>,
        turn_index: u32,
    ) -> Self {
        Message::Assistant {
            text: text.into(),
            tool_call_requests,
            turn_index,
            timestamp: Utc::now(),
        }
    }

    pub fn tool_result(request: ToolCallRequest, result: impl Into<String>) -> Self {
        Message::ToolResult {
            request,
            result: result.into(),
            timestamp: Utc::now(),
        }
    }

    fn system(text: impl Into<String>) -> Self {
        Message::System {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::ToolResult { .. } => Role::Tool,
        }
    }

    /// The human-readable text of the message. For tool results this is the result payload.
    pub fn text(&self) -> &str {
        match self {
            Message::System { text, .. }
            | Message::User { text, .. }
            | Message::Assistant { text, .. } => text,
            Message::ToolResult { result, .. } => result,
        }
    }

    /// Tool calls requested by an assistant message; empty for every other kind.
    pub fn tool_call_requests(&self) -> &[ToolCallRequest] {
        match self {
            Message::Assistant {
                tool_call_requests, ..
            } => tool_call_requests,
            _ => &[],
        }
    }
}

/// An ordered, append-only sequence of messages opened by exactly one system message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation whose first and only system message is `system_prompt`.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: vec![Message::system(system_prompt)],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &Message {
        self.append(Message::user(text))
    }

    pub fn push_assistant(
        &mut self,
        text: impl Into<String>,
        tool_call_requests: Vec<ToolCallRequest>,
    ) -> &Message {
        let turn_index = self.assistant_turns_since_last_user() as u32 + 1;
        self.append(Message::assistant(text, tool_call_requests, turn_index))
    }

    pub fn push_tool_result(
        &mut self,
        request: ToolCallRequest,
        result: impl Into<String>,
    ) -> &Message {
        self.append(Message::tool_result(request, result))
    }

    /// Number of assistant messages appended after the most recent user message.
    pub fn assistant_turns_since_last_user(&self) -> usize {
        self.messages
            .iter()
            .rev()
            .take_while(|m| m.role() != Role::User)
            .filter(|m| m.role() == Role::Assistant)
            .count()
    }

    /// Every message except the system preamble.
    pub fn without_system(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role() != Role::System)
    }

    fn append(&mut self, message: Message) -> &Message {
        self.updated_at = Utc::now();
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_starts_with_single_system_message() {
        let conv = Conversation::new("You are a debugger assistant");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages()[0].role(), Role::System);
        assert_eq!(conv.messages()[0].text(), "You are a debugger assistant");
    }

    #[test]
    fn conversation_tracks_updates() {
        let mut conv = Conversation::new("system");
        let created = conv.created_at;

        conv.push_user("First message");
        assert_eq!(conv.len(), 2);
        assert!(conv.updated_at >= created);
    }

    #[test]
    fn turn_count_resets_after_user_message() {
        let mut conv = Conversation::new("system");
        conv.push_user("hi");
        conv.push_assistant("", vec![ToolCallRequest::new("c1", "get_source_code", "{}")]);
        conv.push_assistant("done", vec![]);
        assert_eq!(conv.assistant_turns_since_last_user(), 2);

        conv.push_user("again");
        assert_eq!(conv.assistant_turns_since_last_user(), 0);
    }

    #[test]
    fn assistant_turn_index_is_one_based_per_user_turn() {
        let mut conv = Conversation::new("system");
        conv.push_user("hi");
        conv.push_assistant("a", vec![]);
        conv.push_assistant("b", vec![]);
        conv.push_user("again");
        let last = conv.push_assistant("c", vec![]);
        assert!(matches!(last, Message::Assistant { turn_index: 1, .. }));
    }

    #[test]
    fn tool_result_text_is_result_payload() {
        let req = ToolCallRequest::new("call_1", "stdin_write", r#"{"text":"5"}"#);
        let msg = Message::tool_result(req.clone(), "You guessed 5");
        assert_eq!(msg.role(), Role::Tool);
        assert_eq!(msg.text(), "You guessed 5");
        assert!(msg.tool_call_requests().is_empty());
        match msg {
            Message::ToolResult { request, .. } => assert_eq!(request.id(), "call_1"),
            _ => panic!("Expected ToolResult"),
        }
    }

    #[test]
    fn message_serialization_is_tagged_by_role() {
        let msg = Message::user("Test message");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["text"], "Test message");
    }

    #[test]
    fn without_system_skips_preamble() {
        let mut conv = Conversation::new("secret prompt");
        conv.push_user("hello");
        let rest: Vec<_> = conv.without_system().collect();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].role(), Role::User);
    }
}
