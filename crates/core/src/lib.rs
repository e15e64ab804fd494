//! # dbgagent Core
//!
//! Domain types, traits, and error definitions for the dbgagent debugging
//! assistant. This crate performs no I/O; it defines the domain model that
//! all other crates implement against.
//!
//! Every collaborator of the agent loop (LLM client, tools) is a trait here.
//! Implementations live in their respective crates, so tests can swap in
//! scripted clients and fake tools.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{DebuggerError, Error, ProviderError, Result, ToolError};
pub use event::{AgentEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, Role, ToolCallRequest};
pub use provider::{AssistantReply, LlmClient, ToolDeclaration, Usage};
pub use tool::{Tool, ToolRegistry};
