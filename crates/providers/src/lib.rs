//! LLM client implementations for dbgagent.
//!
//! All clients implement the `dbgagent_core::LlmClient` trait. The agent
//! loop only ever sees the trait object.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;
