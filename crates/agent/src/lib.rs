//! The agent loop: turns one user message into zero or more LLM calls.
//!
//! The loop follows an **Ask → Act → Observe** cycle:
//!
//! 1. **Ask** the LLM client with the whole conversation and the tool declarations
//! 2. **Act**: if the reply requests tools, invoke each one in order
//! 3. **Observe**: append every tool result, then ask again
//!
//! It stops when the model answers with text and no tool calls, or when the
//! turn budget runs out.

pub mod loop_runner;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use loop_runner::{AgentLoop, DEFAULT_MAX_TURNS, TurnOutcome};
pub use prompt::system_prompt;
