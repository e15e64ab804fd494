//! Debugger subprocess management for dbgagent.
//!
//! [`DebuggerSession`] owns one LLDB process: it starts it, writes
//! line-based commands to it and collects its output into a shared
//! transcript from background reader tasks. [`SessionContext`] bundles the
//! session with the breakpoint set and the inspected program's paths; one is
//! created per chat session and passed to every tool.

pub mod context;
pub mod session;

pub use context::{Breakpoint, SessionContext, SettleDelays};
pub use session::{CommandRecord, DebuggerSession, SessionState, Transcript};
