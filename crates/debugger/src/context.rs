//! Per-chat-session state shared by every tool.

use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dbgagent_config::AppConfig;

use crate::session::DebuggerSession;

/// A source-line breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Breakpoint {
    line: NonZeroU32,
}

impl Breakpoint {
    pub fn new(line: NonZeroU32) -> Self {
        Self { line }
    }

    pub fn line(&self) -> u32 {
        self.line.get()
    }

    /// The LLDB command that sets this breakpoint.
    pub fn command(&self) -> String {
        format!("breakpoint set --line {}", self.line)
    }
}

/// Fixed waits used in place of command-completion detection.
#[derive(Debug, Clone, Copy)]
pub struct SettleDelays {
    pub command: Duration,
    pub run: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            command: Duration::from_millis(1000),
            run: Duration::from_millis(2000),
        }
    }
}

/// Everything one chat session owns besides the conversation itself.
///
/// Built once per session and handed to each tool at construction.
pub struct SessionContext {
    source_path: PathBuf,
    binary_path: PathBuf,
    breakpoints: Mutex<BTreeSet<Breakpoint>>,
    debugger: Arc<DebuggerSession>,
    delays: SettleDelays,
}

impl SessionContext {
    pub fn new(
        source_path: impl Into<PathBuf>,
        binary_path: impl Into<PathBuf>,
        debugger: Arc<DebuggerSession>,
        delays: SettleDelays,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            binary_path: binary_path.into(),
            breakpoints: Mutex::new(BTreeSet::new()),
            debugger,
            delays,
        }
    }

    /// Build a fresh session (new debugger, no breakpoints) from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let debugger = DebuggerSession::new(config.debugger.binary.clone())
            .with_startup_delay(config.debugger.startup_delay());
        Self::new(
            config.project.source_path(),
            config.project.binary_path(),
            Arc::new(debugger),
            SettleDelays {
                command: config.debugger.command_settle(),
                run: config.debugger.run_settle(),
            },
        )
    }

    pub fn source_path(&self) -> &PathBuf {
        &self.source_path
    }

    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    pub fn debugger(&self) -> &Arc<DebuggerSession> {
        &self.debugger
    }

    pub fn delays(&self) -> SettleDelays {
        self.delays
    }

    /// Record a breakpoint. Returns false if it was already set.
    pub fn add_breakpoint(&self, breakpoint: Breakpoint) -> bool {
        self.breakpoints
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(breakpoint)
    }

    /// All recorded breakpoints, ordered by line.
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.breakpoints
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .copied()
            .collect()
    }
}
