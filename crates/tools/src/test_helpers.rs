//! Shared test fixtures for tool tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dbgagent_debugger::{DebuggerSession, SessionContext, SettleDelays};

/// A temp directory holding a source file, a fake "binary" and a context
/// whose debugger is `sh` running that binary as a line-echo script.
pub struct Fixture {
    pub _dir: tempfile::TempDir,
    pub ctx: Arc<SessionContext>,
}

pub fn fixture(source: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("game.c");
    std::fs::write(&source_path, source).unwrap();

    let binary_path = dir.path().join("game");
    std::fs::write(
        &binary_path,
        "echo '(lldb) target create game'\nwhile IFS= read -r line; do echo \"(lldb) $line\"; done\n",
    )
    .unwrap();

    let ctx = context_for(source_path, binary_path);
    Fixture { _dir: dir, ctx }
}

pub fn context_for(source_path: PathBuf, binary_path: PathBuf) -> Arc<SessionContext> {
    let debugger = DebuggerSession::new("sh").with_startup_delay(Duration::from_millis(20));
    Arc::new(SessionContext::new(
        source_path,
        binary_path,
        Arc::new(debugger),
        SettleDelays {
            command: Duration::from_millis(100),
            run: Duration::from_millis(100),
        },
    ))
}
