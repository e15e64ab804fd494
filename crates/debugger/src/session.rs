//! A long-lived debugger subprocess driven over line-based stdin/stdout.
//!
//! Commands are fire-and-forget: there is no correlation between a written
//! line and the output it causes, and LLDB prints no "command finished"
//! marker. Callers wait a fixed settle delay and then snapshot the transcript.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dbgagent_core::DebuggerError;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::Breakpoint;

/// How long `stop()` waits for the debugger to exit after its stdin closes.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// How long `stop()` lets the reader tasks drain the pipes before aborting them.
const READER_DRAIN: Duration = Duration::from_millis(200);

/// Lifecycle of a session. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Running,
    Stopped,
}

/// A command written to the debugger, kept for inspection.
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub command: String,
    pub sent_at: DateTime<Utc>,
}

/// The accumulated output of the debugger, shared with the reader tasks.
///
/// Writers hold the lock only for a push; readers only for a clone.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Transcript {
    fn push(&self, line: String) {
        lock(&self.lines).push(line);
    }

    /// A copy of every line received so far.
    pub fn snapshot(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    /// The transcript as one newline-joined string.
    pub fn text(&self) -> String {
        lock(&self.lines).join("\n")
    }

    pub fn len(&self) -> usize {
        lock(&self.lines).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct Process {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    readers: Vec<JoinHandle<()>>,
}

/// Owns one debugger subprocess for the lifetime of a chat session.
pub struct DebuggerSession {
    debugger_binary: String,
    startup_delay: Duration,
    state: Arc<Mutex<SessionState>>,
    process: tokio::sync::Mutex<Process>,
    transcript: Transcript,
    history: Mutex<Vec<CommandRecord>>,
    lines_tx: broadcast::Sender<String>,
}

impl DebuggerSession {
    /// A session that will launch `debugger_binary` on `start`.
    pub fn new(debugger_binary: impl Into<String>) -> Self {
        let (lines_tx, _) = broadcast::channel(1024);
        Self {
            debugger_binary: debugger_binary.into(),
            startup_delay: Duration::from_millis(500),
            state: Arc::new(Mutex::new(SessionState::NotStarted)),
            process: tokio::sync::Mutex::new(Process::default()),
            transcript: Transcript::default(),
            history: Mutex::new(Vec::new()),
            lines_tx,
        }
    }

    /// Set how long `start` waits for the debugger to become ready.
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Launch `<debugger> <binary_path>`, apply `initial_breakpoints`, and wait
    /// the startup delay.
    pub async fn start(
        &self,
        binary_path: &Path,
        initial_breakpoints: &[Breakpoint],
    ) -> Result<(), DebuggerError> {
        let mut process = self.process.lock().await;

        {
            let mut state = lock(&self.state);
            if *state != SessionState::NotStarted {
                return Err(DebuggerError::AlreadyStarted);
            }

            let mut child = Command::new(&self.debugger_binary)
                .arg(binary_path)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| DebuggerError::Spawn {
                    binary: self.debugger_binary.clone(),
                    reason: e.to_string(),
                })?;

            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| DebuggerError::Io("debugger stdout was not captured".into()))?;
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| DebuggerError::Io("debugger stderr was not captured".into()))?;
            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| DebuggerError::Io("debugger stdin was not captured".into()))?;

            // Running must be visible before the stdout reader can observe EOF.
            *state = SessionState::Running;

            process.readers.push(self.spawn_reader(stdout, "stdout", true));
            process.readers.push(self.spawn_reader(stderr, "stderr", false));
            process.stdin = Some(stdin);
            process.child = Some(child);
        }

        info!(
            debugger = %self.debugger_binary,
            binary = %binary_path.display(),
            breakpoints = initial_breakpoints.len(),
            "Debugger session started"
        );

        for bp in initial_breakpoints {
            self.write_line(&mut process, &bp.command()).await?;
        }
        drop(process);

        tokio::time::sleep(self.startup_delay).await;
        Ok(())
    }

    /// Write one line to the debugger's stdin and flush. Does not wait for output.
    pub async fn send_command(&self, text: &str) -> Result<(), DebuggerError> {
        let mut process = self.process.lock().await;
        if self.state() != SessionState::Running {
            return Err(DebuggerError::NotRunning);
        }
        self.write_line(&mut process, text).await
    }

    /// A handle onto the shared transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The full transcript as one string.
    pub fn transcript_text(&self) -> String {
        self.transcript.text()
    }

    /// Every command written so far, in order.
    pub fn command_history(&self) -> Vec<CommandRecord> {
        lock(&self.history).clone()
    }

    /// Receive each transcript line as it arrives.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.lines_tx.subscribe()
    }

    /// Close stdin, give the debugger a moment to exit, then kill it.
    ///
    /// Never fails; calling it again (or before `start`) just leaves the
    /// session `Stopped`.
    pub async fn stop(&self) {
        let mut process = self.process.lock().await;

        if let Some(mut stdin) = process.stdin.take() {
            if let Err(e) = stdin.shutdown().await {
                debug!(error = %e, "Closing debugger stdin failed");
            }
        }

        if let Some(mut child) = process.child.take() {
            match tokio::time::timeout(STOP_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "Debugger exited"),
                Ok(Err(e)) => debug!(error = %e, "Waiting for debugger failed"),
                Err(_) => {
                    warn!("Debugger did not exit after stdin closed, killing it");
                    if let Err(e) = child.start_kill() {
                        debug!(error = %e, "Killing debugger failed");
                    }
                    if let Err(e) = child.wait().await {
                        debug!(error = %e, "Reaping debugger failed");
                    }
                }
            }
        }

        // The pipes close once the child is reaped; let the readers flush what is left.
        for reader in process.readers.drain(..) {
            let abort = reader.abort_handle();
            if tokio::time::timeout(READER_DRAIN, reader).await.is_err() {
                debug!("Debugger output reader did not finish, aborting it");
                abort.abort();
            }
        }

        *lock(&self.state) = SessionState::Stopped;
    }

    async fn write_line(&self, process: &mut Process, text: &str) -> Result<(), DebuggerError> {
        let stdin = process.stdin.as_mut().ok_or(DebuggerError::NotRunning)?;
        let line = text.strip_suffix('\n').unwrap_or(text);
        let line = line.strip_suffix('\r').unwrap_or(line);

        debug!(command = %line, "Sending debugger command");
        stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| DebuggerError::Io(e.to_string()))?;
        stdin
            .flush()
            .await
            .map_err(|e| DebuggerError::Io(e.to_string()))?;

        lock(&self.history).push(CommandRecord {
            command: line.to_string(),
            sent_at: Utc::now(),
        });
        Ok(())
    }

    fn spawn_reader<R>(&self, stream: R, label: &'static str, marks_exit: bool) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let transcript = self.transcript.clone();
        let lines_tx = self.lines_tx.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            let mut reader = BufReader::new(stream);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        // Program output may be any bytes, not just UTF-8.
                        let line = String::from_utf8_lossy(&buf)
                            .trim_end_matches(['\r', '\n'])
                            .to_string();
                        if line.is_empty() {
                            continue;
                        }
                        debug!("[debugger][{label}] {line}");
                        transcript.push(line.clone());
                        let _ = lines_tx.send(line);
                    }
                    Err(e) => {
                        debug!(error = %e, "[debugger][{label}] read failed");
                        break;
                    }
                }
            }

            if marks_exit {
                debug!("[debugger] stdout closed, session stopped");
                *lock(&state) = SessionState::Stopped;
            }
        })
    }
}

/// Lock a std mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    /// Writes a tiny line-echoing "debugger" script and returns (dir, script path).
    /// The session is launched as `sh <script>`.
    fn echo_debugger() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake_lldb.sh");
        std::fs::write(
            &script,
            "echo ready\nwhile IFS= read -r line; do echo \"got: $line\"; done\n",
        )
        .unwrap();
        (dir, script)
    }

    fn session() -> DebuggerSession {
        DebuggerSession::new("sh").with_startup_delay(Duration::from_millis(50))
    }

    async fn wait_for_line(session: &DebuggerSession, needle: &str) -> bool {
        for _ in 0..100 {
            if session.transcript_text().contains(needle) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn new_session_is_not_started() {
        let session = session();
        assert_eq!(session.state(), SessionState::NotStarted);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn send_before_start_fails() {
        let session = session();
        let err = session.send_command("run").await.unwrap_err();
        assert!(matches!(err, DebuggerError::NotRunning));
    }

    #[tokio::test]
    async fn start_collects_output_and_echoes_commands() {
        let (_dir, script) = echo_debugger();
        let session = session();
        session.start(&script, &[]).await.unwrap();
        assert_eq!(session.state(), SessionState::Running);

        session.send_command("breakpoint list").await.unwrap();
        assert!(wait_for_line(&session, "got: breakpoint list").await);
        assert!(session.transcript().snapshot().contains(&"ready".to_string()));

        session.stop().await;
    }

    #[tokio::test]
    async fn initial_breakpoints_are_sent_on_start() {
        let (_dir, script) = echo_debugger();
        let session = session();
        let bps = [
            Breakpoint::new(NonZeroU32::new(7).unwrap()),
            Breakpoint::new(NonZeroU32::new(12).unwrap()),
        ];
        session.start(&script, &bps).await.unwrap();

        let history: Vec<_> = session
            .command_history()
            .into_iter()
            .map(|r| r.command)
            .collect();
        assert_eq!(
            history,
            vec!["breakpoint set --line 7", "breakpoint set --line 12"]
        );
        assert!(wait_for_line(&session, "got: breakpoint set --line 12").await);

        session.stop().await;
    }

    #[tokio::test]
    async fn trailing_newline_is_not_doubled() {
        let (_dir, script) = echo_debugger();
        let session = session();
        session.start(&script, &[]).await.unwrap();

        session.send_command("run\n").await.unwrap();
        assert_eq!(session.command_history()[0].command, "run");

        session.stop().await;
    }

    #[tokio::test]
    async fn start_twice_fails_with_already_started() {
        let (_dir, script) = echo_debugger();
        let session = session();
        session.start(&script, &[]).await.unwrap();

        let err = session.start(&script, &[]).await.unwrap_err();
        assert!(matches!(err, DebuggerError::AlreadyStarted));

        session.stop().await;
        let err = session.start(&script, &[]).await.unwrap_err();
        assert!(matches!(err, DebuggerError::AlreadyStarted));
    }

    #[tokio::test]
    async fn stop_twice_is_harmless() {
        let (_dir, script) = echo_debugger();
        let session = session();
        session.start(&script, &[]).await.unwrap();

        session.stop().await;
        assert_eq!(session.state(), SessionState::Stopped);
        session.stop().await;
        assert_eq!(session.state(), SessionState::Stopped);

        let err = session.send_command("run").await.unwrap_err();
        assert!(matches!(err, DebuggerError::NotRunning));
    }

    #[tokio::test]
    async fn stop_before_start_marks_stopped() {
        let session = session();
        session.stop().await;
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn missing_debugger_binary_is_spawn_error() {
        let session = DebuggerSession::new("/nonexistent/dbgagent-lldb");
        let err = session
            .start(Path::new("/tmp/game"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DebuggerError::Spawn { .. }));
        assert_eq!(session.state(), SessionState::NotStarted);
    }

    #[tokio::test]
    async fn process_exit_moves_to_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("exits.sh");
        std::fs::write(&script, "echo bye\n").unwrap();

        let session = session();
        session.start(&script, &[]).await.unwrap();
        for _ in 0..100 {
            if session.state() == SessionState::Stopped {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.transcript_text().contains("bye"));
        session.stop().await;
    }

    #[tokio::test]
    async fn invalid_utf8_output_keeps_the_session_alive() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("garbage.sh");
        std::fs::write(
            &script,
            "printf 'garbage \\377\\376\\n'\necho after\nwhile IFS= read -r line; do echo \"got: $line\"; done\n",
        )
        .unwrap();

        let session = session();
        session.start(&script, &[]).await.unwrap();
        assert!(wait_for_line(&session, "after").await);
        assert_eq!(session.state(), SessionState::Running);

        let first = &session.transcript().snapshot()[0];
        assert!(first.starts_with("garbage "));
        assert!(first.contains('\u{FFFD}'));

        session.send_command("bt").await.unwrap();
        assert!(wait_for_line(&session, "got: bt").await);

        session.stop().await;
    }

    #[tokio::test]
    async fn stop_keeps_output_still_in_the_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("farewell.sh");
        std::fs::write(
            &script,
            "while IFS= read -r line; do echo \"got: $line\"; done\necho farewell\n",
        )
        .unwrap();

        let session = session();
        session.start(&script, &[]).await.unwrap();
        session.stop().await;

        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.transcript_text().contains("farewell"));
    }

    #[tokio::test]
    async fn subscribers_see_new_lines() {
        let (_dir, script) = echo_debugger();
        let session = session();
        let mut rx = session.subscribe();
        session.start(&script, &[]).await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, "ready");

        session.stop().await;
    }
}
