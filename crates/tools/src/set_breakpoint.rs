//! Breakpoint tool: record a line breakpoint, applying it at once if the
//! debugger is already running.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use dbgagent_core::error::ToolError;
use dbgagent_core::tool::{Tool, parse_arguments};
use dbgagent_debugger::{Breakpoint, SessionContext};
use serde::Deserialize;
use tracing::debug;

pub struct SetBreakpointTool {
    ctx: Arc<SessionContext>,
}

impl SetBreakpointTool {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct BreakpointArgs {
    line: serde_json::Number,
}

fn parse_line(tool_name: &str, arguments_json: &str) -> Result<NonZeroU32, ToolError> {
    let args: BreakpointArgs = parse_arguments(tool_name, arguments_json)?;
    args.line
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .and_then(NonZeroU32::new)
        .ok_or_else(|| ToolError::invalid_arguments(tool_name, "'line' must be a positive integer"))
}

#[async_trait]
impl Tool for SetBreakpointTool {
    fn name(&self) -> &str {
        "set_breakpoint"
    }

    fn description(&self) -> &str {
        "Set a breakpoint at the specified line number in the source file. The breakpoint will \
         pause execution when that line is reached."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "line": {
                    "type": "integer",
                    "description": "The line number where to set the breakpoint (must be a positive integer)."
                }
            },
            "required": ["line"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, arguments_json: &str) -> Result<String, ToolError> {
        let breakpoint = Breakpoint::new(parse_line(self.name(), arguments_json)?);
        self.ctx.add_breakpoint(breakpoint);

        let debugger = self.ctx.debugger();
        if !debugger.is_running() {
            debug!(line = breakpoint.line(), "Breakpoint recorded for next run");
            return Ok(format!(
                "Breakpoint recorded at line {}. It will be set when the program is run.",
                breakpoint.line()
            ));
        }

        debugger.send_command(&breakpoint.command()).await?;
        tokio::time::sleep(self.ctx.delays().command).await;
        Ok(debugger.transcript_text())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_helpers::fixture;

    #[tokio::test]
    async fn zero_line_is_rejected_without_recording() {
        let fx = fixture("");
        let tool = SetBreakpointTool::new(fx.ctx.clone());
        let err = tool.invoke(r#"{"line": 0}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert!(fx.ctx.breakpoints().is_empty());
    }

    #[tokio::test]
    async fn negative_fractional_and_missing_lines_are_rejected() {
        let fx = fixture("");
        let tool = SetBreakpointTool::new(fx.ctx.clone());
        for args in [r#"{"line": -3}"#, r#"{"line": 2.5}"#, r#"{"line": "7"}"#, "{}"] {
            let err = tool.invoke(args).await.unwrap_err();
            assert!(
                matches!(err, ToolError::InvalidArguments { .. }),
                "{args} should be rejected"
            );
        }
        assert!(fx.ctx.breakpoints().is_empty());
    }

    #[tokio::test]
    async fn records_breakpoint_before_run() {
        let fx = fixture("");
        let tool = SetBreakpointTool::new(fx.ctx.clone());
        let output = tool.invoke(r#"{"line": 12}"#).await.unwrap();
        assert!(output.contains("line 12"));

        let lines: Vec<_> = fx.ctx.breakpoints().iter().map(|b| b.line()).collect();
        assert_eq!(lines, vec![12]);
        assert!(fx.ctx.debugger().command_history().is_empty());
    }

    #[tokio::test]
    async fn running_session_gets_exactly_one_command() {
        let fx = fixture("");
        let debugger = fx.ctx.debugger().clone();
        debugger.start(fx.ctx.binary_path(), &[]).await.unwrap();

        let tool = SetBreakpointTool::new(fx.ctx.clone());
        let output = tool.invoke(r#"{"line": 42}"#).await.unwrap();

        let history = debugger.command_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].command, "breakpoint set --line 42");
        assert!(output.contains("breakpoint set --line 42"));

        debugger.stop().await;
    }
}
