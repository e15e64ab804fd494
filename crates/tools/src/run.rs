//! Run tool: launch the debugger on the inspected binary and start it.

use std::sync::Arc;

use async_trait::async_trait;
use dbgagent_core::error::ToolError;
use dbgagent_core::tool::Tool;
use dbgagent_debugger::SessionContext;
use tracing::info;

pub struct RunTool {
    ctx: Arc<SessionContext>,
}

impl RunTool {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for RunTool {
    fn name(&self) -> &str {
        "run"
    }

    fn description(&self) -> &str {
        "Run the program under the debugger. Breakpoints set beforehand are applied first. \
         Returns the debugger output so far. The program can only be started once per session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn invoke(&self, _arguments_json: &str) -> Result<String, ToolError> {
        let binary = self.ctx.binary_path();
        if !binary.exists() {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().to_string(),
                reason: format!("program binary not found at {}", binary.display()),
            });
        }

        let breakpoints = self.ctx.breakpoints();
        info!(breakpoints = breakpoints.len(), "Launching inspected program");

        let debugger = self.ctx.debugger();
        debugger.start(binary, &breakpoints).await?;
        debugger.send_command("run").await?;
        tokio::time::sleep(self.ctx.delays().run).await;
        Ok(debugger.transcript_text())
    }
}
