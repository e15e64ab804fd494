//! Raw LLDB command tool. Not enabled by default.

use std::sync::Arc;

use async_trait::async_trait;
use dbgagent_core::error::ToolError;
use dbgagent_core::tool::{Tool, parse_arguments};
use dbgagent_debugger::SessionContext;
use serde::Deserialize;

pub struct LldbInputTool {
    ctx: Arc<SessionContext>,
}

impl LldbInputTool {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct LldbArgs {
    command: String,
}

#[async_trait]
impl Tool for LldbInputTool {
    fn name(&self) -> &str {
        "lldb_input"
    }

    fn description(&self) -> &str {
        "Send an arbitrary command to the LLDB debugger session and return its output"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to send to the LLDB debugger"
                }
            },
            "required": ["command"]
        })
    }

    async fn invoke(&self, arguments_json: &str) -> Result<String, ToolError> {
        let args: LldbArgs = parse_arguments(self.name(), arguments_json)?;
        let debugger = self.ctx.debugger();
        debugger.send_command(&args.command).await?;
        tokio::time::sleep(self.ctx.delays().command).await;
        Ok(debugger.transcript_text())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_helpers::fixture;

    #[tokio::test]
    async fn sends_command_verbatim() {
        let fx = fixture("");
        let debugger = fx.ctx.debugger().clone();
        debugger.start(fx.ctx.binary_path(), &[]).await.unwrap();

        let output = LldbInputTool::new(fx.ctx.clone())
            .invoke(r#"{"command": "frame variable"}"#)
            .await
            .unwrap();
        assert!(output.contains("(lldb) frame variable"));

        debugger.stop().await;
    }

    #[tokio::test]
    async fn missing_command_is_argument_error() {
        let fx = fixture("");
        let err = LldbInputTool::new(fx.ctx.clone())
            .invoke(r#"{"text": "bt"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
