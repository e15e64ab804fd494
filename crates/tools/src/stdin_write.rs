//! Stdin tool: feed one line of input to the debugged program.
//!
//! While the program runs under LLDB in the foreground, anything written to
//! the debugger's stdin reaches the program.

use std::sync::Arc;

use async_trait::async_trait;
use dbgagent_core::error::ToolError;
use dbgagent_core::tool::{Tool, parse_arguments};
use dbgagent_debugger::SessionContext;
use serde::Deserialize;

pub struct StdinWriteTool {
    ctx: Arc<SessionContext>,
}

impl StdinWriteTool {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct StdinArgs {
    text: String,
}

#[async_trait]
impl Tool for StdinWriteTool {
    fn name(&self) -> &str {
        "stdin_write"
    }

    fn description(&self) -> &str {
        "Write EXACTLY the provided text to the program's stdin. The `text` value is the literal \
         bytes to send (e.g., \"run\\n\"). Do NOT wrap it in JSON or add keys like `command`. \
         Returns the debugger output after the input was processed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Literal stdin payload. Example: \"run\\n\" (not {\"command\":\"run\"})."
                }
            },
            "required": ["text"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, arguments_json: &str) -> Result<String, ToolError> {
        let args: StdinArgs = parse_arguments(self.name(), arguments_json)?;

        let debugger = self.ctx.debugger();
        debugger.send_command(&args.text).await?;
        tokio::time::sleep(self.ctx.delays().command).await;
        Ok(debugger.transcript_text())
    }
}
