//! Source tool: the inspected C file with line numbers.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dbgagent_core::error::ToolError;
use dbgagent_core::tool::Tool;
use dbgagent_debugger::SessionContext;

pub struct GetSourceCodeTool {
    ctx: Arc<SessionContext>,
}

impl GetSourceCodeTool {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

/// Prefix each line with its 1-based number: `"1: int main() {"`.
pub fn number_lines(content: &str) -> String {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| format!("{}: {}", idx + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read `path` and return it with line numbers.
pub async fn numbered_source(path: &Path) -> Result<String, ToolError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ToolError::SourceUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(number_lines(&content))
}

#[async_trait]
impl Tool for GetSourceCodeTool {
    fn name(&self) -> &str {
        "get_source_code"
    }

    fn description(&self) -> &str {
        "Get the source code of the program you inspect. Each line is prefixed with the line number"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn invoke(&self, _arguments_json: &str) -> Result<String, ToolError> {
        numbered_source(self.ctx.source_path()).await
    }
}
