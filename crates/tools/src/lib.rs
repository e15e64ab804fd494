//! Built-in tool implementations for dbgagent.
//!
//! Tools let the agent inspect the program source and drive the LLDB
//! session: set breakpoints, start the program, and feed it input.
//! Every tool is built from the chat session's shared [`SessionContext`].

pub mod get_source_code;
pub mod lldb_input;
pub mod run;
pub mod set_breakpoint;
pub mod stdin_write;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

use dbgagent_core::error::ToolError;
use dbgagent_core::tool::{Tool, ToolRegistry};
use dbgagent_debugger::SessionContext;

pub use get_source_code::GetSourceCodeTool;
pub use lldb_input::LldbInputTool;
pub use run::RunTool;
pub use set_breakpoint::SetBreakpointTool;
pub use stdin_write::StdinWriteTool;

/// Every tool name this crate can build.
pub const BUILTIN_TOOLS: &[&str] = &[
    "get_source_code",
    "stdin_write",
    "set_breakpoint",
    "run",
    "lldb_input",
];

fn build_tool(name: &str, ctx: &Arc<SessionContext>) -> Option<Box<dyn Tool>> {
    let tool: Box<dyn Tool> = match name {
        "get_source_code" => Box::new(GetSourceCodeTool::new(ctx.clone())),
        "stdin_write" => Box::new(StdinWriteTool::new(ctx.clone())),
        "set_breakpoint" => Box::new(SetBreakpointTool::new(ctx.clone())),
        "run" => Box::new(RunTool::new(ctx.clone())),
        "lldb_input" => Box::new(LldbInputTool::new(ctx.clone())),
        _ => return None,
    };
    Some(tool)
}

/// Build a registry exposing `enabled` tools in the given order.
pub fn registry_for(
    ctx: &Arc<SessionContext>,
    enabled: &[String],
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    for name in enabled {
        let tool = build_tool(name, ctx).ok_or_else(|| ToolError::NotFound(name.clone()))?;
        registry.register(tool);
    }
    Ok(registry)
}
