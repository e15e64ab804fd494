//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let the agent act on the debugging session:
//! read the inspected source, set breakpoints, run the program, feed it input.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use crate::error::ToolError;
use crate::message::ToolCallRequest;
use crate::provider::ToolDeclaration;

/// The core Tool trait.
///
/// Each tool parses its own JSON arguments, so a malformed payload is reported
/// by the tool that understands the schema.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_source_code").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the raw JSON argument string from the model.
    async fn invoke(&self, arguments_json: &str) -> std::result::Result<String, ToolError>;

    /// Convert this tool into a declaration for sending to the LLM.
    fn to_declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Parse a tool's JSON argument string into its typed form.
///
/// An empty string is treated as `{}` so argument-less tools accept it.
pub fn parse_arguments<T: DeserializeOwned>(
    tool_name: &str,
    arguments_json: &str,
) -> std::result::Result<T, ToolError> {
    let raw = if arguments_json.trim().is_empty() {
        "{}"
    } else {
        arguments_json
    };
    serde_json::from_str(raw).map_err(|e| ToolError::invalid_arguments(tool_name, e.to_string()))
}

/// An ordered registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool declarations to send to the LLM (in registration order)
/// 2. Look up and invoke tools when the LLM requests them
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name, keeping its slot.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// All tool declarations, in registration order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|t| t.to_declaration()).collect()
    }

    /// Dispatch a request to the tool it names.
    pub async fn invoke(&self, request: &ToolCallRequest) -> std::result::Result<String, ToolError> {
        let tool = self
            .get(request.name())
            .ok_or_else(|| ToolError::NotFound(request.name().to_string()))?;
        tool.invoke(request.arguments_json()).await
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
