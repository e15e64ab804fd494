//! Error types for the dbgagent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all dbgagent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- LLM client errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Source file unavailable at {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    #[error(transparent)]
    Debugger(#[from] DebuggerError),
}

impl ToolError {
    /// Shorthand for an argument error raised by the named tool.
    pub fn invalid_arguments(tool_name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool_name: tool_name.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DebuggerError {
    #[error("Debugger session is already running")]
    AlreadyStarted,

    #[error("Debugger session is not running")]
    NotRunning,

    #[error("Failed to spawn debugger '{binary}': {reason}")]
    Spawn { binary: String, reason: String },

    #[error("Debugger I/O failed: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 502,
            message: "Bad gateway".into(),
        });
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad gateway"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::invalid_arguments(
            "set_breakpoint",
            "'line' must be a positive integer",
        ));
        assert!(err.to_string().contains("set_breakpoint"));
        assert!(err.to_string().contains("positive integer"));
    }

    #[test]
    fn debugger_error_passes_through_tool_error() {
        let err = ToolError::from(DebuggerError::NotRunning);
        assert_eq!(err.to_string(), "Debugger session is not running");
    }
}
