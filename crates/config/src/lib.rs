//! Configuration loading, validation, and management for dbgagent.
//!
//! Loads configuration from `~/.dbgagent/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.dbgagent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the LLM endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Debugger subprocess settings
    #[serde(default)]
    pub debugger: DebuggerConfig,

    /// Inspected program layout
    #[serde(default)]
    pub project: ProjectConfig,

    /// Tool exposure
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Eval harness settings
    #[serde(default)]
    pub evals: EvalsConfig,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4.5".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("agent", &self.agent)
            .field("debugger", &self.debugger)
            .field("project", &self.project)
            .field("tools", &self.tools)
            .field("evals", &self.evals)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum assistant turns after one user message before the loop is cut off
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

fn default_max_turns() -> u32 {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

/// Debugger launch settings and the fixed settle delays that stand in for
/// command-completion detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebuggerConfig {
    /// Debugger executable, resolved through PATH
    #[serde(default = "default_debugger_binary")]
    pub binary: String,

    /// Wait after launching the debugger before it is considered ready
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,

    /// Wait after writing a command before snapshotting the transcript
    #[serde(default = "default_command_settle_ms")]
    pub command_settle_ms: u64,

    /// Wait after `run` before snapshotting the transcript
    #[serde(default = "default_run_settle_ms")]
    pub run_settle_ms: u64,
}

fn default_debugger_binary() -> String {
    "lldb".into()
}
fn default_startup_delay_ms() -> u64 {
    500
}
fn default_command_settle_ms() -> u64 {
    1000
}
fn default_run_settle_ms() -> u64 {
    2000
}

impl DebuggerConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn command_settle(&self) -> Duration {
        Duration::from_millis(self.command_settle_ms)
    }

    pub fn run_settle(&self) -> Duration {
        Duration::from_millis(self.run_settle_ms)
    }
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            binary: default_debugger_binary(),
            startup_delay_ms: default_startup_delay_ms(),
            command_settle_ms: default_command_settle_ms(),
            run_settle_ms: default_run_settle_ms(),
        }
    }
}

/// Where the inspected C program lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Directory holding the source and the compiled binary; relative paths
    /// are resolved against the working directory
    #[serde(default = "default_project_root")]
    pub root: PathBuf,

    #[serde(default = "default_source_file")]
    pub source_file: String,

    #[serde(default = "default_binary_file")]
    pub binary_file: String,
}

fn default_project_root() -> PathBuf {
    PathBuf::from("inspected_program")
}
fn default_source_file() -> String {
    "game.c".into()
}
fn default_binary_file() -> String {
    "game".into()
}

impl ProjectConfig {
    pub fn source_path(&self) -> PathBuf {
        self.root.join(&self.source_file)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.root.join(&self.binary_file)
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_project_root(),
            source_file: default_source_file(),
            binary_file: default_binary_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Tool names exposed to the model, in declaration order
    #[serde(default = "default_enabled_tools")]
    pub enabled: Vec<String>,
}

fn default_enabled_tools() -> Vec<String> {
    vec![
        "get_source_code".into(),
        "stdin_write".into(),
        "set_breakpoint".into(),
        "run".into(),
    ]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_tools(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalsConfig {
    /// Directory whose sub-directories are eval scenarios
    #[serde(default = "default_evals_dir")]
    pub dir: PathBuf,
}

fn default_evals_dir() -> PathBuf {
    PathBuf::from("evals")
}

impl Default for EvalsConfig {
    fn default() -> Self {
        Self {
            dir: default_evals_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.dbgagent/config.toml).
    ///
    /// Also checks environment variables:
    /// - `DBGAGENT_API_KEY` (highest priority), then `OPENROUTER_API_KEY`
    /// - `DBGAGENT_MODEL`, `DBGAGENT_BASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injected for tests).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("DBGAGENT_API_KEY").or_else(|| lookup("OPENROUTER_API_KEY")) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }

        if let Some(model) = lookup("DBGAGENT_MODEL") {
            self.model = model;
        }

        if let Some(url) = lookup("DBGAGENT_BASE_URL") {
            self.base_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".dbgagent")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be at least 1".into(),
            ));
        }

        if self.debugger.binary.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "debugger.binary must not be empty".into(),
            ));
        }

        if self.tools.enabled.is_empty() {
            return Err(ConfigError::ValidationError(
                "tools.enabled must list at least one tool".into(),
            ));
        }

        Ok(())
    }

    /// The API key, or a configuration error naming where to put one.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            agent: AgentConfig::default(),
            debugger: DebuggerConfig::default(),
            project: ProjectConfig::default(),
            tools: ToolsConfig::default(),
            evals: EvalsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No API key configured: set OPENROUTER_API_KEY or api_key in config.toml")]
    MissingApiKey,
}
