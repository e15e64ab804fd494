pub mod chat;
pub mod doctor;
pub mod eval;
pub mod init;
pub mod tools;

use std::sync::Arc;

use anyhow::Context;
use dbgagent_agent::{AgentLoop, system_prompt};
use dbgagent_config::AppConfig;
use dbgagent_core::event::EventBus;
use dbgagent_core::provider::LlmClient;
use dbgagent_debugger::SessionContext;
use dbgagent_providers::OpenAiCompatClient;
use tokio_util::sync::CancellationToken;

/// One debugging session: the shared tool context plus the loop that owns
/// the conversation.
pub struct Session {
    pub ctx: Arc<SessionContext>,
    pub agent: AgentLoop,
}

/// Build a fresh session from configuration. Nothing is launched until the
/// model calls `run`.
pub fn build_session(
    config: &AppConfig,
    client: Arc<dyn LlmClient>,
    event_bus: Arc<EventBus>,
    cancel: CancellationToken,
) -> anyhow::Result<Session> {
    let ctx = Arc::new(SessionContext::from_config(config));
    let tools = dbgagent_tools::registry_for(&ctx, &config.tools.enabled)
        .context("Invalid tools.enabled in config")?;

    let max_turns = config.agent.max_turns as usize;
    let agent = AgentLoop::new(
        client,
        Arc::new(tools),
        system_prompt(&config.project.source_file, max_turns),
    )
    .with_max_turns(max_turns)
    .with_event_bus(event_bus)
    .with_cancellation(cancel);

    Ok(Session { ctx, agent })
}

/// The configured LLM client, with setup instructions when no key is set.
pub fn client_from_config(config: &AppConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    if config.api_key.is_none() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export OPENROUTER_API_KEY='sk-or-v1-...'   (recommended)");
        eprintln!("    export DBGAGENT_API_KEY='sk-...'           (any compatible endpoint)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
    }
    let client = OpenAiCompatClient::from_config(config)?;
    Ok(Arc::new(client))
}
