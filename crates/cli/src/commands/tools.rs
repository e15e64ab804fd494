//! `dbgagent tools`: Print the tool declarations the model will see.

use std::sync::Arc;

use dbgagent_config::AppConfig;
use dbgagent_debugger::SessionContext;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    let ctx = Arc::new(SessionContext::from_config(config));
    let registry = dbgagent_tools::registry_for(&ctx, &config.tools.enabled)?;
    println!("{}", serde_json::to_string_pretty(&registry.declarations())?);
    Ok(())
}
