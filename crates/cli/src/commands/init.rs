//! `dbgagent init`: Write a default config file.

use std::path::PathBuf;

use anyhow::Context;
use dbgagent_config::AppConfig;

pub fn run(config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    let path = config_path
        .cloned()
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    if path.exists() {
        println!("\n⚠️  Config already exists at: {}", path.display());
        println!("   Edit it manually or delete it and re-run init.\n");
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created config.toml at: {}", path.display());
    println!("\n📝 Next steps:");
    println!("   1. Export OPENROUTER_API_KEY or add api_key to {}", path.display());
    println!("   2. Point [project] at your C source and its debug build");
    println!("   3. Run: dbgagent doctor, then dbgagent chat\n");

    Ok(())
}
