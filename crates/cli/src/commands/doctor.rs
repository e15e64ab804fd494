//! `dbgagent doctor`: Diagnose the debugging environment.

use std::path::{Path, PathBuf};

use dbgagent_config::AppConfig;

pub async fn run(config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    println!("🩺 dbgagent Doctor — Environment Diagnostics");
    println!("============================================\n");

    let mut issues = 0;

    let default_path = AppConfig::config_dir().join("config.toml");
    let path = config_path.unwrap_or(&default_path);
    if path.exists() {
        println!("  ✅ Config file found at {}", path.display());
    } else {
        println!("  ⚠️  No config file at {} — using defaults", path.display());
    }

    let config = match AppConfig::load_with_env(path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running other checks.");
            return Ok(());
        }
    };

    if config.api_key.is_some() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set OPENROUTER_API_KEY or api_key in config.toml");
        issues += 1;
    }

    let source = config.project.source_path();
    if source.is_file() {
        println!("  ✅ Source file: {}", source.display());
    } else {
        println!("  ❌ Source file missing: {}", source.display());
        issues += 1;
    }

    let binary = config.project.binary_path();
    if binary.is_file() {
        println!("  ✅ Program binary: {}", binary.display());
    } else {
        println!("  ❌ Program binary missing: {} (compile it with -g)", binary.display());
        issues += 1;
    }

    match find_on_path(&config.debugger.binary) {
        Some(found) => println!("  ✅ Debugger: {}", found.display()),
        None => {
            println!("  ❌ Debugger `{}` not found on PATH", config.debugger.binary);
            issues += 1;
        }
    }

    if config.evals.dir.is_dir() {
        println!("  ✅ Evals directory: {}", config.evals.dir.display());
    } else {
        println!("  ⚠️  No evals directory at {}", config.evals.dir.display());
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Resolve `program` the way the OS would when spawning it.
fn find_on_path(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn finds_sh_on_path() {
        assert!(find_on_path("sh").is_some());
    }

    #[test]
    fn missing_program_is_none() {
        assert!(find_on_path("dbgagent-no-such-debugger").is_none());
    }

    #[test]
    fn explicit_path_is_checked_directly() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("lldb");
        std::fs::write(&program, "").unwrap();
        assert_eq!(find_on_path(program.to_str().unwrap()), Some(program));
    }
}
