//! dbgagent CLI: the main entry point.
//!
//! Commands:
//! - `chat`:    Debug the configured program with the agent
//! - `eval`:    Run scripted eval scenarios and judge them
//! - `doctor`:  Check the environment
//! - `tools`:   Print the tool declarations sent to the model
//! - `init`:    Write a default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dbgagent_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "dbgagent",
    about = "dbgagent — an LLM agent that debugs C programs through LLDB",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml (default: ~/.dbgagent/config.toml)
    #[arg(short, long, global = true, env = "DBGAGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the debugging agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Also print every line the debugger writes
        #[arg(long)]
        debugger_output: bool,
    },

    /// Run the eval scenarios under a directory
    Eval {
        /// Evals directory (default: evals.dir from config)
        dir: Option<PathBuf>,

        /// Run only the scenario with this directory name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Diagnose the environment
    Doctor,

    /// Print the enabled tool declarations as JSON
    Tools,

    /// Write a default config file
    Init,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path)?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            debugger_output,
        } => {
            let config = load_config(cli.config.as_ref())?;
            commands::chat::run(&config, message, debugger_output).await?
        }
        Commands::Eval { dir, name } => {
            let config = load_config(cli.config.as_ref())?;
            commands::eval::run(&config, dir, name).await?
        }
        Commands::Tools => {
            let config = load_config(cli.config.as_ref())?;
            commands::tools::run(&config)?
        }
        Commands::Doctor => commands::doctor::run(cli.config.as_ref()).await?,
        Commands::Init => commands::init::run(cli.config.as_ref())?,
    }

    Ok(())
}
