//! `dbgagent eval`: Run scripted debugging scenarios and have the model judge them.
//!
//! Each sub-directory of the evals directory is one scenario:
//!
//! ```text
//! evals/
//!   off-by-one/
//!     user-input.md      the user's message
//!     expected.md        criteria for the judge
//!     chat-history.json  written: the conversation without the system prompt
//!     result.md          written: the judge's verdict, starting PASS or FAIL
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use dbgagent_config::AppConfig;
use dbgagent_core::event::EventBus;
use dbgagent_core::message::{Conversation, Message};
use dbgagent_core::provider::LlmClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Session, build_session, client_from_config};

const USER_INPUT_FILE: &str = "user-input.md";
const EXPECTED_FILE: &str = "expected.md";
const HISTORY_FILE: &str = "chat-history.json";
const RESULT_FILE: &str = "result.md";

const JUDGE_SYSTEM_PROMPT: &str = "You are an evaluation judge. Analyze the chat history and \
determine if the evaluation criteria are met. Your response must start with either PASS or FAIL. \
If FAIL, provide reasoning on a new line.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    /// A judgement passes only if it starts with PASS (any case).
    pub fn from_judgement(text: &str) -> Self {
        let head = text.trim_start();
        if head.get(..4).is_some_and(|w| w.eq_ignore_ascii_case("PASS")) {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail => f.write_str("FAIL"),
        }
    }
}

pub async fn run(
    config: &AppConfig,
    dir: Option<PathBuf>,
    name: Option<String>,
) -> anyhow::Result<()> {
    let evals_dir = dir.unwrap_or_else(|| config.evals.dir.clone());
    let client = client_from_config(config)?;

    let results = run_all(config, client, &evals_dir, name.as_deref()).await?;

    println!();
    println!("  === Evaluation Summary ===");
    for (name, verdict) in &results {
        println!("  {name}: {verdict}");
    }
    println!();

    let failed = results.iter().filter(|(_, v)| *v == Verdict::Fail).count();
    if failed > 0 {
        bail!("{failed} of {} eval(s) failed", results.len());
    }
    Ok(())
}

/// Run every scenario under `evals_dir` in name order, or only the one called `only`.
pub async fn run_all(
    config: &AppConfig,
    client: Arc<dyn LlmClient>,
    evals_dir: &Path,
    only: Option<&str>,
) -> anyhow::Result<Vec<(String, Verdict)>> {
    let mut scenarios = scenario_dirs(evals_dir)
        .await
        .with_context(|| format!("Evals directory not found: {}", evals_dir.display()))?;
    if let Some(only) = only {
        scenarios.retain(|dir| dir.file_name().is_some_and(|n| n == only));
        if scenarios.is_empty() {
            bail!("Eval '{only}' not found in {}", evals_dir.display());
        }
    }
    println!("  Found {} eval(s) to run", scenarios.len());

    let mut results = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let name = scenario
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!();
        println!("  === Running eval: {name} ===");

        let verdict = match run_scenario(config, client.clone(), &scenario).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(eval = %name, error = %e, "Eval failed to run");
                let report = format!("FAIL\n\nError during evaluation: {e:#}");
                tokio::fs::write(scenario.join(RESULT_FILE), report)
                    .await
                    .with_context(|| format!("Failed to write result for {name}"))?;
                Verdict::Fail
            }
        };
        results.push((name, verdict));
    }
    Ok(results)
}

async fn scenario_dirs(evals_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(evals_dir).await?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Run one scenario in a fresh session, record the history, and judge it.
pub async fn run_scenario(
    config: &AppConfig,
    client: Arc<dyn LlmClient>,
    scenario: &Path,
) -> anyhow::Result<Verdict> {
    let user_input = read_required(scenario, USER_INPUT_FILE).await?;
    let expected = read_required(scenario, EXPECTED_FILE).await?;

    let Session { ctx, mut agent } = build_session(
        config,
        client.clone(),
        Arc::new(EventBus::default()),
        CancellationToken::new(),
    )?;

    agent.add_user_message(user_input);
    let outcome = agent.process_last_user_message().await;
    ctx.debugger().stop().await;
    let outcome = outcome?;
    info!(scenario = %scenario.display(), ?outcome, "Eval turn finished");

    let history: Vec<&Message> = agent.conversation().without_system().collect();
    let history_json = serde_json::to_string_pretty(&history)?;
    tokio::fs::write(scenario.join(HISTORY_FILE), history_json).await?;

    let judgement = judge(client.as_ref(), &history, &expected).await?;
    tokio::fs::write(scenario.join(RESULT_FILE), &judgement).await?;

    Ok(Verdict::from_judgement(&judgement))
}

async fn read_required(scenario: &Path, file: &str) -> anyhow::Result<String> {
    let path = scenario.join(file);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("{file} not found in {}", scenario.display()))
}

/// Ask the model, without tools, whether `history` meets `expected`.
async fn judge(
    client: &dyn LlmClient,
    history: &[&Message],
    expected: &str,
) -> anyhow::Result<String> {
    let mut conversation = Conversation::new(JUDGE_SYSTEM_PROMPT);
    conversation.push_user(judge_prompt(history, expected));

    let reply = client.call_model(conversation.messages(), &[]).await?;
    if reply.text.trim().is_empty() {
        return Ok("FAIL\n\nJudge did not return a response".into());
    }
    Ok(reply.text)
}

/// The judge's user prompt: the criteria, then the transcript one message at a time.
pub fn judge_prompt(history: &[&Message], expected: &str) -> String {
    let mut out = String::new();
    out.push_str("Evaluate the following chat history against the criteria:\n\n");
    out.push_str("## Expected Criteria:\n");
    out.push_str(expected.trim_end());
    out.push_str("\n\n## Chat History:\n\n");

    for message in history {
        let _ = writeln!(out, "[{}]", message.role());
        match message {
            Message::Assistant {
                text,
                tool_call_requests,
                ..
            } => {
                if !text.is_empty() {
                    let _ = writeln!(out, "{text}");
                }
                for request in tool_call_requests {
                    let _ = writeln!(
                        out,
                        "Tool Call: {}({})",
                        request.name(),
                        request.arguments_json()
                    );
                }
            }
            Message::ToolResult {
                request, result, ..
            } => {
                let quoted = serde_json::to_string(result).unwrap_or_default();
                let _ = writeln!(out, "Tool Result: {} -> {quoted}", request.name());
            }
            Message::System { text, .. } | Message::User { text, .. } => {
                let _ = writeln!(out, "{text}");
            }
        }
        out.push('\n');
    }

    out.push_str("\nYour response must start with PASS or FAIL. If FAIL, provide reasoning on a new line.\n");
    out
}
