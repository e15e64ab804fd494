//! `dbgagent chat`: Interactive or single-message debugging session.

use std::io::Write;
use std::sync::Arc;

use dbgagent_agent::{AgentLoop, TurnOutcome};
use dbgagent_config::AppConfig;
use dbgagent_core::event::{AgentEvent, EventBus};
use dbgagent_core::message::Message;
use dbgagent_core::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{Session, build_session, client_from_config};

/// Tool results longer than this are cut in the terminal view.
const RESULT_PREVIEW_LINES: usize = 12;

pub async fn run(
    config: &AppConfig,
    message: Option<String>,
    debugger_output: bool,
) -> anyhow::Result<()> {
    let client = client_from_config(config)?;
    let event_bus = Arc::new(EventBus::default());
    let cancel = CancellationToken::new();
    let Session { ctx, mut agent } =
        build_session(config, client.clone(), event_bus.clone(), cancel.clone())?;

    if !ctx.source_path().exists() {
        warn!(path = %ctx.source_path().display(), "Source file not found");
    }

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let lines_task = debugger_output.then(|| {
        let mut lines = ctx.debugger().subscribe();
        tokio::spawn(async move {
            loop {
                match lines.recv().await {
                    Ok(line) => eprintln!("  lldb | {line}"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        eprintln!("  lldb | ... {n} lines skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    });

    let mut events = event_bus.subscribe();
    let result = match message {
        Some(text) => run_turn(&mut agent, &mut events, text)
            .await
            .map(|_| ())
            .map_err(anyhow::Error::from),
        None => interactive(config, client.name(), &mut agent, &mut events, &cancel).await,
    };

    ctx.debugger().stop().await;
    if let Some(task) = lines_task {
        task.abort();
    }

    match result {
        Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::Cancelled)) => {
            println!();
            println!("  Cancelled.");
            Ok(())
        }
        other => other,
    }
}

async fn interactive(
    config: &AppConfig,
    client_name: &str,
    agent: &mut AgentLoop,
    events: &mut broadcast::Receiver<Arc<AgentEvent>>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    println!();
    println!("  dbgagent — Interactive Debugging");
    println!();
    println!("  Client:    {client_name}");
    println!("  Model:     {}", config.model);
    println!("  Program:   {}", config.project.binary_path().display());
    println!("  Source:    {}", config.project.source_path().display());
    println!("  Tools:     {}", config.tools.enabled.join(", "));
    println!("  Max turns: {}", agent.max_turns());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = stdin.next_line() => line?,
        };
        let Some(line) = line else { break };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "exit" || text == "quit" {
            break;
        }

        match run_turn(agent, events, text.to_string()).await {
            Ok(_) => {}
            Err(Error::Cancelled) => break,
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Run one user turn, rendering each appended message as it arrives.
async fn run_turn(
    agent: &mut AgentLoop,
    events: &mut broadcast::Receiver<Arc<AgentEvent>>,
    text: String,
) -> Result<TurnOutcome, Error> {
    agent.add_user_message(text);

    let outcome = {
        let turn = agent.process_last_user_message();
        tokio::pin!(turn);
        loop {
            tokio::select! {
                outcome = &mut turn => break outcome,
                Ok(event) = events.recv() => render(&event),
            }
        }
    };
    while let Ok(event) = events.try_recv() {
        render(&event);
    }

    if let Ok(TurnOutcome::BudgetExhausted { assistant_turns }) = &outcome {
        println!("  [Stopped after {assistant_turns} assistant turns without a final answer]");
        println!();
    }
    outcome
}

fn render(event: &AgentEvent) {
    match event {
        AgentEvent::MessageAdded { message, .. } => render_message(message),
        AgentEvent::ToolExecuted {
            tool_name,
            success: false,
            duration_ms,
            ..
        } => eprintln!("  [{tool_name} failed after {duration_ms}ms]"),
        AgentEvent::ToolExecuted { .. } | AgentEvent::TurnBudgetExhausted { .. } => {}
    }
}

fn render_message(message: &Message) {
    match message {
        Message::System { .. } | Message::User { .. } => {}
        Message::Assistant {
            text,
            tool_call_requests,
            ..
        } => {
            if !text.is_empty() {
                println!();
                for line in text.lines() {
                    println!("  Assistant > {line}");
                }
            }
            for request in tool_call_requests {
                println!("  → {}({})", request.name(), request.arguments_json());
            }
            println!();
        }
        Message::ToolResult {
            request, result, ..
        } => {
            println!("  ← {}:", request.name());
            print!("{}", preview(result, RESULT_PREVIEW_LINES));
            println!();
        }
    }
}

/// The last `max_lines` lines of `text`, indented, noting how many were cut.
fn preview(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let skipped = lines.len().saturating_sub(max_lines);
    let mut out = String::new();
    if skipped > 0 {
        out.push_str(&format!("      ... {skipped} earlier lines\n"));
    }
    for line in &lines[skipped..] {
        out.push_str("      ");
        out.push_str(line);
        out.push('\n');
    }
    out
}
