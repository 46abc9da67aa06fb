//! `codewright chat`: interactive session over stdin.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use codewright_agent::{CancellationToken, Orchestrator, TurnOutcome};
use codewright_core::error::Error;
use codewright_core::event::DomainEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast;

use super::session::{CliResult, Session};

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

pub async fn run(config_path: Option<&Path>) -> CliResult<()> {
    let mut session = Session::open(config_path).await?;

    println!();
    println!("  codewright: interactive mode");
    println!();
    println!("  Provider:   {}", session.config.llm.provider);
    println!("  Model:      {}", session.config.llm.model);
    println!("  Workspace:  {}", session.config.agent.workspace_root.display());
    let names: Vec<&str> = session
        .orchestrator
        .catalog()
        .descriptors()
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    println!("  Tools:      {} ({})", names.len(), names.join(", "));
    for warning in session.orchestrator.catalog().warnings() {
        println!("  Warning:    {warning}");
    }
    println!();
    println!("  Type your request and press Enter. Type 'exit' or press Ctrl+D to quit.");
    println!("  Ctrl+C stops the current request.");
    println!();

    let trace = tokio::spawn(print_trace(session.orchestrator.event_bus().subscribe()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let outcome = chat_loop(&mut session.orchestrator, &mut lines).await;

    trace.abort();
    session.close().await;
    outcome?;

    println!();
    println!("  Goodbye!");
    Ok(())
}

/// Answer lines until end of input or an exit word.
async fn chat_loop<R>(orchestrator: &mut Orchestrator, lines: &mut Lines<R>) -> CliResult<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&line.to_lowercase().as_str()) {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let result = orchestrator.process_turn(line, &cancel).await;
        watcher.abort();

        match result {
            Ok(reply) => {
                println!();
                for text_line in reply.text.lines() {
                    println!("  Assistant > {text_line}");
                }
                if reply.outcome == TurnOutcome::LimitReached {
                    println!("  (stopped after {} iterations)", reply.iterations);
                }
                println!();
            }
            Err(Error::Cancelled) => {
                eprintln!("  [Cancelled]");
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }
}

/// Print the tool activity of each turn as it happens.
async fn print_trace(mut events: broadcast::Receiver<Arc<DomainEvent>>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                eprintln!("  ({skipped} trace events skipped)");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };
        match event.as_ref() {
            DomainEvent::ModelResponded {
                iteration,
                tool_calls,
                ..
            } if *tool_calls > 0 => {
                eprintln!("  [step {iteration}] {tool_calls} tool call(s)");
            }
            DomainEvent::ToolExecuted {
                tool_name,
                arguments,
                success,
                result_preview,
                duration_ms,
                ..
            } => {
                let mark = if *success { "ok" } else { "error" };
                eprintln!("    -> {tool_name} {arguments}");
                eprintln!("    <- {mark} in {duration_ms}ms: {result_preview}");
            }
            DomainEvent::CatalogDegraded { reason, .. } => {
                eprintln!("  Warning: {reason}");
            }
            _ => {}
        }
    }
}
