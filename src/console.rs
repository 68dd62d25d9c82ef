//! Operator console: parses typed commands and prints what happens

use crate::command::{CommandExecutor, Execution, ExecutorError, Report, Snapshot};
use anyhow::Result;
use command_shared::{codec, ExecutorStatus};
use std::ops::ControlFlow;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::error;

/// A parsed console line. The text argument is optional; defaults apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Progress(Option<String>),
    Complete(Option<String>),
    Fail(Option<String>),
    Reject(Option<String>),
    Info,
    Help,
    Quit,
    Unknown(String),
}

/// Parse one input line; blank lines yield `None`
pub fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, unquote(rest.trim())),
        None => (line, None),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "progress" => ConsoleCommand::Progress(rest),
        "complete" => ConsoleCommand::Complete(rest),
        "fail" => ConsoleCommand::Fail(rest),
        "reject" => ConsoleCommand::Reject(rest),
        "info" | "status" => ConsoleCommand::Info,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => ConsoleCommand::Unknown(word.to_string()),
    };
    Some(command)
}

/// Strip one pair of matching quotes; empty text counts as absent
fn unquote(text: &str) -> Option<String> {
    let inner = ['\'', '"']
        .iter()
        .find_map(|q| text.strip_prefix(*q).and_then(|t| t.strip_suffix(*q)))
        .unwrap_or(text);

    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

pub const HELP: &str = "\
Basic commands:
  progress                  # Report progress (default: 'Processing...')
  progress 50% done         # Report progress with custom message
  complete                  # Complete successfully (default: 'completed')
  complete success          # Complete with custom message
  fail                      # Report failure (default: 'Command failed')
  fail custom error         # Report failure with custom message
  reject                    # Reject invalid request (default message)
  reject invalid format     # Reject with custom message

Utility commands:
  info                      # Show current status
  help                      # Show this help
  quit                      # Disconnect and exit";

/// Render the status and active execution
pub fn info_text(snapshot: &Snapshot) -> String {
    let mut text = format!("Status: {}", snapshot.status);
    match &snapshot.execution {
        Some(Execution {
            execution_id,
            payload,
            ..
        }) => {
            text.push_str(&format!("\nID: {}", execution_id));
            text.push_str(&format!("\nPayload: {}", payload));
        }
        None => text.push_str("\nNo active command"),
    }
    text
}

pub fn print_ready() {
    println!("\nDevice ready! Type 'help' for commands.");
}

pub fn print_inbound(topic: &str, payload: &[u8]) {
    println!("\n{}", topic);
    println!("{}", codec::pretty(payload));
}

fn print_published(report: &Report) {
    println!("\n→ {}", report.topic);
    match serde_json::to_value(&report.message) {
        Ok(value) => println!("{}", codec::pretty_value(&value)),
        Err(e) => error!("Failed to render published message: {}", e),
    }
}

/// Confirmation line shown after a successful report
pub fn outcome_text(report: &Report) -> String {
    let description = &report.message.status_reason.reason_description;
    match report.message.status {
        ExecutorStatus::InProgress => format!("Progress: {}", description),
        ExecutorStatus::Succeeded => "Command completed successfully".to_string(),
        ExecutorStatus::Failed => format!("Command failed: {}", description),
        ExecutorStatus::Rejected => format!("Command rejected: {}", description),
        ExecutorStatus::Idle => description.clone(),
    }
}

fn print_result(result: Result<Report, ExecutorError>) {
    match result {
        Ok(report) => {
            print_published(&report);
            println!("{}", outcome_text(&report));
        }
        Err(e) if e.is_no_active() => println!("No active command"),
        Err(e) => {
            error!("{}", e);
            println!("Error: {}", e);
        }
    }
}

/// Run one console command against the executor
pub async fn execute(executor: &CommandExecutor, command: ConsoleCommand) -> ControlFlow<()> {
    match command {
        ConsoleCommand::Progress(text) => {
            let result = match text {
                Some(text) => executor.progress(&text).await,
                None => executor.progress_default().await,
            };
            print_result(result);
        }
        ConsoleCommand::Complete(text) => {
            let result = match text {
                Some(text) => executor.complete(&text).await,
                None => executor.complete_default().await,
            };
            print_result(result);
        }
        ConsoleCommand::Fail(text) => {
            let result = match text {
                Some(text) => executor.fail(&text).await,
                None => executor.fail_default().await,
            };
            print_result(result);
        }
        ConsoleCommand::Reject(text) => {
            let result = match text {
                Some(text) => executor.reject(&text).await,
                None => executor.reject_default().await,
            };
            print_result(result);
        }
        ConsoleCommand::Info => {
            println!("\n{}", info_text(&executor.snapshot().await));
        }
        ConsoleCommand::Help => println!("\n{}", HELP),
        ConsoleCommand::Quit => return ControlFlow::Break(()),
        ConsoleCommand::Unknown(word) => {
            println!("Unknown command '{}'. Type 'help' for commands.", word);
        }
    }
    ControlFlow::Continue(())
}

/// Read commands until `quit` or end of input
pub async fn run<R>(executor: &CommandExecutor, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_line(&line) else {
            continue;
        };
        if execute(executor, command).await.is_break() {
            break;
        }
    }

    Ok(())
}
