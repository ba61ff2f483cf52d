use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::Local;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::core::{Registry, Reminder, ReminderError, ReminderId};
use crate::trigger::TriggerSpec;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Add {
        when: TriggerSpec,
        title: String,
        message: String,
    },
    List,
    Remove(ReminderId),
    Cleanup,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  /add <when> <title> [| message]   when: 10m, 2h, 1d or @YYYY-MM-DD HH:MM
  /list                             show reminders
  /remove <id>                      delete a reminder
  /cleanup                          delete completed reminders
  /help                             show this help
  /quit                             stop the reminder engine";

pub fn parse_command(line: &str) -> Result<ConsoleCommand> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/add" => parse_add(rest),
        "/list" | "/ls" => Ok(ConsoleCommand::List),
        "/remove" | "/rm" => {
            let id = rest
                .parse::<ReminderId>()
                .map_err(|_| anyhow!("Usage: /remove <id>"))?;
            Ok(ConsoleCommand::Remove(id))
        }
        "/cleanup" => Ok(ConsoleCommand::Cleanup),
        "/help" | "/?" => Ok(ConsoleCommand::Help),
        "/quit" | "/exit" => Ok(ConsoleCommand::Quit),
        other => bail!("Unknown command: {} (try /help)", other),
    }
}

fn parse_add(rest: &str) -> Result<ConsoleCommand> {
    let usage = || anyhow!("Usage: /add <when> <title> [| message]");

    let (when, remainder) = if let Some(at) = rest.strip_prefix('@') {
        // date and time are two whitespace-separated tokens
        let mut parts = at.splitn(3, char::is_whitespace);
        let date = parts.next().ok_or_else(usage)?;
        let time = parts.next().ok_or_else(usage)?;
        let when = TriggerSpec::parse_at(&format!("{} {}", date, time))?;
        (when, parts.next().unwrap_or(""))
    } else {
        let (offset, remainder) = rest.split_once(char::is_whitespace).ok_or_else(usage)?;
        (TriggerSpec::parse_offset(offset)?, remainder)
    };

    let (title, message) = match remainder.split_once('|') {
        Some((title, message)) => (title.trim(), message.trim()),
        None => (remainder.trim(), ""),
    };
    if title.is_empty() {
        return Err(ReminderError::InvalidInput("Title cannot be empty".to_string()).into());
    }

    Ok(ConsoleCommand::Add {
        when,
        title: title.to_string(),
        message: message.to_string(),
    })
}

/// One line per reminder: id, title, message, and when it goes off.
pub fn render_reminders(reminders: &[Reminder]) -> String {
    if reminders.is_empty() {
        return "No reminders.".to_string();
    }

    let title_width = reminders
        .iter()
        .map(|r| r.title.chars().count())
        .max()
        .unwrap_or(0)
        .max(5);

    let mut out = format!("{:>10}  {:<16}  {:<title_width$}  {}\n", "ID", "WHEN", "TITLE", "MESSAGE");
    for r in reminders {
        out.push_str(&format!(
            "{:>10}  {:<16}  {:<title_width$}  {}\n",
            r.id,
            r.display_time(),
            r.title,
            r.message
        ));
    }
    out.trim_end().to_string()
}

/// Apply one command. Returns `false` when the console should close.
pub async fn execute(registry: &Registry, command: ConsoleCommand) -> Result<bool> {
    match command {
        ConsoleCommand::Add { when, title, message } => {
            let trigger_time = when.resolve(Local::now())?;
            let id = registry.add(&title, &message, trigger_time).await?;
            println!("✅ Added reminder {} ({})", id, when.describe());
        }
        ConsoleCommand::List => {
            println!("{}", render_reminders(&registry.display_order().await));
        }
        ConsoleCommand::Remove(id) => {
            if registry.remove(id).await? {
                println!("🗑️  Removed reminder {}", id);
            } else {
                println!("No reminder with id {}", id);
            }
        }
        ConsoleCommand::Cleanup => {
            if registry.cleanup_completed().await? {
                println!("All completed reminders have been removed.");
            } else {
                println!("No completed reminders.");
            }
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Read commands from stdin until `/quit` or end of input.
pub async fn run_console(registry: Arc<Registry>) -> Result<()> {
    run_console_with(registry, BufReader::new(tokio::io::stdin())).await
}

/// Console loop over any line source.
///
/// Input that is not valid UTF-8 is decoded lossily. A read error closes the
/// console like end of input does.
pub async fn run_console_with<R>(registry: Arc<Registry>, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("⏰ Reminder console. Type /help for commands.");
    let mut lines = input.split(b'\n');

    loop {
        print!("> ");
        if let Err(e) = std::io::stdout().flush() {
            debug!(error = %e, "Failed to flush prompt");
        }

        let raw = match lines.next_segment().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!(error = %e, "Console input failed, closing console");
                return Ok(());
            }
        };
        let line = String::from_utf8_lossy(&raw);
        if line.trim().is_empty() {
            continue;
        }

        let keep_going = match parse_command(&line) {
            Ok(command) => execute(&registry, command).await.unwrap_or_else(|e| {
                eprintln!("❌ {}", e);
                true
            }),
            Err(e) => {
                eprintln!("❌ {}", e);
                true
            }
        };

        if !keep_going {
            return Ok(());
        }
    }
}
