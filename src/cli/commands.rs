use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reminder", version, about = "Desktop reminders that survive restarts")]
pub struct Args {
    /// Directory holding config.json and reminders.json
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a reminder
    Add {
        /// Reminder title (required)
        #[arg(long, short)]
        title: String,
        /// Optional body text
        #[arg(long, short, default_value = "")]
        message: String,
        /// Offset from now: 10m, 2h, 1d
        #[arg(long = "in", value_name = "OFFSET", conflicts_with = "at", required_unless_present = "at")]
        in_offset: Option<String>,
        /// Local date and time: "YYYY-MM-DD HH:MM"
        #[arg(long, value_name = "DATETIME")]
        at: Option<String>,
    },
    /// Show reminders, soonest first
    List,
    /// Delete a reminder by id
    Remove {
        id: i64,
    },
    /// Delete all completed reminders
    Cleanup,
    /// Run the scheduler until interrupted
    Run {
        /// Headless: no console, notifications only
        #[arg(long, short)]
        background: bool,
        /// Attach the console even in background mode
        #[arg(long, short = 'u')]
        show_ui: bool,
    },
}
