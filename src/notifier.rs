// src/notifier.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

/// Something that can put a reminder in front of the user.
///
/// Called by the scheduler after the reminder was claimed, with no lock
/// held. The scheduler bounds each batch with a timeout. Errors are logged
/// by the caller and never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, title: &str, message: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    Desktop,
    Log,
}

impl std::str::FromStr for NotifierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "desktop" => Ok(NotifierKind::Desktop),
            "log" => Ok(NotifierKind::Log),
            _ => Err(anyhow::anyhow!("Unknown notifier: {}", s)),
        }
    }
}

impl std::fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifierKind::Desktop => write!(f, "desktop"),
            NotifierKind::Log => write!(f, "log"),
        }
    }
}

/// Desktop notifications through the freedesktop `notify-send` tool.
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn show(&self, title: &str, message: &str) -> Result<()> {
        let output = Command::new("notify-send")
            .args(["--app-name", self.app_name.as_str()])
            .args(["--urgency", "normal"])
            .args(["--icon", "dialog-information"])
            .arg("--")
            .arg(title)
            .arg(message)
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to run notify-send")?;

        if !output.status.success() {
            bail!(
                "notify-send exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        debug!(title, "Desktop notification shown");
        Ok(())
    }
}

/// Prints reminders to the terminal. For hosts without a notification daemon.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, title: &str, message: &str) -> Result<()> {
        info!(title, message, "Reminder due");
        if message.is_empty() {
            println!("🔔 {}", title);
        } else {
            println!("🔔 {}: {}", title, message);
        }
        Ok(())
    }
}

pub fn build_notifier(kind: NotifierKind, app_name: &str) -> Box<dyn Notifier> {
    match kind {
        NotifierKind::Desktop => Box::new(DesktopNotifier::new(app_name)),
        NotifierKind::Log => Box::new(LogNotifier),
    }
}
