use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::notifier::NotifierKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,
    #[serde(default = "default_notifier")]
    pub notifier: NotifierKind,
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_dispatch_timeout_ms() -> u64 {
    5000
}

fn default_notifier() -> NotifierKind {
    NotifierKind::Desktop
}

fn default_app_name() -> String {
    "Reminder App".to_string()
}

impl Config {
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("reminder-app")
        });

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        let config_path = data_dir.join("config.json");

        let mut config = if config_path.exists() {
            let config_str =
                std::fs::read_to_string(&config_path).context("Failed to read config.json")?;

            match serde_json::from_str::<Config>(&config_str) {
                Ok(config) => config,
                Err(e) => {
                    warn!(error = %e, "Failed to parse config.json, using defaults");
                    Self::default_config()
                }
            }
        } else {
            let config = Self::default_config();
            let json_str = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config")?;
            std::fs::write(&config_path, json_str)
                .context("Failed to write default config.json")?;
            config
        };

        config.data_dir = data_dir;
        config.apply_env_overrides();
        Ok(config)
    }

    fn default_config() -> Self {
        Config {
            data_dir: PathBuf::new(),
            poll_interval_ms: default_poll_interval_ms(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            notifier: default_notifier(),
            app_name: default_app_name(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("REMINDER_NOTIFIER") {
            match value.parse() {
                Ok(kind) => self.notifier = kind,
                Err(e) => warn!(error = %e, "Ignoring REMINDER_NOTIFIER"),
            }
        }
    }

    /// Polling period of the scheduler, never below 10ms.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    /// How long one cycle may spend delivering notifications.
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms.max(10))
    }

    pub fn reminders_file(&self) -> PathBuf {
        self.data_dir.join("reminders.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_default_config() {
        let dir = TempDir::new().unwrap();
        let config = Config::new(Some(dir.path().to_path_buf())).unwrap();

        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.app_name, "Reminder App");
        assert_eq!(config.reminders_file(), dir.path().join("reminders.json"));
        assert!(dir.path().join("config.json").exists());
    }

    #[test]
    fn test_reads_partial_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"poll_interval_ms": 250, "notifier": "log"}"#,
        )
        .unwrap();

        let config = Config::new(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.dispatch_timeout(), Duration::from_secs(5));
        assert_eq!(config.app_name, "Reminder App");
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), "poll=1").unwrap();

        let config = Config::new(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.poll_interval_ms, 1000);
    }
}
