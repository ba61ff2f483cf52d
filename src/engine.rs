//! Process-level wiring of the registry and the scheduler.
//!
//! The engine is built the same way whether or not a console is attached;
//! the run mode only decides which collaborators sit on top of it.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::{Registry, ReminderStore};
use crate::notifier::Notifier;
use crate::scheduler::{Scheduler, SchedulerHandle, SchedulerState, SchedulerStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Console attached to the running engine
    Interactive,
    /// Scheduler only
    Headless,
}

impl RunMode {
    /// `--show-ui` wins over `--background`.
    pub fn from_flags(background: bool, show_ui: bool) -> Self {
        if background && !show_ui {
            RunMode::Headless
        } else {
            RunMode::Interactive
        }
    }
}

pub fn open_registry(config: &Config) -> Registry {
    Registry::open(ReminderStore::new(config.reminders_file()))
}

pub struct Engine {
    registry: Arc<Registry>,
    scheduler: SchedulerHandle,
}

impl Engine {
    /// Load the registry and start polling. Must be called inside a tokio
    /// runtime.
    pub fn start(config: &Config, notifier: Arc<dyn Notifier>) -> Self {
        let registry = Arc::new(open_registry(config));
        let scheduler = Scheduler::new(registry.clone(), notifier, config.poll_interval())
            .with_dispatch_timeout(config.dispatch_timeout());
        Self::with_scheduler(registry, scheduler)
    }

    pub fn with_registry(
        registry: Arc<Registry>,
        notifier: Arc<dyn Notifier>,
        period: std::time::Duration,
    ) -> Self {
        let scheduler = Scheduler::new(registry.clone(), notifier, period);
        Self::with_scheduler(registry, scheduler)
    }

    fn with_scheduler(registry: Arc<Registry>, scheduler: Scheduler) -> Self {
        let scheduler = scheduler.spawn();
        info!("Reminder engine started");
        Self {
            registry,
            scheduler,
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.scheduler.subscribe()
    }

    /// Run `session` to completion, then shut down. The engine is stopped
    /// and flushed even when the session fails; its error is returned after.
    pub async fn run_until<F>(self, session: F) -> Result<SchedulerStats>
    where
        F: Future<Output = Result<()>>,
    {
        let outcome = session.await;
        if let Err(e) = &outcome {
            warn!(error = %e, "Session ended with an error, shutting down");
        }

        let stats = self.shutdown().await?;
        outcome.map(|()| stats)
    }

    /// Stop the scheduler and flush anything it left unsaved.
    pub async fn shutdown(self) -> Result<SchedulerStats> {
        let stats = self.scheduler.shutdown().await?;
        info!("Reminder engine stopped");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reminder::now_timestamp;
    use crate::notifier::testing::RecordingNotifier;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_engine(dir: &TempDir) -> Engine {
        let registry = Arc::new(Registry::open(ReminderStore::new(
            dir.path().join("reminders.json"),
        )));
        Engine::with_registry(
            registry,
            Arc::new(RecordingNotifier::default()),
            Duration::from_millis(20),
        )
    }

    #[tokio::test]
    async fn test_failed_session_still_shuts_down() {
        let dir = TempDir::new().unwrap();
        let engine = test_engine(&dir);
        let registry = engine.registry();
        let mut state_rx = engine.subscribe();

        let err = engine
            .run_until(async move {
                registry.add("Kept", "", now_timestamp() + 60.0).await.unwrap();
                Err::<(), _>(anyhow::anyhow!("stdin closed unexpectedly"))
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("stdin closed"));
        assert_eq!(*state_rx.borrow_and_update(), SchedulerState::Stopped);
        assert_eq!(ReminderStore::new(dir.path().join("reminders.json")).load().len(), 1);
    }

    #[tokio::test]
    async fn test_session_returns_stats() {
        let dir = TempDir::new().unwrap();
        let engine = test_engine(&dir);
        let registry = engine.registry();
        registry.add("Due", "", now_timestamp() - 1.0).await.unwrap();

        let stats = engine
            .run_until(async move {
                for _ in 0..100 {
                    if registry.list().await.iter().all(|r| r.triggered) {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                Ok::<(), anyhow::Error>(())
            })
            .await
            .unwrap();
        assert_eq!(stats.fired, 1);
    }

    #[test]
    fn test_run_mode_from_flags() {
        assert_eq!(RunMode::from_flags(false, false), RunMode::Interactive);
        assert_eq!(RunMode::from_flags(true, false), RunMode::Headless);
        assert_eq!(RunMode::from_flags(true, true), RunMode::Interactive);
        assert_eq!(RunMode::from_flags(false, true), RunMode::Interactive);
    }
}
