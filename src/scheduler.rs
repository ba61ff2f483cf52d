use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::core::reminder::now_timestamp;
use crate::core::{Registry, Reminder, ReminderId};
use crate::notifier::Notifier;

const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopping,
    Stopped,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Running => write!(f, "running"),
            SchedulerState::Stopping => write!(f, "stopping"),
            SchedulerState::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub fired: u64,
}

#[derive(Default)]
struct Counters {
    cycles: AtomicU64,
    fired: AtomicU64,
}

/// Polls the registry for due reminders and dispatches them.
#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<Registry>,
    notifier: Arc<dyn Notifier>,
    period: Duration,
    dispatch_timeout: Duration,
    counters: Arc<Counters>,
}

impl Scheduler {
    pub fn new(registry: Arc<Registry>, notifier: Arc<dyn Notifier>, period: Duration) -> Self {
        Self {
            registry,
            notifier,
            period,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Upper bound for delivering one cycle's reminders.
    pub fn with_dispatch_timeout(mut self, dispatch_timeout: Duration) -> Self {
        self.dispatch_timeout = dispatch_timeout;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One polling pass at the current time. Returns the ids that fired.
    pub async fn run_cycle(&self) -> Vec<ReminderId> {
        self.run_cycle_at(now_timestamp()).await
    }

    /// Claim what is due at `now`, then deliver it in collection order.
    ///
    /// Delivery happens after the registry released its locks. Reminders not
    /// delivered within the dispatch timeout are dropped; they are already
    /// marked triggered.
    pub async fn run_cycle_at(&self, now: f64) -> Vec<ReminderId> {
        let claimed = self.registry.claim_due(now).await;
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        if claimed.is_empty() {
            return Vec::new();
        }

        self.counters
            .fired
            .fetch_add(claimed.len() as u64, Ordering::Relaxed);

        if tokio::time::timeout(self.dispatch_timeout, self.dispatch(&claimed))
            .await
            .is_err()
        {
            warn!(
                timeout_ms = self.dispatch_timeout.as_millis() as u64,
                "Notification dispatch timed out, remaining reminders dropped"
            );
        }

        claimed.iter().map(|r| r.id).collect()
    }

    async fn dispatch(&self, claimed: &[Reminder]) {
        for reminder in claimed {
            if let Err(e) = self.notifier.show(&reminder.title, &reminder.message).await {
                warn!(id = reminder.id, error = %e, "Notification dispatch failed, not retrying");
            }
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            cycles: self.counters.cycles.load(Ordering::Relaxed),
            fired: self.counters.fired.load(Ordering::Relaxed),
        }
    }

    /// Start the polling loop on the tokio runtime.
    ///
    /// The first cycle runs immediately, then once per period. A stop
    /// request is observed between cycles.
    pub fn spawn(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (state_tx, _) = watch::channel(SchedulerState::Running);
        let scheduler = self.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_ms = scheduler.period.as_millis() as u64, "Scheduler started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let fired = scheduler.run_cycle().await;
                        if !fired.is_empty() {
                            debug!(count = fired.len(), "Cycle dispatched reminders");
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("Scheduler loop exited");
        });

        SchedulerHandle {
            scheduler: self,
            stop_tx,
            state_tx,
            task,
        }
    }
}

/// Owner of a running scheduler task.
pub struct SchedulerHandle {
    scheduler: Scheduler,
    stop_tx: watch::Sender<bool>,
    state_tx: watch::Sender<SchedulerState>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Stop the loop and flush pending state.
    ///
    /// Waits at most one polling period plus the dispatch timeout for the
    /// loop to notice the request; after that the task is aborted. The
    /// registry is flushed either way.
    pub async fn shutdown(mut self) -> Result<SchedulerStats> {
        self.state_tx.send_replace(SchedulerState::Stopping);
        self.stop_tx.send_replace(true);

        let wait = self.scheduler.period + self.scheduler.dispatch_timeout;
        match tokio::time::timeout(wait, &mut self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Scheduler task ended abnormally"),
            Err(_) => {
                warn!(wait_ms = wait.as_millis() as u64, "Scheduler did not stop in time, aborting");
                self.task.abort();
            }
        }

        let flushed = self
            .scheduler
            .registry
            .flush()
            .await
            .context("Failed to flush reminders on shutdown")?;
        if flushed {
            debug!("Flushed pending reminder state");
        }

        self.state_tx.send_replace(SchedulerState::Stopped);
        let stats = self.scheduler.stats();
        info!(cycles = stats.cycles, fired = stats.fired, "Scheduler stopped");
        Ok(stats)
    }
}
