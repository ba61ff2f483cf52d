use std::collections::BTreeSet;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{ReminderError, Result};
use super::reminder::{next_id, Reminder, ReminderId};
use super::store::ReminderStore;

struct RegistryState {
    reminders: Vec<Reminder>,
    /// Claimed by the scheduler but not yet written to the file.
    pending_triggered: BTreeSet<ReminderId>,
}

/// The reminder collection shared by the scheduler and foreground callers.
///
/// Every operation holds the in-process lock and the advisory file lock for
/// its whole reload-modify-save sequence, so writers in this process and in
/// other processes never overwrite each other. Foreground mutations are
/// applied to a copy and only committed once the store accepted it.
///
/// Nothing is dispatched while either lock is held: [`Registry::claim_due`]
/// hands the due reminders back to the caller.
pub struct Registry {
    state: Mutex<RegistryState>,
    store: ReminderStore,
}

impl Registry {
    pub fn open(store: ReminderStore) -> Self {
        let reminders = store.load();
        info!(count = reminders.len(), path = %store.path().display(), "Opened reminder registry");

        Self {
            state: Mutex::new(RegistryState {
                reminders,
                pending_triggered: BTreeSet::new(),
            }),
            store,
        }
    }

    pub fn store(&self) -> &ReminderStore {
        &self.store
    }

    /// Create a reminder and persist it. Returns the new id.
    pub async fn add(&self, title: &str, message: &str, trigger_time: f64) -> Result<ReminderId> {
        if title.trim().is_empty() {
            return Err(ReminderError::InvalidInput("Title cannot be empty".to_string()));
        }
        if !trigger_time.is_finite() {
            return Err(ReminderError::InvalidInput(format!(
                "Trigger time is not a valid timestamp: {}",
                trigger_time
            )));
        }

        let mut state = self.state.lock().await;
        let _lock = self.store.lock_exclusive()?;
        self.refresh(&mut state);

        let mut staged = state.reminders.clone();
        let id = next_id(chrono::Utc::now().timestamp(), &staged);
        staged.push(Reminder::new(
            id,
            title.to_string(),
            message.to_string(),
            trigger_time,
        ));

        self.commit(&mut state, staged)?;
        info!(id, title, trigger_time, "Added reminder");
        Ok(id)
    }

    /// Remove the reminder with `id`. Absent ids are not an error.
    pub async fn remove(&self, id: ReminderId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let _lock = self.store.lock_exclusive()?;
        self.refresh(&mut state);

        let staged: Vec<Reminder> = state
            .reminders
            .iter()
            .filter(|r| r.id != id)
            .cloned()
            .collect();

        if staged.len() == state.reminders.len() {
            debug!(id, "No reminder to remove");
            return Ok(false);
        }

        self.commit(&mut state, staged)?;
        info!(id, "Removed reminder");
        Ok(true)
    }

    /// Drop every reminder that has already fired.
    pub async fn cleanup_completed(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        let _lock = self.store.lock_exclusive()?;
        self.refresh(&mut state);

        let staged: Vec<Reminder> = state
            .reminders
            .iter()
            .filter(|r| !r.triggered)
            .cloned()
            .collect();

        let removed = state.reminders.len() - staged.len();
        if removed == 0 {
            return Ok(false);
        }

        self.commit(&mut state, staged)?;
        info!(removed, "Cleaned up completed reminders");
        Ok(true)
    }

    /// Snapshot of the collection in storage order.
    ///
    /// Falls back to the last known collection if the file cannot be locked.
    pub async fn list(&self) -> Vec<Reminder> {
        let mut state = self.state.lock().await;
        match self.store.lock_shared() {
            Ok(_lock) => self.refresh(&mut state),
            Err(e) => warn!(error = %e, "Could not lock reminders file, listing cached state"),
        }
        state.reminders.clone()
    }

    pub async fn get(&self, id: ReminderId) -> Option<Reminder> {
        self.list().await.into_iter().find(|r| r.id == id)
    }

    /// Snapshot ordered for display: pending reminders soonest first,
    /// completed ones at the end.
    pub async fn display_order(&self) -> Vec<Reminder> {
        let mut reminders = self.list().await;
        reminders.sort_by(|a, b| {
            a.triggered
                .cmp(&b.triggered)
                .then_with(|| a.trigger_time.total_cmp(&b.trigger_time))
        });
        reminders
    }

    /// Mark every due reminder triggered and return them in collection order.
    ///
    /// The flags are persisted before anything is delivered, so a reminder is
    /// never handed out twice. When the save fails the claim is remembered
    /// and re-applied on every reload until a later claim or
    /// [`Registry::flush`] gets it to disk.
    pub async fn claim_due(&self, now: f64) -> Vec<Reminder> {
        let mut state = self.state.lock().await;
        let lock = match self.store.lock_exclusive() {
            Ok(lock) => {
                self.refresh(&mut state);
                Some(lock)
            }
            Err(e) => {
                warn!(error = %e, "Could not lock reminders file, claiming from cached state");
                None
            }
        };

        let mut claimed = Vec::new();
        for reminder in state.reminders.iter_mut().filter(|r| r.is_due(now)) {
            reminder.triggered = true;
            claimed.push(reminder.clone());
        }

        if !claimed.is_empty() {
            let ids: Vec<ReminderId> = claimed.iter().map(|r| r.id).collect();
            info!(count = ids.len(), ids = ?ids, "Claimed due reminders");
            state.pending_triggered.extend(ids);
        }

        if lock.is_some() && !state.pending_triggered.is_empty() {
            match self.store.save(&state.reminders) {
                Ok(()) => state.pending_triggered.clear(),
                Err(e) => warn!(
                    error = %e,
                    pending = state.pending_triggered.len(),
                    "Failed to save triggered reminders, will retry"
                ),
            }
        }

        claimed
    }

    /// Number of claimed reminders whose flag has not reached the file.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending_triggered.len()
    }

    /// Write claims that a failed save left behind. Returns whether a save
    /// happened.
    pub async fn flush(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.pending_triggered.is_empty() {
            return Ok(false);
        }

        let _lock = self.store.lock_exclusive()?;
        self.refresh(&mut state);
        self.store.save(&state.reminders)?;
        state.pending_triggered.clear();
        Ok(true)
    }

    fn commit(&self, state: &mut RegistryState, staged: Vec<Reminder>) -> Result<()> {
        self.store.save(&staged)?;
        state.reminders = staged;
        state.pending_triggered.clear();
        Ok(())
    }

    /// Reload from the file, then re-apply our unsaved claims. Caller holds
    /// the file lock.
    fn refresh(&self, state: &mut RegistryState) {
        let RegistryState {
            reminders,
            pending_triggered,
        } = state;

        *reminders = self.store.load();
        pending_triggered.retain(|id| match reminders.iter_mut().find(|r| r.id == *id) {
            Some(reminder) => {
                reminder.triggered = true;
                true
            }
            None => false,
        });
        debug!(count = reminders.len(), pending = pending_triggered.len(), "Reloaded reminders");
    }
}
