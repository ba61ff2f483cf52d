use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use super::error::{ReminderError, Result};
use super::reminder::Reminder;

/// JSON file storage for the whole reminder collection.
///
/// The store has no state of its own besides the path. Every save rewrites
/// the full array; there are no per-record updates.
#[derive(Debug, Clone)]
pub struct ReminderStore {
    path: PathBuf,
}

impl ReminderStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store under `<config dir>/reminder-app/reminders.json`
    pub fn at_default_location() -> Result<Self> {
        let data_dir = dirs::config_dir()
            .ok_or_else(|| ReminderError::Config("Could not find config directory".to_string()))?
            .join("reminder-app");

        Ok(Self::new(data_dir.join("reminders.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all reminders.
    ///
    /// A missing file is an empty collection. So is a file that cannot be
    /// read or parsed: its contents are discarded with a warning and the
    /// next save overwrites it.
    pub fn load(&self) -> Vec<Reminder> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No reminders file yet");
            return Vec::new();
        }

        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read reminders file, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Reminder>>(&data) {
            Ok(reminders) => {
                debug!(count = reminders.len(), "Loaded reminders");
                reminders
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Reminders file is malformed, starting empty");
                Vec::new()
            }
        }
    }

    /// Replace the persisted collection.
    ///
    /// Written to a sibling temp file first and renamed over the target, so
    /// a reader never sees a half-written array.
    pub fn save(&self, reminders: &[Reminder]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(reminders)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!(count = reminders.len(), path = %self.path.display(), "Saved reminders");
        Ok(())
    }

    /// Sidecar file used for advisory locking, `reminders.json.lock`.
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    /// Block until this process holds the only lock on the file.
    ///
    /// Held across every reload-modify-save sequence so that writers in
    /// other processes cannot interleave.
    pub fn lock_exclusive(&self) -> Result<StoreLock> {
        let file = self.open_lock_file()?;
        FileExt::lock_exclusive(&file)?;
        Ok(StoreLock { file })
    }

    /// Block until no other process holds an exclusive lock.
    pub fn lock_shared(&self) -> Result<StoreLock> {
        let file = self.open_lock_file()?;
        FileExt::lock_shared(&file)?;
        Ok(StoreLock { file })
    }

    fn open_lock_file(&self) -> Result<File> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        Ok(file)
    }
}

/// Advisory lock on the reminders file, released on drop.
pub struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "Failed to release reminders lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (ReminderStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ReminderStore::new(dir.path().join("reminders.json"));
        (store, dir)
    }

    #[test]
    fn test_load_missing_file() {
        let (store, _dir) = create_test_store();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let (store, _dir) = create_test_store();

        let mut done = Reminder::new(2, "Call".to_string(), String::new(), 1_700_000_100.25);
        done.triggered = true;
        let reminders = vec![
            Reminder::new(1, "Stretch".to_string(), "stand up".to_string(), 1_700_000_000.5),
            done,
        ];

        store.save(&reminders).unwrap();
        assert_eq!(store.load(), reminders);
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let store = ReminderStore::new(dir.path().join("nested").join("reminders.json"));

        store.save(&[]).unwrap();
        assert!(store.path().exists());
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_lock_is_exclusive_across_handles() {
        let (store, _dir) = create_test_store();
        let other = ReminderStore::new(store.path().to_path_buf());

        let guard = store.lock_exclusive().unwrap();
        let contender = File::open(other.lock_path()).unwrap();
        assert!(FileExt::try_lock_exclusive(&contender).is_err());

        drop(guard);
        assert!(FileExt::try_lock_exclusive(&contender).is_ok());
        FileExt::unlock(&contender).unwrap();
    }

    #[test]
    fn test_shared_locks_coexist() {
        let (store, _dir) = create_test_store();
        let _first = store.lock_shared().unwrap();
        let _second = store.lock_shared().unwrap();
    }

    #[test]
    fn test_load_malformed_file() {
        let (store, _dir) = create_test_store();
        fs::write(store.path(), "{ not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_wrong_shape() {
        let (store, _dir) = create_test_store();
        fs::write(store.path(), r#"[{"id": 1, "title": "missing fields"}]"#).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_integer_trigger_time() {
        let (store, _dir) = create_test_store();
        fs::write(
            store.path(),
            r#"[{"id": 3, "title": "a", "message": "", "trigger_time": 1700000000, "triggered": false}]"#,
        )
        .unwrap();

        let reminders = store.load();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].trigger_time, 1_700_000_000.0);
    }
}
