use std::sync::Mutex;

use async_trait::async_trait;
use reminder::Notifier;

/// Keeps every `(title, message)` it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, title: &str, message: &str) -> anyhow::Result<()> {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}
