use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReminderError {
    /// Rejected before any state change (empty title, bad trigger time).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ReminderError>;
