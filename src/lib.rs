pub mod cli;
pub mod config;
pub mod console;
pub mod core;
pub mod engine;
pub mod notifier;
pub mod scheduler;
pub mod trigger;

pub use crate::core::{Registry, Reminder, ReminderError, ReminderId, ReminderStore};
pub use engine::{Engine, RunMode};
pub use notifier::Notifier;
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState};
