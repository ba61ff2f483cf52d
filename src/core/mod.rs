pub mod error;
pub mod registry;
pub mod reminder;
pub mod store;

pub use error::{ReminderError, Result};
pub use registry::Registry;
pub use reminder::{Reminder, ReminderId};
pub use store::ReminderStore;
