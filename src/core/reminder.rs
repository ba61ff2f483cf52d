use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Ids are kept below this bound so they fit a positive 32-bit signed integer.
pub const ID_RANGE: i64 = 2_000_000_000;

pub type ReminderId = i64;

/// A single scheduled reminder, stored as-is in `reminders.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    pub message: String,
    /// Seconds since the Unix epoch, fractional part allowed
    pub trigger_time: f64,
    pub triggered: bool,
}

impl Reminder {
    pub fn new(id: ReminderId, title: String, message: String, trigger_time: f64) -> Self {
        Self {
            id,
            title,
            message,
            trigger_time,
            triggered: false,
        }
    }

    /// Due means not yet fired and the trigger time has been reached.
    pub fn is_due(&self, now: f64) -> bool {
        !self.triggered && self.trigger_time <= now
    }

    pub fn trigger_datetime(&self) -> Option<DateTime<Local>> {
        let secs = self.trigger_time.floor();
        let nanos = ((self.trigger_time - secs) * 1e9) as u32;
        Local.timestamp_opt(secs as i64, nanos).single()
    }

    /// The "when" column of a listing: local minute precision, or `Completed`.
    pub fn display_time(&self) -> String {
        if self.triggered {
            return "Completed".to_string();
        }
        match self.trigger_datetime() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            None => format!("{:.0}", self.trigger_time),
        }
    }
}

/// Current wall-clock time as fractional epoch seconds.
pub fn now_timestamp() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6
}

/// Picks an id for a new reminder.
///
/// The candidate comes from the creation time reduced into `1..ID_RANGE`.
/// When that value is already taken the candidate is advanced until it is
/// free, so two reminders created in the same second still get distinct ids.
pub fn next_id(now_secs: i64, existing: &[Reminder]) -> ReminderId {
    let mut candidate = now_secs.rem_euclid(ID_RANGE);
    if candidate == 0 {
        candidate = 1;
    }

    while existing.iter().any(|r| r.id == candidate) {
        candidate += 1;
        if candidate >= ID_RANGE {
            candidate = 1;
        }
    }

    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder(id: ReminderId) -> Reminder {
        Reminder::new(id, "t".to_string(), String::new(), 0.0)
    }

    #[test]
    fn test_next_id_uses_time_within_range() {
        let id = next_id(1_760_000_000, &[]);
        assert_eq!(id, 1_760_000_000);

        let id = next_id(3_760_000_000, &[]);
        assert_eq!(id, 1_760_000_000);
        assert!(id < ID_RANGE && id > 0);
    }

    #[test]
    fn test_next_id_skips_taken_ids() {
        let existing = vec![reminder(500), reminder(501)];
        assert_eq!(next_id(500, &existing), 502);
    }

    #[test]
    fn test_next_id_wraps_and_avoids_zero() {
        let existing = vec![reminder(ID_RANGE - 1)];
        assert_eq!(next_id(ID_RANGE - 1, &existing), 1);
        assert_eq!(next_id(0, &[]), 1);
    }

    #[test]
    fn test_is_due() {
        let mut r = Reminder::new(1, "a".to_string(), String::new(), 100.0);
        assert!(r.is_due(100.0));
        assert!(r.is_due(150.5));
        assert!(!r.is_due(99.9));

        r.triggered = true;
        assert!(!r.is_due(150.0));
    }

    #[test]
    fn test_display_time_completed() {
        let mut r = Reminder::new(1, "a".to_string(), String::new(), 0.0);
        r.triggered = true;
        assert_eq!(r.display_time(), "Completed");
    }

    #[test]
    fn test_serialized_shape() {
        let r = Reminder::new(7, "Tea".to_string(), "steep".to_string(), 1.5);
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 7,
                "title": "Tea",
                "message": "steep",
                "trigger_time": 1.5,
                "triggered": false
            })
        );
    }
}
