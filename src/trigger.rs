// src/trigger.rs
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone};

use crate::core::{ReminderError, Result};

/// Largest relative offset accepted, in the chosen unit.
pub const MAX_OFFSET: i64 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn duration(self, value: i64) -> Duration {
        match self {
            TimeUnit::Minutes => Duration::minutes(value),
            TimeUnit::Hours => Duration::hours(value),
            TimeUnit::Days => Duration::days(value),
        }
    }
}

/// When a new reminder should go off, as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSpec {
    /// `value` units from now
    FromNow { value: i64, unit: TimeUnit },
    /// A local wall-clock time
    At(NaiveDateTime),
}

impl TriggerSpec {
    /// Parse an offset like `10m`, `2 hours` or `3d`.
    pub fn parse_offset(input: &str) -> Result<Self> {
        let input = input.trim();
        let split = input
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(input.len());
        let (digits, unit) = input.split_at(split);

        let value: i64 = digits
            .parse()
            .map_err(|_| invalid(format!("Expected a number of minutes, hours or days: {}", input)))?;
        if !(1..=MAX_OFFSET).contains(&value) {
            return Err(invalid(format!("Offset must be between 1 and {}", MAX_OFFSET)));
        }

        let unit = match unit.trim().to_lowercase().as_str() {
            "m" | "min" | "mins" | "minute" | "minutes" => TimeUnit::Minutes,
            "h" | "hour" | "hours" => TimeUnit::Hours,
            "d" | "day" | "days" => TimeUnit::Days,
            other => return Err(invalid(format!("Unknown time unit: {:?}", other))),
        };

        Ok(TriggerSpec::FromNow { value, unit })
    }

    /// Parse a local date and time, `YYYY-MM-DD HH:MM`.
    pub fn parse_at(input: &str) -> Result<Self> {
        NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M")
            .map(TriggerSpec::At)
            .map_err(|_| invalid(format!("Expected YYYY-MM-DD HH:MM, got {:?}", input)))
    }

    /// Resolve to epoch seconds relative to `now`.
    ///
    /// Absolute times earlier than `now` are rejected.
    pub fn resolve(&self, now: DateTime<Local>) -> Result<f64> {
        let when = match self {
            TriggerSpec::FromNow { value, unit } => now + unit.duration(*value),
            TriggerSpec::At(naive) => {
                let when = Local
                    .from_local_datetime(naive)
                    .earliest()
                    .ok_or_else(|| invalid(format!("{} does not exist in local time", naive)))?;
                if when < now {
                    return Err(invalid("Cannot set reminders in the past".to_string()));
                }
                when
            }
        };

        Ok(when.timestamp() as f64 + f64::from(when.timestamp_subsec_micros()) / 1e6)
    }

    /// Short human description, e.g. `In 5 minutes`.
    pub fn describe(&self) -> String {
        match self {
            TriggerSpec::FromNow { value, unit } => {
                let unit = match unit {
                    TimeUnit::Minutes => "minutes",
                    TimeUnit::Hours => "hours",
                    TimeUnit::Days => "days",
                };
                format!("In {} {}", value, unit)
            }
            TriggerSpec::At(naive) => naive.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

fn invalid(message: String) -> ReminderError {
    ReminderError::InvalidInput(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_offset_units() {
        assert_eq!(
            TriggerSpec::parse_offset("10m").unwrap(),
            TriggerSpec::FromNow { value: 10, unit: TimeUnit::Minutes }
        );
        assert_eq!(
            TriggerSpec::parse_offset("2 hours").unwrap(),
            TriggerSpec::FromNow { value: 2, unit: TimeUnit::Hours }
        );
        assert_eq!(
            TriggerSpec::parse_offset("3D").unwrap(),
            TriggerSpec::FromNow { value: 3, unit: TimeUnit::Days }
        );
    }

    #[test]
    fn test_parse_offset_rejects_bad_input() {
        assert!(TriggerSpec::parse_offset("m").is_err());
        assert!(TriggerSpec::parse_offset("0m").is_err());
        assert!(TriggerSpec::parse_offset("1000h").is_err());
        assert!(TriggerSpec::parse_offset("5 weeks").is_err());
        assert!(TriggerSpec::parse_offset("-5m").is_err());
    }

    #[test]
    fn test_resolve_offset() {
        let now = fixed_now();
        let spec = TriggerSpec::parse_offset("90m").unwrap();
        let ts = spec.resolve(now).unwrap();
        assert_eq!(ts, (now.timestamp() + 90 * 60) as f64);
        assert_eq!(spec.describe(), "In 90 minutes");
    }

    #[test]
    fn test_resolve_absolute() {
        let now = fixed_now();
        let spec = TriggerSpec::parse_at("2026-10-20 09:30").unwrap();
        let expected = Local.with_ymd_and_hms(2026, 10, 20, 9, 30, 0).unwrap();
        assert_eq!(spec.resolve(now).unwrap(), expected.timestamp() as f64);
        assert_eq!(spec.describe(), "2026-10-20 09:30");
    }

    #[test]
    fn test_resolve_absolute_in_past_rejected() {
        let spec = TriggerSpec::parse_at("2026-10-19 11:59").unwrap();
        let err = spec.resolve(fixed_now()).unwrap_err();
        assert!(matches!(err, ReminderError::InvalidInput(ref m) if m.contains("past")));
    }

    #[test]
    fn test_parse_at_rejects_garbage() {
        assert!(TriggerSpec::parse_at("tomorrow").is_err());
        assert!(TriggerSpec::parse_at("2026-13-01 10:00").is_err());
    }
}
