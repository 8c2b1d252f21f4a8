//! Bookable time slots.
//!
//! Providers publish availability as calendar dates mapped to times of
//! day. A [`Slot`] is one selectable `(date, time)` pair from that map.

use core::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Error parsing a [`TimeOfDay`] from its wire representation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid time of day: {input}")]
pub struct TimeOfDayError {
    /// The rejected input.
    pub input: String,
}

/// A time of day as published in provider availability.
///
/// The wire format is `HH:MM` (seconds are accepted but not emitted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Parse from `HH:MM` or `HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input matches neither format.
    pub fn parse(s: &str) -> Result<Self, TimeOfDayError> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(Self)
            .map_err(|_| TimeOfDayError {
                input: s.to_owned(),
            })
    }

    /// The underlying time.
    #[must_use]
    pub const fn as_time(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self(time)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A single bookable `(date, time)` pair.
///
/// Slots are read-only projections of published availability; they are
/// never persisted by the client. Identity is the `(date, time)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    /// Calendar date of the slot.
    pub date: NaiveDate,
    /// Time of day of the slot.
    pub time: TimeOfDay,
}

impl Slot {
    /// Create a new slot.
    #[must_use]
    pub const fn new(date: NaiveDate, time: TimeOfDay) -> Self {
        Self { date, time }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn time(s: &str) -> TimeOfDay {
        TimeOfDay::parse(s).unwrap()
    }

    #[test]
    fn test_parse_short_and_long_forms() {
        assert_eq!(time("09:00"), time("09:00:00"));
        assert_eq!(time("23:45").to_string(), "23:45");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TimeOfDay::parse("9am").is_err());
        assert!(TimeOfDay::parse("25:00").is_err());
        assert!(TimeOfDay::parse("").is_err());
    }

    #[test]
    fn test_serde_wire_format() {
        let t = time("09:30");
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"09:30\"");

        let parsed: TimeOfDay = serde_json::from_str("\"09:30\"").unwrap();
        assert_eq!(parsed, t);
    }

    #[test]
    fn test_slot_identity() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a = Slot::new(date, time("09:00"));
        let b = Slot::new(date, time("09:00"));
        let c = Slot::new(date, time("10:00"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "2024-01-01 09:00");
    }
}
