//! Service availability resolution.
//!
//! Providers publish availability as a map from calendar date to a list
//! of times. [`Schedule::flatten`] turns that map into the flat, ordered
//! slot list the shopper picks from.
//!
//! Dates iterate in calendar order; times keep the provider's published
//! order within a day. No double-booking check happens locally - a
//! conflicting selection is rejected server-side at payment confirmation
//! and surfaced as a gateway error.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use marigold_core::{Slot, TimeOfDay};
use serde::{Deserialize, Serialize};

/// A service's published availability.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Schedule(BTreeMap<NaiveDate, Vec<TimeOfDay>>);

impl Schedule {
    /// Create an empty schedule.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Whether the schedule publishes no slots at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Flatten into the ordered, selectable slot list.
    #[must_use]
    pub fn flatten(&self) -> Vec<Slot> {
        self.0
            .iter()
            .flat_map(|(date, times)| times.iter().map(|time| Slot::new(*date, *time)))
            .collect()
    }

    /// Whether the schedule publishes the given slot.
    #[must_use]
    pub fn contains(&self, slot: &Slot) -> bool {
        self.0
            .get(&slot.date)
            .is_some_and(|times| times.contains(&slot.time))
    }
}

impl From<BTreeMap<NaiveDate, Vec<TimeOfDay>>> for Schedule {
    fn from(map: BTreeMap<NaiveDate, Vec<TimeOfDay>>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn schedule_from_json(json: &str) -> Schedule {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_flatten_order() {
        let schedule = schedule_from_json(
            r#"{"2024-01-02": ["11:00"], "2024-01-01": ["09:00", "10:00"]}"#,
        );

        let slots: Vec<String> = schedule.flatten().iter().map(Slot::to_string).collect();
        assert_eq!(
            slots,
            vec!["2024-01-01 09:00", "2024-01-01 10:00", "2024-01-02 11:00"]
        );
    }

    #[test]
    fn test_flatten_keeps_published_time_order_within_a_day() {
        // Times are not re-sorted; the provider's order stands.
        let schedule = schedule_from_json(r#"{"2024-01-01": ["14:00", "09:00"]}"#);
        let slots: Vec<String> = schedule.flatten().iter().map(Slot::to_string).collect();
        assert_eq!(slots, vec!["2024-01-01 14:00", "2024-01-01 09:00"]);
    }

    #[test]
    fn test_contains() {
        let schedule = schedule_from_json(r#"{"2024-01-01": ["09:00"]}"#);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert!(schedule.contains(&Slot::new(date, TimeOfDay::parse("09:00").unwrap())));
        assert!(!schedule.contains(&Slot::new(date, TimeOfDay::parse("10:00").unwrap())));
    }

    #[test]
    fn test_empty_states() {
        assert!(Schedule::new().is_empty());
        assert!(schedule_from_json(r#"{"2024-01-01": []}"#).is_empty());
        assert!(!schedule_from_json(r#"{"2024-01-01": ["09:00"]}"#).is_empty());
        assert!(Schedule::new().flatten().is_empty());
    }
}
