//! Set of weekdays a schedule is active on (0 = Sunday … 6 = Saturday).

use std::collections::BTreeSet;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Non-empty set of weekday indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<u8>")]
pub struct DaysOfWeek(BTreeSet<u8>);

impl DaysOfWeek {
    /// Sunday-based index of a chrono weekday.
    #[must_use]
    pub fn index_of(weekday: Weekday) -> u8 {
        // num_days_from_sunday is always in 0..=6
        u8::try_from(weekday.num_days_from_sunday()).unwrap_or_default()
    }

    /// Whether the set includes `weekday`.
    #[must_use]
    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0.contains(&Self::index_of(weekday))
    }

    /// Whether the set includes the raw index `day`.
    #[must_use]
    pub fn contains_index(&self, day: u8) -> bool {
        self.0.contains(&day)
    }

    /// Iterate in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

impl TryFrom<Vec<i64>> for DaysOfWeek {
    type Error = ValidationError;

    fn try_from(days: Vec<i64>) -> Result<Self, Self::Error> {
        if days.is_empty() {
            return Err(ValidationError::NoDays);
        }
        days.into_iter()
            .map(|day| match u8::try_from(day) {
                Ok(d) if d <= 6 => Ok(d),
                _ => Err(ValidationError::DayOutOfRange(day)),
            })
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }
}

impl From<DaysOfWeek> for Vec<u8> {
    fn from(days: DaysOfWeek) -> Self {
        days.0.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_index_sunday_as_zero() {
        assert_eq!(DaysOfWeek::index_of(Weekday::Sun), 0);
        assert_eq!(DaysOfWeek::index_of(Weekday::Mon), 1);
        assert_eq!(DaysOfWeek::index_of(Weekday::Sat), 6);
    }

    #[test]
    fn should_contain_listed_weekdays() {
        let days = DaysOfWeek::try_from(vec![1, 3]).unwrap();
        assert!(days.contains(Weekday::Mon));
        assert!(days.contains(Weekday::Wed));
        assert!(!days.contains(Weekday::Tue));
    }

    #[test]
    fn should_reject_empty_set() {
        assert_eq!(DaysOfWeek::try_from(vec![]), Err(ValidationError::NoDays));
    }

    #[test]
    fn should_reject_out_of_range_day() {
        assert_eq!(
            DaysOfWeek::try_from(vec![1, 7]),
            Err(ValidationError::DayOutOfRange(7))
        );
        assert_eq!(
            DaysOfWeek::try_from(vec![-1]),
            Err(ValidationError::DayOutOfRange(-1))
        );
    }

    #[test]
    fn should_deduplicate_and_sort() {
        let days = DaysOfWeek::try_from(vec![5, 1, 5]).unwrap();
        assert_eq!(days.iter().collect::<Vec<_>>(), vec![1, 5]);
    }

    #[test]
    fn should_serialize_as_integer_array() {
        let days = DaysOfWeek::try_from(vec![0, 6]).unwrap();
        assert_eq!(serde_json::to_string(&days).unwrap(), "[0,6]");
        assert!(serde_json::from_str::<DaysOfWeek>("[9]").is_err());
    }
}
