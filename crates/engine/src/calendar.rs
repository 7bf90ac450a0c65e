//! Business-day calendar used for temporal projections.
//!
//! A day is non-business when it falls on a configured weekly rest day or
//! matches an injected holiday. The calendar is a pure value type: all
//! operations take `&self` and never touch the database, so it is safe to
//! share across concurrent recomputations.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Calendar of working days: weekly rest days plus an explicit holiday set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessCalendar {
    rest_days: BTreeSet<String>,
    holidays: BTreeSet<NaiveDate>,
}

impl Default for BusinessCalendar {
    /// Saturday and Sunday rest, no holidays.
    fn default() -> Self {
        Self::new([Weekday::Sat, Weekday::Sun], [])
    }
}

impl BusinessCalendar {
    pub fn new(
        rest_days: impl IntoIterator<Item = Weekday>,
        holidays: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        Self {
            rest_days: rest_days.into_iter().map(|d| d.to_string()).collect(),
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Adds a holiday to the calendar.
    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    /// Returns `true` when `date` is a working day.
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !self.rest_days.contains(&date.weekday().to_string()) && !self.holidays.contains(&date)
    }

    /// Returns the first business day at or after `date`.
    ///
    /// With `include_given = false` the search starts on the day after
    /// `date`, even when `date` itself is a business day.
    pub fn next_business_day(&self, date: NaiveDate, include_given: bool) -> NaiveDate {
        let mut current = if include_given {
            date
        } else {
            date + Days::new(1)
        };
        while !self.is_business_day(current) {
            current = current + Days::new(1);
        }
        current
    }

    /// Returns the last business day at or before `date`.
    ///
    /// With `include_given = false` the search starts on the day before
    /// `date`.
    pub fn previous_business_day(&self, date: NaiveDate, include_given: bool) -> NaiveDate {
        let mut current = if include_given {
            date
        } else {
            date - Days::new(1)
        };
        while !self.is_business_day(current) {
            current = current - Days::new(1);
        }
        current
    }

    /// Returns every business day in `[start, end]`.
    ///
    /// Fails with [`EngineError::InvalidDateRange`] when `start > end`.
    pub fn business_days_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ResultEngine<Vec<NaiveDate>> {
        if start > end {
            return Err(EngineError::InvalidDateRange(format!(
                "start {start} is after end {end}"
            )));
        }

        let mut days = Vec::new();
        let mut current = start;
        while current <= end {
            if self.is_business_day(current) {
                days.push(current);
            }
            current = current + Days::new(1);
        }
        Ok(days)
    }

    /// Counts the business days in `[start, end]`.
    pub fn count_business_days(&self, start: NaiveDate, end: NaiveDate) -> ResultEngine<usize> {
        Ok(self.business_days_between(start, end)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2026-08-21 is a Friday.
    const FRIDAY: (i32, u32, u32) = (2026, 8, 21);

    #[test]
    fn weekend_is_not_business() {
        let calendar = BusinessCalendar::default();
        let friday = date(FRIDAY.0, FRIDAY.1, FRIDAY.2);

        assert!(calendar.is_business_day(friday));
        assert!(!calendar.is_business_day(friday + Days::new(1)));
        assert!(!calendar.is_business_day(friday + Days::new(2)));
        assert!(calendar.is_business_day(friday + Days::new(3)));
    }

    #[test]
    fn next_business_day_skips_weekend() {
        let calendar = BusinessCalendar::default();
        let friday = date(FRIDAY.0, FRIDAY.1, FRIDAY.2);
        let monday = date(2026, 8, 24);

        assert_eq!(calendar.next_business_day(friday, false), monday);
        assert_eq!(calendar.next_business_day(friday, true), friday);
        // Starting from Saturday, include_given still lands on Monday.
        assert_eq!(calendar.next_business_day(friday + Days::new(1), true), monday);
    }

    #[test]
    fn previous_business_day_skips_weekend_and_holidays() {
        let mut calendar = BusinessCalendar::default();
        let friday = date(FRIDAY.0, FRIDAY.1, FRIDAY.2);
        let monday = date(2026, 8, 24);
        let thursday = date(2026, 8, 20);

        assert_eq!(calendar.previous_business_day(monday, false), friday);

        calendar.add_holiday(friday);
        assert_eq!(calendar.previous_business_day(monday, false), thursday);
    }

    #[test]
    fn holiday_breaks_business_day() {
        let mut calendar = BusinessCalendar::default();
        let monday = date(2026, 8, 24);
        let tuesday = date(2026, 8, 25);

        calendar.add_holiday(monday);
        assert!(!calendar.is_business_day(monday));
        assert_eq!(
            calendar.next_business_day(date(FRIDAY.0, FRIDAY.1, FRIDAY.2), false),
            tuesday
        );
    }

    #[test]
    fn between_rejects_inverted_range() {
        let calendar = BusinessCalendar::default();
        let friday = date(FRIDAY.0, FRIDAY.1, FRIDAY.2);

        let err = calendar
            .business_days_between(friday, friday - Days::new(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDateRange(_)));
    }

    #[test]
    fn count_over_a_full_week() {
        let calendar = BusinessCalendar::default();
        let monday = date(2026, 8, 17);
        let sunday = date(2026, 8, 23);

        assert_eq!(calendar.count_business_days(monday, sunday).unwrap(), 5);
        assert_eq!(
            calendar.business_days_between(monday, sunday).unwrap(),
            vec![
                date(2026, 8, 17),
                date(2026, 8, 18),
                date(2026, 8, 19),
                date(2026, 8, 20),
                date(2026, 8, 21),
            ]
        );
    }
}
