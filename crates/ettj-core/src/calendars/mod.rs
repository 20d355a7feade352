//! Business day calendars.
//!
//! This module provides:
//! - The [`Calendar`] trait
//! - A weekend-only calendar and a holiday-list calendar
//! - Inclusive business-day windows for batch runs

mod window;

pub use window::BusinessDayWindow;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::Date;

/// Trait for business day calendars.
pub trait Calendar: Send + Sync {
    /// Returns the name of the calendar.
    fn name(&self) -> &str;

    /// Returns true if the date is a business day.
    fn is_business_day(&self, date: Date) -> bool;

    /// Returns true if the date is a holiday or weekend.
    fn is_holiday(&self, date: Date) -> bool {
        !self.is_business_day(date)
    }

    /// Advances a date by a number of business days.
    fn add_business_days(&self, date: Date, days: i32) -> Date {
        let mut result = date;
        let mut remaining = days.abs();
        let direction: i64 = if days >= 0 { 1 } else { -1 };

        while remaining > 0 {
            result = result.add_days(direction);
            if self.is_business_day(result) {
                remaining -= 1;
            }
        }

        result
    }

    /// Returns the previous business day on or before the given date.
    fn previous_business_day(&self, date: Date) -> Date {
        let mut result = date;
        while !self.is_business_day(result) {
            result = result.add_days(-1);
        }
        result
    }

    /// Counts business days between two dates (exclusive of start, inclusive of end).
    ///
    /// This is the `du` count of a maturity relative to a reference date.
    fn business_days_between(&self, start: Date, end: Date) -> i32 {
        let mut count = 0;
        let mut current = start.add_days(1);

        while current <= end {
            if self.is_business_day(current) {
                count += 1;
            }
            current = current.add_days(1);
        }

        count
    }
}

/// A weekend-only calendar (no holidays).
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekendCalendar;

impl Calendar for WeekendCalendar {
    fn name(&self) -> &str {
        "Weekend Only"
    }

    fn is_business_day(&self, date: Date) -> bool {
        date.is_weekday()
    }
}

/// Weekend calendar plus an explicit list of holidays.
///
/// # Example
///
/// ```
/// use ettj_core::calendars::{Calendar, HolidayCalendar};
/// use ettj_core::Date;
///
/// let carnival = Date::from_ymd(2025, 3, 4).unwrap();
/// let cal = HolidayCalendar::new("BR", [carnival]);
/// assert!(!cal.is_business_day(carnival));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    name: String,
    holidays: BTreeSet<Date>,
}

impl HolidayCalendar {
    /// Creates a calendar from a list of holiday dates.
    pub fn new(name: impl Into<String>, holidays: impl IntoIterator<Item = Date>) -> Self {
        Self {
            name: name.into(),
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Adds a holiday.
    pub fn add_holiday(&mut self, date: Date) {
        self.holidays.insert(date);
    }

    /// Number of configured holidays.
    #[must_use]
    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }
}

impl Calendar for HolidayCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_business_day(&self, date: Date) -> bool {
        date.is_weekday() && !self.holidays.contains(&date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    #[test]
    fn test_weekend_calendar() {
        let cal = WeekendCalendar;
        assert!(cal.is_business_day(d(2025, 1, 6)));
        assert!(!cal.is_business_day(d(2025, 1, 4)));
        assert!(!cal.is_business_day(d(2025, 1, 5)));
    }

    #[test]
    fn test_add_business_days() {
        let cal = WeekendCalendar;
        assert_eq!(cal.add_business_days(d(2025, 1, 3), 1), d(2025, 1, 6));
        assert_eq!(cal.add_business_days(d(2025, 1, 6), -1), d(2025, 1, 3));
    }

    #[test]
    fn test_business_days_between() {
        let cal = WeekendCalendar;
        assert_eq!(cal.business_days_between(d(2025, 1, 6), d(2025, 1, 10)), 4);
        assert_eq!(cal.business_days_between(d(2025, 1, 10), d(2025, 1, 6)), 0);
    }

    #[test]
    fn test_holiday_calendar() {
        let new_year = d(2025, 1, 1);
        let cal = HolidayCalendar::new("BR", [new_year]);
        assert_eq!(cal.name(), "BR");
        assert!(!cal.is_business_day(new_year));
        assert!(cal.is_business_day(d(2025, 1, 2)));
        assert_eq!(cal.previous_business_day(new_year), d(2024, 12, 31));
        // Tue 31 Dec -> Fri 3 Jan skips the holiday
        assert_eq!(cal.business_days_between(d(2024, 12, 31), d(2025, 1, 3)), 2);
    }
}
