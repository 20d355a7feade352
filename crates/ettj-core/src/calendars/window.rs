//! Inclusive date windows iterated by business day.

use serde::{Deserialize, Serialize};

use super::Calendar;
use crate::error::{CoreError, CoreResult};
use crate::types::Date;

/// An inclusive `[start, end]` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDayWindow {
    start: Date,
    end: Date,
}

impl BusinessDayWindow {
    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidWindow` if `end` is before `start`.
    pub fn new(start: Date, end: Date) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::InvalidWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// A window holding a single date.
    #[must_use]
    pub fn single(date: Date) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Monday to Friday of the previous week, relative to `today`.
    ///
    /// The reference Monday is the Monday of the current week, except on a
    /// Monday itself, where it is the Monday a week earlier; the window is
    /// the week before the reference Monday.
    #[must_use]
    pub fn previous_week(today: Date) -> Self {
        let reference = if today.weekday() == chrono::Weekday::Mon {
            today.add_days(-7)
        } else {
            today.start_of_week()
        };
        let start = reference.add_days(-7);
        Self {
            start,
            end: start.add_days(4),
        }
    }

    /// First date of the window.
    #[must_use]
    pub fn start(&self) -> Date {
        self.start
    }

    /// Last date of the window.
    #[must_use]
    pub fn end(&self) -> Date {
        self.end
    }

    /// Business days of the window in ascending order.
    pub fn business_days(&self, calendar: &dyn Calendar) -> Vec<Date> {
        let mut days = Vec::new();
        let mut current = self.start;
        while current <= self.end {
            if calendar.is_business_day(current) {
                days.push(current);
            }
            current = current.add_days(1);
        }
        days
    }
}
