//! # ETTJ Core
//!
//! Core types shared by every crate of the ETTJ workspace.
//!
//! - **Types**: `Date`, `CurveFamily`, `Compounding`
//! - **Business Day Calendars**: weekend and holiday-list calendars
//! - **Windows**: inclusive business-day ranges used by batch runs
//!
//! ## Example
//!
//! ```rust
//! use ettj_core::prelude::*;
//!
//! let wednesday = Date::from_ymd(2025, 1, 8).unwrap();
//! let window = BusinessDayWindow::previous_week(wednesday);
//! assert_eq!(window.start(), Date::from_ymd(2024, 12, 30).unwrap());
//! assert_eq!(window.end(), Date::from_ymd(2025, 1, 3).unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]

pub mod calendars;
pub mod error;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::calendars::{BusinessDayWindow, Calendar, HolidayCalendar, WeekendCalendar};
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::types::{Compounding, CurveFamily, Date};
}

// Re-export commonly used types at crate root
pub use error::{CoreError, CoreResult};
pub use types::{Compounding, CurveFamily, Date};
