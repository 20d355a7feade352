//! Error types for the core crate.

use thiserror::Error;

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by core types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid date or date string.
    #[error("Invalid date: {message}")]
    InvalidDate {
        /// Description of the date error.
        message: String,
    },

    /// Unknown curve family name.
    #[error("Unknown curve family: {name}")]
    UnknownFamily {
        /// The name that failed to parse.
        name: String,
    },

    /// Unknown compounding convention name.
    #[error("Unknown compounding convention: {name}")]
    UnknownCompounding {
        /// The name that failed to parse.
        name: String,
    },

    /// Business-day window with end before start.
    #[error("Invalid window: {start} is after {end}")]
    InvalidWindow {
        /// Window start.
        start: String,
        /// Window end.
        end: String,
    },
}

impl CoreError {
    /// Creates an invalid date error.
    #[must_use]
    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::InvalidDate {
            message: message.into(),
        }
    }

    /// Creates an unknown family error.
    #[must_use]
    pub fn unknown_family(name: impl Into<String>) -> Self {
        Self::UnknownFamily { name: name.into() }
    }
}
