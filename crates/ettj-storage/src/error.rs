//! Storage error types.

use std::path::PathBuf;

use ettj_core::{CurveFamily, Date};
use thiserror::Error;

/// Storage operation result type.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage error types.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Two rows of one batch share a key but disagree on the rate.
    #[error("Conflicting {family} rows for {date} tenor {tenor}: {first} vs {second}")]
    DuplicateKeyConflict {
        /// Curve family.
        family: CurveFamily,
        /// Row date.
        date: Date,
        /// Row tenor.
        tenor: f64,
        /// Rate of the first row.
        first: f64,
        /// Rate of the conflicting row.
        second: f64,
    },

    /// Rows about to be written are not strictly increasing by `(date, tenor)`.
    #[error("Ordering violation in {family} at row {index}: {reason}")]
    OrderingViolation {
        /// Curve family.
        family: CurveFamily,
        /// Row index.
        index: usize,
        /// Description.
        reason: String,
    },

    /// Invalid row value.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Persisted data could not be parsed.
    #[error("Parse error in {path} line {line}: {reason}")]
    Parse {
        /// File being read.
        path: PathBuf,
        /// 1-based line number.
        line: u64,
        /// Description.
        reason: String,
    },

    /// Store was written with a different tenor unit.
    #[error("Tenor unit mismatch: store uses '{found}', configured '{expected}'")]
    TenorUnitMismatch {
        /// Configured unit.
        expected: String,
        /// Unit found in the store.
        found: String,
    },

    /// Exclusive lock could not be acquired in time.
    #[error("Timed out after {waited_ms} ms waiting for lock {path}")]
    LockTimeout {
        /// Lock file path.
        path: PathBuf,
        /// Time waited.
        waited_ms: u128,
    },

    /// Database error from the underlying storage engine.
    #[error("Database error: {0}")]
    Database(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// CSV encoding or decoding error.
    #[error("CSV error: {0}")]
    Csv(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Creates an invalid row error.
    #[must_use]
    pub fn invalid_row(reason: impl Into<String>) -> Self {
        Self::InvalidRow(reason.into())
    }
}

impl From<redb::Error> for StorageError {
    fn from(err: redb::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<csv::Error> for StorageError {
    fn from(err: csv::Error) -> Self {
        StorageError::Csv(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_display() {
        let err = StorageError::DuplicateKeyConflict {
            family: CurveFamily::Nominal,
            date: Date::from_ymd(2025, 1, 6).unwrap(),
            tenor: 252.0,
            first: 10.5,
            second: 10.6,
        };
        let msg = err.to_string();
        assert!(msg.contains("nominal"));
        assert!(msg.contains("2025-01-06"));
        assert!(msg.contains("10.6"));
    }

    #[test]
    fn test_io_conversion() {
        let err: StorageError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
