//! Pipeline error types.

use thiserror::Error;

use ettj_core::Date;

/// Data source result type.
pub type SourceResult<T> = Result<T, SourceError>;

/// Pipeline result type.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by a data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// I/O error reading the source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source content could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The payload for one date is unusable.
    #[error("Malformed payload for {date}: {reason}")]
    Malformed {
        /// Requested date.
        date: Date,
        /// Description.
        reason: String,
    },

    /// Source cannot be reached.
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Creates a malformed payload error.
    pub fn malformed(date: Date, reason: impl Into<String>) -> Self {
        Self::Malformed {
            date,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source setup error.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Store error. Fatal for the run.
    #[error("Storage error: {0}")]
    Storage(#[from] ettj_storage::StorageError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ettj_config::ConfigError),

    /// Curve construction error.
    #[error("Curve error: {0}")]
    Curve(#[from] ettj_curves::CurveError),

    /// The source answered two requests with different data for the same
    /// data date. Nothing is written.
    #[error("Conflicting data for {actual} (first served for {first_requested}, again for {requested}): {reason}")]
    ReconciliationConflict {
        /// Data date both payloads claim.
        actual: Date,
        /// Request that first returned this data date.
        first_requested: Date,
        /// Request that returned the differing payload.
        requested: Date,
        /// First difference found.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let date = Date::from_ymd(2025, 1, 6).unwrap();
        let err = SourceError::malformed(date, "no vertices");
        assert_eq!(err.to_string(), "Malformed payload for 2025-01-06: no vertices");

        let wrapped: PipelineError = err.into();
        assert!(wrapped.to_string().starts_with("Source error:"));
    }
}
