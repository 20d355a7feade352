//! Error types for mathematical operations.

use thiserror::Error;

/// A specialized Result type for mathematical operations.
pub type MathResult<T> = Result<T, MathError>;

/// Errors that can occur during optimization.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    /// Lower bound not strictly below upper bound, or a non-finite bound.
    #[error("Invalid bounds for parameter {index}: [{lower}, {upper}]")]
    InvalidBounds {
        /// Parameter index.
        index: usize,
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },

    /// Vector length does not match the problem dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Objective could not be evaluated at the starting point.
    #[error("Objective is not finite at the starting point (value: {value})")]
    NonFiniteObjective {
        /// The value returned by the objective.
        value: f64,
    },

    /// Invalid input parameter.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of the invalid input.
        reason: String,
    },
}

impl MathError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates a dimension mismatch error.
    #[must_use]
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MathError::InvalidBounds {
            index: 4,
            lower: 10.0,
            upper: 0.1,
        };
        assert!(err.to_string().contains("parameter 4"));

        let err = MathError::dimension_mismatch(6, 5);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 6, got 5");
    }
}
