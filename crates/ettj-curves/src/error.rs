//! Error types for curve fitting.

use ettj_math::MathError;
use thiserror::Error;

/// A specialized Result type for curve operations.
pub type CurveResult<T> = Result<T, CurveError>;

/// Error types for curve operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    /// Too few distinct maturities for a well-posed six-parameter fit.
    #[error("Insufficient data: need at least {required} distinct maturities, got {distinct}")]
    InsufficientData {
        /// Minimum number of distinct maturities.
        required: usize,
        /// Distinct maturities supplied.
        distinct: usize,
    },

    /// Observation rejected at construction.
    #[error("Malformed observation #{index} (maturity={maturity}, yield={yield_value}): {reason}")]
    MalformedObservation {
        /// Position in the input.
        index: usize,
        /// Offending maturity.
        maturity: f64,
        /// Offending yield.
        yield_value: f64,
        /// What is wrong with it.
        reason: String,
    },

    /// Local refinement did not converge; the global optimum was kept.
    #[error("Optimization degraded (rmse {rmse:.6}): {reason}")]
    OptimizationDegraded {
        /// RMSE of the retained fit.
        rmse: f64,
        /// Why the local stage stopped.
        reason: String,
    },

    /// Invalid model parameters.
    #[error("Invalid parameters: {reason}")]
    InvalidParameters {
        /// Description of the problem.
        reason: String,
    },

    /// Invalid tenor or horizon.
    #[error("Invalid tenor {tenor}: {reason}")]
    InvalidTenor {
        /// The offending value.
        tenor: f64,
        /// Description of the problem.
        reason: String,
    },

    /// Optimizer setup failed.
    #[error("Optimizer error: {0}")]
    Optimizer(#[from] MathError),
}

impl CurveError {
    /// Creates an invalid parameters error.
    #[must_use]
    pub fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }

    /// Creates an invalid tenor error.
    #[must_use]
    pub fn invalid_tenor(tenor: f64, reason: impl Into<String>) -> Self {
        Self::InvalidTenor {
            tenor,
            reason: reason.into(),
        }
    }
}
