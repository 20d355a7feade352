//! Curve calibration.
//!
//! - [`NssFitter`]: two-stage NSS fit of an [`ObservationSet`](crate::ObservationSet)
//! - [`NssFitterConfig`]: bounds, initial guess and optimizer budgets

mod config;
mod nss_fit;

pub use config::{InitialGuess, NssFitterConfig, ParameterBounds};
pub use nss_fit::{fit, FitResult, FitStatus, NssFitter, StageSummary};
