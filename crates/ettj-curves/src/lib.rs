//! # ETTJ Curves
//!
//! Parametric term-structure estimation.
//!
//! This crate provides:
//!
//! - **Observations**: validated yield quotes per date and curve family
//! - **Model**: the Nelson-Siegel-Svensson curve and its forward rates
//! - **Calibration**: a differential evolution + L-BFGS-B fit of the model
//! - **Fitted curves**: grid evaluation, forwards and breakeven derivation
//!
//! Rates are in percent throughout.
//!
//! ## Quick Start
//!
//! ```rust
//! use ettj_core::{Compounding, CurveFamily, Date};
//! use ettj_curves::prelude::*;
//!
//! let set = ObservationSet::from_pairs(
//!     Date::from_ymd(2025, 1, 6).unwrap(),
//!     CurveFamily::Nominal,
//!     &[(0.5, 10.0), (1.0, 10.2), (2.0, 10.5), (5.0, 11.0), (10.0, 11.3), (20.0, 11.4)],
//! )
//! .unwrap();
//!
//! let fit = NssFitter::default().fit(&set).unwrap();
//! let ten_year = fit.parameters.evaluate(10.0);
//! let forward = fit.parameters.forward(10.0, 0.25, Compounding::Annual).unwrap();
//! assert!((ten_year - 11.3).abs() < 0.1);
//! assert!(forward.is_finite());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]

pub mod calibration;
pub mod error;
pub mod fitted;
pub mod nss;
pub mod observation;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::calibration::{
        fit, FitResult, FitStatus, InitialGuess, NssFitter, NssFitterConfig, ParameterBounds,
    };
    pub use crate::error::{CurveError, CurveResult};
    pub use crate::fitted::{breakeven, CurveNode, FittedCurve, OutputGrid};
    pub use crate::nss::{forward_rate, NssParameters};
    pub use crate::observation::{Observation, ObservationSet};
}

pub use calibration::{FitResult, FitStatus, NssFitter, NssFitterConfig};
pub use error::{CurveError, CurveResult};
pub use fitted::FittedCurve;
pub use nss::NssParameters;
pub use observation::{Observation, ObservationSet};
