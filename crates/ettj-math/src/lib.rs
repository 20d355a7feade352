//! # ETTJ Math
//!
//! Bounded optimizers used to calibrate parametric yield curves.
//!
//! - [`optimization::differential_evolution`]: seeded global search over a box
//! - [`optimization::lbfgsb`]: projected quasi-Newton refinement inside a box
//!
//! Both work on plain `&[f64]` parameter vectors and minimise a scalar
//! objective. Gradients are taken by finite differences.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_lines)]

pub mod error;
pub mod optimization;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::optimization::{
        differential_evolution, lbfgsb, Bounds, DeStrategy, DifferentialEvolutionConfig,
        LbfgsbConfig, OptimizationResult, Termination,
    };
}

pub use error::{MathError, MathResult};
