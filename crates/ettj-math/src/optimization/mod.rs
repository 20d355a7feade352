//! Optimization algorithms.
//!
//! This module provides the box-constrained optimizers used for curve
//! fitting: a global differential evolution search and a local projected
//! L-BFGS refinement.

mod differential_evolution;
mod lbfgsb;

pub use differential_evolution::{differential_evolution, DeStrategy, DifferentialEvolutionConfig};
pub use lbfgsb::{lbfgsb, LbfgsbConfig};

use crate::error::{MathError, MathResult};

/// Box constraints `lower[i] <= x[i] <= upper[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Creates bounds from lower and upper vectors.
    ///
    /// # Errors
    ///
    /// Returns `MathError::DimensionMismatch` if the vectors differ in length
    /// and `MathError::InvalidBounds` if any pair is non-finite or not
    /// strictly increasing.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> MathResult<Self> {
        if lower.len() != upper.len() {
            return Err(MathError::dimension_mismatch(lower.len(), upper.len()));
        }
        if lower.is_empty() {
            return Err(MathError::invalid_input("bounds must not be empty"));
        }
        for (index, (&lo, &hi)) in lower.iter().zip(&upper).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(MathError::InvalidBounds {
                    index,
                    lower: lo,
                    upper: hi,
                });
            }
        }
        Ok(Self { lower, upper })
    }

    /// Creates bounds from `(lower, upper)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> MathResult<Self> {
        let (lower, upper) = pairs.iter().copied().unzip();
        Self::new(lower, upper)
    }

    /// Number of parameters.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    /// Lower bounds.
    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper bounds.
    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Returns true if `x` lies inside the box (inclusive).
    #[must_use]
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dimension()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&v, (&lo, &hi))| v >= lo && v <= hi)
    }

    /// Projects `x` onto the box.
    #[must_use]
    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
            .collect()
    }

    /// Maps a point of the unit cube onto the box.
    pub(crate) fn scale(&self, unit: &[f64]) -> Vec<f64> {
        unit.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&u, (&lo, &hi))| lo + u * (hi - lo))
            .collect()
    }

    pub(crate) fn check_dimension(&self, x: &[f64]) -> MathResult<()> {
        if x.len() == self.dimension() {
            Ok(())
        } else {
            Err(MathError::dimension_mismatch(self.dimension(), x.len()))
        }
    }
}

/// Why an optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Convergence criterion met.
    Converged,
    /// Iteration or generation budget exhausted.
    MaxIterations,
    /// No step along the search direction decreased the objective.
    LineSearchFailed,
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Optimal parameters found.
    pub parameters: Vec<f64>,
    /// Final objective function value.
    pub objective_value: f64,
    /// Number of iterations (generations for differential evolution).
    pub iterations: u32,
    /// Number of objective evaluations.
    pub evaluations: usize,
    /// Whether the optimization converged.
    pub converged: bool,
    /// Why the run stopped.
    pub termination: Termination,
}

impl OptimizationResult {
    /// One-line description for logs.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "f={:.6e} after {} iterations ({} evals, {:?}) at {}",
            self.objective_value,
            self.iterations,
            self.evaluations,
            self.termination,
            format_parameters(&self.parameters)
        )
    }
}

/// Central-difference gradient that stays inside the box.
///
/// At an active bound the difference becomes one-sided.
pub fn numerical_gradient<F>(f: &F, x: &[f64], bounds: &Bounds, step: f64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64 + ?Sized,
{
    let mut gradient = vec![0.0; x.len()];
    let mut probe = x.to_vec();
    for i in 0..x.len() {
        let h = step * x[i].abs().max(1.0);
        let hi = (x[i] + h).min(bounds.upper[i]);
        let lo = (x[i] - h).max(bounds.lower[i]);
        if hi <= lo {
            continue;
        }
        probe[i] = hi;
        let f_hi = f(&probe);
        probe[i] = lo;
        let f_lo = f(&probe);
        probe[i] = x[i];
        gradient[i] = (f_hi - f_lo) / (hi - lo);
    }
    gradient
}

fn format_parameters(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
