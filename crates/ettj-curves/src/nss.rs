//! Nelson-Siegel-Svensson yield curve model.
//!
//! The Svensson extension adds a second hump to Nelson-Siegel:
//!
//! ```text
//! y(t) = β₀ + β₁ L(t/τ₁) + β₂ (L(t/τ₁) - e^(-t/τ₁)) + β₃ (L(t/τ₂) - e^(-t/τ₂))
//! L(x) = (1 - e^(-x)) / x
//! ```
//!
//! - β₀: long-term level (y(∞) = β₀)
//! - β₁: short-term component (y(0) = β₀ + β₁)
//! - β₂, β₃: hump magnitudes
//! - τ₁, τ₂: decay factors, strictly positive

use serde::{Deserialize, Serialize};

use ettj_core::Compounding;

use crate::error::{CurveError, CurveResult};

/// Number of NSS parameters.
pub const NSS_DIMENSION: usize = 6;

/// The six NSS parameters. Rates are in percent.
///
/// # Example
///
/// ```rust
/// use ettj_curves::NssParameters;
///
/// let params = NssParameters::new(11.0, -1.0, 0.5, -0.3, 2.0, 8.0).unwrap();
/// assert!((params.evaluate(0.0) - 10.0).abs() < 1e-12);
/// assert!((params.evaluate(1_000.0) - 11.0).abs() < 0.05);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NssParameters {
    /// Long-term level.
    pub beta0: f64,
    /// Short-term component.
    pub beta1: f64,
    /// First hump component.
    pub beta2: f64,
    /// Second hump component.
    pub beta3: f64,
    /// First decay factor.
    pub tau1: f64,
    /// Second decay factor.
    pub tau2: f64,
}

impl NssParameters {
    /// Creates parameters, rejecting non-finite values and non-positive taus.
    ///
    /// τ₁ = τ₂ is accepted; the model is then ill-conditioned but well defined.
    pub fn new(
        beta0: f64,
        beta1: f64,
        beta2: f64,
        beta3: f64,
        tau1: f64,
        tau2: f64,
    ) -> CurveResult<Self> {
        let params = Self {
            beta0,
            beta1,
            beta2,
            beta3,
            tau1,
            tau2,
        };
        params.validate()?;
        Ok(params)
    }

    /// Builds parameters from `[β₀, β₁, β₂, β₃, τ₁, τ₂]`.
    pub fn from_slice(values: &[f64]) -> CurveResult<Self> {
        match values {
            &[b0, b1, b2, b3, t1, t2] => Self::new(b0, b1, b2, b3, t1, t2),
            _ => Err(CurveError::invalid_parameters(format!(
                "expected {NSS_DIMENSION} values, got {}",
                values.len()
            ))),
        }
    }

    /// Parameters as `[β₀, β₁, β₂, β₃, τ₁, τ₂]`.
    #[must_use]
    pub fn to_array(&self) -> [f64; NSS_DIMENSION] {
        [
            self.beta0, self.beta1, self.beta2, self.beta3, self.tau1, self.tau2,
        ]
    }

    /// A flat curve at `level`.
    #[must_use]
    pub fn flat(level: f64) -> Self {
        Self {
            beta0: level,
            beta1: 0.0,
            beta2: 0.0,
            beta3: 0.0,
            tau1: 1.0,
            tau2: 5.0,
        }
    }

    fn validate(&self) -> CurveResult<()> {
        if self.to_array().iter().any(|v| !v.is_finite()) {
            return Err(CurveError::invalid_parameters("parameters must be finite"));
        }
        if self.tau1 <= 0.0 {
            return Err(CurveError::invalid_parameters(format!(
                "tau1 must be positive, got {}",
                self.tau1
            )));
        }
        if self.tau2 <= 0.0 {
            return Err(CurveError::invalid_parameters(format!(
                "tau2 must be positive, got {}",
                self.tau2
            )));
        }
        Ok(())
    }

    /// Model yield at `t` years, in percent.
    ///
    /// For `t <= 0` the limit `β₀ + β₁` is returned.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> f64 {
        nss_yield(&self.to_array(), t)
    }

    /// Instantaneous forward rate at `t` years, in percent.
    #[must_use]
    pub fn instantaneous_forward(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return self.beta0 + self.beta1;
        }
        let x1 = t / self.tau1;
        let x2 = t / self.tau2;
        let exp_x1 = (-x1).exp();
        let exp_x2 = (-x2).exp();

        self.beta0 + self.beta1 * exp_x1 + self.beta2 * x1 * exp_x1 + self.beta3 * x2 * exp_x2
    }

    /// Forward rate between `t` and `t + horizon`, in percent.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::InvalidTenor` if `t` is negative or the horizon
    /// is not positive.
    pub fn forward(&self, t: f64, horizon: f64, compounding: Compounding) -> CurveResult<f64> {
        if !t.is_finite() || t < 0.0 {
            return Err(CurveError::invalid_tenor(t, "tenor must be non-negative"));
        }
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(CurveError::invalid_tenor(horizon, "horizon must be positive"));
        }
        let t2 = t + horizon;
        Ok(forward_rate(
            self.evaluate(t),
            t,
            self.evaluate(t2),
            t2,
            compounding,
        ))
    }
}

/// Forward rate implied by two zero yields (percent in, percent out).
///
/// Annual: `((1+y₂)^t₂ / (1+y₁)^t₁)^(1/(t₂-t₁)) - 1`.
/// Continuous: `(y₂ t₂ - y₁ t₁) / (t₂ - t₁)`.
#[must_use]
pub fn forward_rate(y1: f64, t1: f64, y2: f64, t2: f64, compounding: Compounding) -> f64 {
    let h = t2 - t1;
    match compounding {
        Compounding::Continuous => (y2 * t2 - y1 * t1) / h,
        Compounding::Annual => {
            let (r1, r2) = (y1 / 100.0, y2 / 100.0);
            let ratio = compounding.growth_factor(r2, t2) / compounding.growth_factor(r1, t1);
            (ratio.powf(1.0 / h) - 1.0) * 100.0
        }
    }
}

/// NSS yield for a raw `[β₀, β₁, β₂, β₃, τ₁, τ₂]` vector.
///
/// Used inside the optimizer objective, where parameters come from a box
/// with strictly positive tau bounds.
pub(crate) fn nss_yield(p: &[f64], t: f64) -> f64 {
    if t <= 0.0 {
        return p[0] + p[1];
    }
    let x1 = t / p[4];
    let x2 = t / p[5];

    p[0] + p[1] * loading_factor_1(x1)
        + p[2] * loading_factor_2(x1)
        + p[3] * loading_factor_2(x2)
}

/// `(1 - e^(-x)) / x`
fn loading_factor_1(x: f64) -> f64 {
    if x.abs() < 1e-10 {
        1.0 - x / 2.0 + x * x / 6.0
    } else {
        -(-x).exp_m1() / x
    }
}

/// `(1 - e^(-x)) / x - e^(-x)`
fn loading_factor_2(x: f64) -> f64 {
    if x.abs() < 1e-10 {
        x / 2.0 - x * x / 3.0
    } else {
        loading_factor_1(x) - (-x).exp()
    }
}
