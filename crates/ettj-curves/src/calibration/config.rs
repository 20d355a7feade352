//! Fitter configuration: parameter bounds, initial guess, optimizer budgets.

use serde::{Deserialize, Serialize};

use ettj_math::optimization::{Bounds, DifferentialEvolutionConfig, LbfgsbConfig};

use crate::error::CurveResult;
use crate::nss::{NssParameters, NSS_DIMENSION};
use crate::observation::ObservationSet;

/// Box constraints for the six NSS parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    /// Bounds for β₀.
    pub beta0: (f64, f64),
    /// Bounds for β₁.
    pub beta1: (f64, f64),
    /// Bounds for β₂.
    pub beta2: (f64, f64),
    /// Bounds for β₃.
    pub beta3: (f64, f64),
    /// Bounds for τ₁.
    pub tau1: (f64, f64),
    /// Bounds for τ₂.
    pub tau2: (f64, f64),
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            beta0: (-5.0, 30.0),
            beta1: (-30.0, 30.0),
            beta2: (-30.0, 30.0),
            beta3: (-30.0, 30.0),
            tau1: (0.1, 10.0),
            tau2: (0.1, 10.0),
        }
    }
}

impl ParameterBounds {
    /// Bounds as `[β₀, β₁, β₂, β₃, τ₁, τ₂]` pairs.
    #[must_use]
    pub fn to_pairs(&self) -> [(f64, f64); NSS_DIMENSION] {
        [
            self.beta0, self.beta1, self.beta2, self.beta3, self.tau1, self.tau2,
        ]
    }

    /// Builds bounds from `[β₀, β₁, β₂, β₃, τ₁, τ₂]` pairs.
    #[must_use]
    pub fn from_pairs(pairs: [(f64, f64); NSS_DIMENSION]) -> Self {
        let [beta0, beta1, beta2, beta3, tau1, tau2] = pairs;
        Self {
            beta0,
            beta1,
            beta2,
            beta3,
            tau1,
            tau2,
        }
    }

    /// Optimizer box.
    ///
    /// # Errors
    ///
    /// Returns an optimizer error if any pair is empty or non-finite, and
    /// `CurveError::InvalidParameters` if a tau bound admits non-positive values.
    pub fn to_bounds(&self) -> CurveResult<Bounds> {
        if self.tau1.0 <= 0.0 || self.tau2.0 <= 0.0 {
            return Err(crate::error::CurveError::invalid_parameters(
                "tau lower bounds must be positive",
            ));
        }
        Ok(Bounds::from_pairs(&self.to_pairs())?)
    }
}

/// Starting point for the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialGuess {
    /// `β₀ = mean yield`, `β₁ = y(shortest) - y(longest)`, `β₂ = β₃ = 0`,
    /// `τ₁ = 1`, `τ₂ = 5`.
    #[default]
    FromData,
    /// Fixed parameters.
    Fixed(NssParameters),
}

impl InitialGuess {
    /// Resolves the guess for an observation set.
    #[must_use]
    pub fn resolve(&self, set: &ObservationSet) -> [f64; NSS_DIMENSION] {
        match self {
            InitialGuess::Fixed(params) => params.to_array(),
            InitialGuess::FromData => {
                let obs = set.observations();
                let slope = match (obs.first(), obs.last()) {
                    (Some(first), Some(last)) => first.yield_pct - last.yield_pct,
                    _ => 0.0,
                };
                [set.mean_yield(), slope, 0.0, 0.0, 1.0, 5.0]
            }
        }
    }
}

/// Configuration for [`NssFitter`](super::NssFitter).
#[derive(Debug, Clone, PartialEq)]
pub struct NssFitterConfig {
    /// Parameter box.
    pub bounds: ParameterBounds,
    /// Optimizer starting point.
    pub initial_guess: InitialGuess,
    /// Global stage settings.
    pub global: DifferentialEvolutionConfig,
    /// Local stage settings.
    pub local: LbfgsbConfig,
    /// Minimum number of distinct maturities.
    pub min_observations: usize,
}

impl Default for NssFitterConfig {
    fn default() -> Self {
        Self {
            bounds: ParameterBounds::default(),
            initial_guess: InitialGuess::FromData,
            global: DifferentialEvolutionConfig::default(),
            local: LbfgsbConfig::default(),
            min_observations: NSS_DIMENSION,
        }
    }
}

impl NssFitterConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parameter bounds.
    #[must_use]
    pub fn with_bounds(mut self, bounds: ParameterBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Sets the initial guess.
    #[must_use]
    pub fn with_initial_guess(mut self, guess: InitialGuess) -> Self {
        self.initial_guess = guess;
        self
    }

    /// Sets the global-stage seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.global.seed = seed;
        self
    }

    /// Sets the global-stage generation budget.
    #[must_use]
    pub fn with_max_generations(mut self, generations: u32) -> Self {
        self.global.max_generations = generations;
        self
    }

    /// Sets the local-stage iteration budget.
    #[must_use]
    pub fn with_local_max_iterations(mut self, iterations: u32) -> Self {
        self.local.max_iterations = iterations;
        self
    }

    /// Sets the minimum number of distinct maturities (never below six).
    #[must_use]
    pub fn with_min_observations(mut self, min: usize) -> Self {
        self.min_observations = min.max(NSS_DIMENSION);
        self
    }
}
