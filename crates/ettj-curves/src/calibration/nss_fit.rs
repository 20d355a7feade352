//! Two-stage Nelson-Siegel-Svensson calibration.
//!
//! # Approach
//!
//! The objective is the (optionally weighted) sum of squared yield residuals
//! over every observed maturity. The surface is non-convex in the decay
//! factors, so the [`NssFitter`] first searches the whole parameter box with
//! differential evolution, then polishes the best member with a projected
//! L-BFGS run.
//!
//! If the local stage stops without converging, the global optimum is kept
//! and the result is flagged [`FitStatus::OptimizationDegraded`].
//!
//! # Example
//!
//! ```rust
//! use ettj_core::{CurveFamily, Date};
//! use ettj_curves::prelude::*;
//!
//! let set = ObservationSet::from_pairs(
//!     Date::from_ymd(2025, 1, 6).unwrap(),
//!     CurveFamily::Nominal,
//!     &[(0.5, 10.0), (1.0, 10.2), (2.0, 10.5), (5.0, 11.0), (10.0, 11.3), (20.0, 11.4)],
//! )
//! .unwrap();
//!
//! let result = NssFitter::default().fit(&set).unwrap();
//! assert!(result.rmse < 0.05);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ettj_core::{CurveFamily, Date};
use ettj_math::optimization::{differential_evolution, lbfgsb, OptimizationResult};

use super::config::{InitialGuess, NssFitterConfig, ParameterBounds};
use crate::error::{CurveError, CurveResult};
use crate::nss::{nss_yield, NssParameters};
use crate::observation::{Observation, ObservationSet};

/// Confidence in a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    /// Both stages finished normally.
    Converged,
    /// Local refinement did not converge; global optimum kept.
    OptimizationDegraded,
}

impl std::fmt::Display for FitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitStatus::Converged => f.write_str("converged"),
            FitStatus::OptimizationDegraded => f.write_str("degraded"),
        }
    }
}

/// Diagnostics of one optimizer stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    /// Final objective value.
    pub objective: f64,
    /// Iterations or generations run.
    pub iterations: u32,
    /// Objective evaluations.
    pub evaluations: usize,
    /// Whether the stage met its convergence criterion.
    pub converged: bool,
}

impl From<&OptimizationResult> for StageSummary {
    fn from(result: &OptimizationResult) -> Self {
        Self {
            objective: result.objective_value,
            iterations: result.iterations,
            evaluations: result.evaluations,
            converged: result.converged,
        }
    }
}

/// Result of an NSS fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Date of the fitted observations.
    pub as_of_date: Date,
    /// Curve family.
    pub family: CurveFamily,
    /// Fitted parameters.
    pub parameters: NssParameters,
    /// Confidence flag.
    pub status: FitStatus,
    /// Sum of (weighted) squared residuals.
    pub objective: f64,
    /// Root mean squared residual, in percentage points.
    pub rmse: f64,
    /// Model minus observed yield per observation, in maturity order.
    pub residuals: Vec<f64>,
    /// Global stage diagnostics.
    pub global: StageSummary,
    /// Local stage diagnostics; absent if the local stage could not start.
    pub local: Option<StageSummary>,
}

impl FitResult {
    /// Returns true if the fit is flagged as degraded.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.status == FitStatus::OptimizationDegraded
    }

    /// Largest absolute residual.
    #[must_use]
    pub fn max_error(&self) -> f64 {
        self.residuals.iter().map(|r| r.abs()).fold(0.0, f64::max)
    }

    /// Rejects degraded fits.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::OptimizationDegraded` if the fit is degraded.
    pub fn into_strict(self) -> CurveResult<Self> {
        if self.is_degraded() {
            let reason = match self.local {
                Some(local) => format!(
                    "local stage stopped after {} iterations without converging",
                    local.iterations
                ),
                None => "local stage could not start".to_string(),
            };
            return Err(CurveError::OptimizationDegraded {
                rmse: self.rmse,
                reason,
            });
        }
        Ok(self)
    }

    /// One-line description of the fit.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "NSS {} {} {}: RMSE={:.4}pp, Max={:.4}pp, DE {} gens, L-BFGS-B {} iters",
            self.family,
            self.as_of_date,
            self.status,
            self.rmse,
            self.max_error(),
            self.global.iterations,
            self.local.map_or(0, |l| l.iterations),
        )
    }
}

/// Fits NSS curves to observation sets.
#[derive(Debug, Clone, Default)]
pub struct NssFitter {
    config: NssFitterConfig,
}

impl NssFitter {
    /// Creates a fitter.
    #[must_use]
    pub fn new(config: NssFitterConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &NssFitterConfig {
        &self.config
    }

    /// Fits the model to an observation set.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::InsufficientData` if the set has fewer distinct
    /// positively weighted maturities than required, and an optimizer error
    /// for an invalid box.
    pub fn fit(&self, set: &ObservationSet) -> CurveResult<FitResult> {
        let distinct = set.distinct_maturities();
        if distinct < self.config.min_observations {
            return Err(CurveError::InsufficientData {
                required: self.config.min_observations,
                distinct,
            });
        }

        let bounds = self.config.bounds.to_bounds()?;
        let guess = bounds.clamp(&self.config.initial_guess.resolve(set));
        let observations = set.observations();
        let objective = |p: &[f64]| sum_squared_residuals(p, observations);

        let global = differential_evolution(&objective, &bounds, &self.config.global, Some(&guess))?;
        if !global.converged {
            warn!(
                family = %set.family(),
                date = %set.as_of_date(),
                generations = global.iterations,
                "global search hit its generation budget"
            );
        }

        let refined = lbfgsb(&objective, &bounds, &global.parameters, &self.config.local);
        let (best, status, local) = match refined {
            Ok(local) if local.converged => {
                let summary = StageSummary::from(&local);
                (local.parameters, FitStatus::Converged, Some(summary))
            }
            Ok(local) => {
                warn!(
                    family = %set.family(),
                    date = %set.as_of_date(),
                    termination = ?local.termination,
                    iterations = local.iterations,
                    "local refinement did not converge, keeping global optimum"
                );
                let summary = StageSummary::from(&local);
                (global.parameters.clone(), FitStatus::OptimizationDegraded, Some(summary))
            }
            Err(err) => {
                warn!(
                    family = %set.family(),
                    date = %set.as_of_date(),
                    error = %err,
                    "local refinement failed, keeping global optimum"
                );
                (global.parameters.clone(), FitStatus::OptimizationDegraded, None)
            }
        };

        let parameters = NssParameters::from_slice(&best)?;
        let residuals: Vec<f64> = observations
            .iter()
            .map(|o| parameters.evaluate(o.maturity) - o.yield_pct)
            .collect();
        let rmse = (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt();

        let result = FitResult {
            as_of_date: set.as_of_date(),
            family: set.family(),
            parameters,
            status,
            objective: sum_squared_residuals(&best, observations),
            rmse,
            residuals,
            global: StageSummary::from(&global),
            local,
        };
        info!("{}", result.summary());
        Ok(result)
    }
}

/// Fits an observation set with explicit bounds and initial guess and
/// default optimizer settings.
pub fn fit(
    set: &ObservationSet,
    bounds: ParameterBounds,
    initial_guess: InitialGuess,
) -> CurveResult<FitResult> {
    let config = NssFitterConfig::default()
        .with_bounds(bounds)
        .with_initial_guess(initial_guess);
    NssFitter::new(config).fit(set)
}

fn sum_squared_residuals(p: &[f64], observations: &[Observation]) -> f64 {
    observations
        .iter()
        .map(|o| {
            let r = nss_yield(p, o.maturity) - o.yield_pct;
            o.weight * r * r
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date() -> Date {
        Date::from_ymd(2025, 1, 6).unwrap()
    }

    fn synthetic(params: &NssParameters, maturities: &[f64]) -> ObservationSet {
        let pairs: Vec<(f64, f64)> = maturities.iter().map(|&t| (t, params.evaluate(t))).collect();
        ObservationSet::from_pairs(date(), CurveFamily::Nominal, &pairs).unwrap()
    }

    #[test]
    fn test_round_trip_recovers_curve() {
        let truth = NssParameters::new(12.0, -2.0, 1.5, -1.0, 1.5, 6.0).unwrap();
        let maturities = [0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 15.0, 20.0, 30.0];
        let set = synthetic(&truth, &maturities);

        let result = NssFitter::default().fit(&set).unwrap();

        assert!(result.rmse < 5e-3, "rmse {}", result.rmse);
        for t in [0.75, 4.0, 12.0, 25.0] {
            assert_relative_eq!(result.parameters.evaluate(t), truth.evaluate(t), epsilon = 5e-3);
        }
    }

    #[test]
    fn test_too_few_observations() {
        let set = ObservationSet::from_pairs(
            date(),
            CurveFamily::Nominal,
            &[(1.0, 10.0), (2.0, 10.5), (5.0, 11.0)],
        )
        .unwrap();
        let err = NssFitter::default().fit(&set).unwrap_err();
        assert_eq!(
            err,
            CurveError::InsufficientData {
                required: 6,
                distinct: 3
            }
        );
    }

    #[test]
    fn test_zero_weights_do_not_satisfy_minimum() {
        let observations: Vec<Observation> = [0.5, 1.0, 2.0, 5.0, 10.0, 20.0]
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                let weight = if i % 2 == 0 { 1.0 } else { 0.0 };
                Observation::new(m, 10.0 + m * 0.05).with_weight(weight)
            })
            .collect();
        let set = ObservationSet::new(date(), CurveFamily::Nominal, observations).unwrap();
        assert_eq!(
            NssFitter::default().fit(&set).unwrap_err(),
            CurveError::InsufficientData {
                required: 6,
                distinct: 3
            }
        );
    }

    #[test]
    fn test_single_maturity_is_insufficient() {
        let pairs: Vec<(f64, f64)> = (0..6).map(|i| (2.0, 10.0 + f64::from(i) * 0.01)).collect();
        let set = ObservationSet::from_pairs(date(), CurveFamily::Real, &pairs).unwrap();
        assert!(matches!(
            NssFitter::default().fit(&set),
            Err(CurveError::InsufficientData { distinct: 1, .. })
        ));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let truth = NssParameters::new(10.0, 1.0, -1.0, 0.5, 2.0, 7.0).unwrap();
        let set = synthetic(&truth, &[0.5, 1.0, 2.0, 4.0, 8.0, 15.0, 25.0]);
        let fitter = NssFitter::new(NssFitterConfig::new().with_seed(11));

        let a = fitter.fit(&set).unwrap();
        let b = fitter.fit(&set).unwrap();
        assert_eq!(a.parameters, b.parameters);
        assert_eq!(a.objective, b.objective);
    }

    #[test]
    fn test_degraded_when_local_budget_exhausted() {
        let truth = NssParameters::new(12.0, -2.0, 1.5, -1.0, 1.5, 6.0).unwrap();
        let set = synthetic(&truth, &[0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0]);
        let config = NssFitterConfig::new()
            .with_max_generations(5)
            .with_local_max_iterations(1);

        let result = NssFitter::new(config).fit(&set).unwrap();

        assert_eq!(result.status, FitStatus::OptimizationDegraded);
        assert_relative_eq!(result.objective, result.global.objective, epsilon = 1e-12);
        assert!(matches!(
            result.into_strict(),
            Err(CurveError::OptimizationDegraded { .. })
        ));
    }

    #[test]
    fn test_fixed_initial_guess_respects_bounds() {
        let truth = NssParameters::new(6.0, 0.5, 0.0, 0.0, 1.0, 5.0).unwrap();
        let set = synthetic(&truth, &[0.5, 1.0, 2.0, 3.0, 5.0, 10.0]);
        let wild = NssParameters::new(100.0, 100.0, 0.0, 0.0, 50.0, 50.0).unwrap();

        let result = fit(&set, ParameterBounds::default(), InitialGuess::Fixed(wild)).unwrap();

        let bounds = ParameterBounds::default().to_bounds().unwrap();
        assert!(bounds.contains(&result.parameters.to_array()));
        assert!(result.rmse < 1e-2);
    }

    #[test]
    fn test_weights_shift_the_fit() {
        let mut observations: Vec<Observation> = [0.5, 1.0, 2.0, 5.0, 10.0, 20.0]
            .iter()
            .map(|&t| Observation::new(t, 10.0))
            .collect();
        // One outlier at 5y; heavily down-weighted it should barely move the curve.
        observations[3] = Observation::new(5.0, 14.0).with_weight(1e-6);
        let set = ObservationSet::new(date(), CurveFamily::Nominal, observations).unwrap();

        let result = NssFitter::default().fit(&set).unwrap();
        assert!((result.parameters.evaluate(20.0) - 10.0).abs() < 0.05);
    }

    #[test]
    fn test_summary_mentions_family_and_status() {
        let truth = NssParameters::flat(9.0);
        let set = synthetic(&truth, &[0.5, 1.0, 2.0, 3.0, 5.0, 10.0]);
        let result = NssFitter::default().fit(&set).unwrap();
        let summary = result.summary();
        assert!(summary.contains("nominal"));
        assert!(summary.contains("2025-01-06"));
    }
}
