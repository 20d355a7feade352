//! Fitted curves evaluated on an output tenor grid.

use serde::{Deserialize, Serialize};

use ettj_core::{Compounding, CurveFamily, Date};

use crate::calibration::{FitResult, FitStatus};
use crate::error::{CurveError, CurveResult};
use crate::nss::NssParameters;

/// Default output tenors in years.
pub const DEFAULT_OUTPUT_TENORS: [f64; 11] =
    [0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 15.0, 20.0, 30.0];

/// Default forward horizon: three months.
pub const DEFAULT_FORWARD_HORIZON: f64 = 0.25;

/// Where and how a fitted curve is reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputGrid {
    /// Tenors in years, ascending.
    pub tenors: Vec<f64>,
    /// Forward horizon in years.
    pub horizon: f64,
    /// Forward compounding convention.
    pub compounding: Compounding,
}

impl Default for OutputGrid {
    fn default() -> Self {
        Self {
            tenors: DEFAULT_OUTPUT_TENORS.to_vec(),
            horizon: DEFAULT_FORWARD_HORIZON,
            compounding: Compounding::Annual,
        }
    }
}

impl OutputGrid {
    /// Creates a grid, sorting tenors and dropping duplicates.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::InvalidTenor` for a negative or non-finite tenor
    /// or a non-positive horizon.
    pub fn new(mut tenors: Vec<f64>, horizon: f64, compounding: Compounding) -> CurveResult<Self> {
        if let Some(&bad) = tenors.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return Err(CurveError::invalid_tenor(bad, "output tenors must be non-negative"));
        }
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(CurveError::invalid_tenor(horizon, "horizon must be positive"));
        }
        tenors.sort_by(f64::total_cmp);
        tenors.dedup();
        Ok(Self {
            tenors,
            horizon,
            compounding,
        })
    }
}

/// One grid node of a fitted curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveNode {
    /// Tenor in years.
    pub tenor: f64,
    /// Fitted zero yield in percent.
    pub rate: f64,
    /// Forward rate from `tenor` to `tenor + horizon`, in percent.
    pub forward: f64,
}

/// A fitted curve with its grid values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCurve {
    /// Date of the underlying observations.
    pub as_of_date: Date,
    /// Curve family.
    pub family: CurveFamily,
    /// Model parameters.
    pub parameters: NssParameters,
    /// Fit confidence.
    pub status: FitStatus,
    /// RMSE of the fit, in percentage points.
    pub rmse: f64,
    /// Forward horizon used for the nodes.
    pub horizon: f64,
    /// Forward compounding convention used for the nodes.
    pub compounding: Compounding,
    /// Grid values in tenor order.
    pub nodes: Vec<CurveNode>,
}

impl FittedCurve {
    /// Evaluates a fit on a grid.
    pub fn from_fit(fit: &FitResult, grid: &OutputGrid) -> CurveResult<Self> {
        let nodes = grid
            .tenors
            .iter()
            .map(|&tenor| {
                Ok(CurveNode {
                    tenor,
                    rate: fit.parameters.evaluate(tenor),
                    forward: fit.parameters.forward(tenor, grid.horizon, grid.compounding)?,
                })
            })
            .collect::<CurveResult<Vec<_>>>()?;

        Ok(Self {
            as_of_date: fit.as_of_date,
            family: fit.family,
            parameters: fit.parameters,
            status: fit.status,
            rmse: fit.rmse,
            horizon: grid.horizon,
            compounding: grid.compounding,
            nodes,
        })
    }

    /// Model yield at any tenor.
    #[must_use]
    pub fn rate_at(&self, tenor: f64) -> f64 {
        self.parameters.evaluate(tenor)
    }

    /// Forward rate at any tenor with the curve's horizon and convention.
    pub fn forward_at(&self, tenor: f64) -> CurveResult<f64> {
        self.parameters.forward(tenor, self.horizon, self.compounding)
    }
}

/// Breakeven inflation `nominal - real` at each of the nominal curve's tenors.
///
/// # Errors
///
/// Returns `CurveError::InvalidParameters` if the curves belong to different
/// dates or are not a nominal/real pair.
pub fn breakeven(nominal: &FittedCurve, real: &FittedCurve) -> CurveResult<Vec<(f64, f64)>> {
    if nominal.family != CurveFamily::Nominal || real.family != CurveFamily::Real {
        return Err(CurveError::invalid_parameters(format!(
            "breakeven needs nominal and real curves, got {} and {}",
            nominal.family, real.family
        )));
    }
    if nominal.as_of_date != real.as_of_date {
        return Err(CurveError::invalid_parameters(format!(
            "breakeven curves disagree on date: {} vs {}",
            nominal.as_of_date, real.as_of_date
        )));
    }
    Ok(nominal
        .nodes
        .iter()
        .map(|node| (node.tenor, node.rate - real.rate_at(node.tenor)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::StageSummary;
    use approx::assert_relative_eq;

    fn fit_of(family: CurveFamily, parameters: NssParameters) -> FitResult {
        let stage = StageSummary {
            objective: 0.0,
            iterations: 0,
            evaluations: 0,
            converged: true,
        };
        FitResult {
            as_of_date: Date::from_ymd(2025, 1, 6).unwrap(),
            family,
            parameters,
            status: FitStatus::Converged,
            objective: 0.0,
            rmse: 0.0,
            residuals: vec![],
            global: stage,
            local: Some(stage),
        }
    }

    #[test]
    fn test_grid_validation() {
        let grid = OutputGrid::new(vec![5.0, 1.0, 1.0, 0.5], 0.25, Compounding::Annual).unwrap();
        assert_eq!(grid.tenors, vec![0.5, 1.0, 5.0]);
        assert!(OutputGrid::new(vec![-1.0], 0.25, Compounding::Annual).is_err());
        assert!(OutputGrid::new(vec![1.0], 0.0, Compounding::Annual).is_err());
    }

    #[test]
    fn test_flat_curve_grid() {
        let fit = fit_of(CurveFamily::Nominal, NssParameters::flat(11.0));
        let curve = FittedCurve::from_fit(&fit, &OutputGrid::default()).unwrap();

        assert_eq!(curve.nodes.len(), DEFAULT_OUTPUT_TENORS.len());
        for node in &curve.nodes {
            assert_relative_eq!(node.rate, 11.0, epsilon = 1e-12);
            assert_relative_eq!(node.forward, 11.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_breakeven() {
        let nominal = FittedCurve::from_fit(
            &fit_of(CurveFamily::Nominal, NssParameters::flat(11.0)),
            &OutputGrid::default(),
        )
        .unwrap();
        let real = FittedCurve::from_fit(
            &fit_of(CurveFamily::Real, NssParameters::flat(6.5)),
            &OutputGrid::default(),
        )
        .unwrap();

        let points = breakeven(&nominal, &real).unwrap();
        assert_eq!(points.len(), nominal.nodes.len());
        for (_, rate) in points {
            assert_relative_eq!(rate, 4.5, epsilon = 1e-12);
        }

        assert!(breakeven(&real, &nominal).is_err());
    }
}
