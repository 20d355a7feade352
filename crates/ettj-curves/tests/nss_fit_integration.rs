//! Integration test: fit NSS curves to Brazilian government bond yields.
//!
//! Nominal quotes (percent, annual compounding):
//!
//! | Maturity | Yield  |
//! |----------|--------|
//! | 0.5Y     | 10.00% |
//! | 1Y       | 10.20% |
//! | 2Y       | 10.50% |
//! | 5Y       | 11.00% |
//! | 10Y      | 11.30% |
//! | 20Y      | 11.40% |
//!
//! The 30Y point is an extrapolation and must stay inside a plausible band.

use approx::assert_relative_eq;
use ettj_core::{Compounding, CurveFamily, Date};
use ettj_curves::prelude::*;

fn as_of() -> Date {
    Date::from_ymd(2025, 1, 6).unwrap()
}

fn nominal_quotes() -> ObservationSet {
    ObservationSet::from_pairs(
        as_of(),
        CurveFamily::Nominal,
        &[
            (0.5, 10.0),
            (1.0, 10.2),
            (2.0, 10.5),
            (5.0, 11.0),
            (10.0, 11.3),
            (20.0, 11.4),
        ],
    )
    .unwrap()
}

#[test]
fn test_nominal_curve_reprices_quotes() {
    let set = nominal_quotes();
    let result = NssFitter::default().fit(&set).unwrap();

    assert!(result.max_error() < 0.05, "{}", result.summary());
    for obs in set.observations() {
        assert_relative_eq!(
            result.parameters.evaluate(obs.maturity),
            obs.yield_pct,
            epsilon = 0.05
        );
    }
}

#[test]
fn test_long_end_extrapolation_is_bounded() {
    let result = NssFitter::default().fit(&nominal_quotes()).unwrap();
    let y30 = result.parameters.evaluate(30.0);

    assert!((9.0..=13.5).contains(&y30), "30Y extrapolated to {y30}");
}

#[test]
fn test_fit_respects_parameter_box() {
    let result = NssFitter::default().fit(&nominal_quotes()).unwrap();
    let bounds = ParameterBounds::default().to_bounds().unwrap();

    assert!(bounds.contains(&result.parameters.to_array()));
    assert!(result.parameters.tau1 >= 0.1 && result.parameters.tau2 >= 0.1);
}

#[test]
fn test_grid_forwards_are_consistent_with_zero_curve() {
    let result = NssFitter::default().fit(&nominal_quotes()).unwrap();
    let grid = OutputGrid::default();
    let curve = FittedCurve::from_fit(&result, &grid).unwrap();

    for node in &curve.nodes {
        let t2 = node.tenor + grid.horizon;
        let y2 = curve.rate_at(t2);
        // Compounding the spot to t and the forward over the horizon must give the spot to t2.
        let lhs = (1.0 + node.rate / 100.0).powf(node.tenor)
            * (1.0 + node.forward / 100.0).powf(grid.horizon);
        let rhs = (1.0 + y2 / 100.0).powf(t2);
        assert_relative_eq!(lhs, rhs, max_relative = 1e-10);
    }
}

#[test]
fn test_continuous_and_annual_forwards_agree_on_flat_curve() {
    let flat = NssParameters::flat(10.0);
    for t in [0.25, 1.0, 5.0, 20.0] {
        let annual = flat.forward(t, 0.25, Compounding::Annual).unwrap();
        let continuous = flat.forward(t, 0.25, Compounding::Continuous).unwrap();
        assert_relative_eq!(annual, 10.0, epsilon = 1e-9);
        assert_relative_eq!(continuous, 10.0, epsilon = 1e-9);
    }
}

#[test]
fn test_real_curve_and_breakeven() {
    let real = ObservationSet::from_pairs(
        as_of(),
        CurveFamily::Real,
        &[
            (0.5, 7.2),
            (1.0, 7.0),
            (2.0, 6.8),
            (5.0, 6.6),
            (10.0, 6.5),
            (20.0, 6.4),
        ],
    )
    .unwrap();

    let fitter = NssFitter::default();
    let grid = OutputGrid::default();
    let nominal_curve = FittedCurve::from_fit(&fitter.fit(&nominal_quotes()).unwrap(), &grid).unwrap();
    let real_curve = FittedCurve::from_fit(&fitter.fit(&real).unwrap(), &grid).unwrap();

    let points = breakeven(&nominal_curve, &real_curve).unwrap();
    let at_5y = points
        .iter()
        .find(|(tenor, _)| (*tenor - 5.0).abs() < 1e-12)
        .map(|(_, rate)| *rate)
        .unwrap();
    assert_relative_eq!(at_5y, 11.0 - 6.6, epsilon = 0.1);
}

#[test]
fn test_degenerate_inputs() {
    let three = ObservationSet::from_pairs(
        as_of(),
        CurveFamily::Nominal,
        &[(1.0, 10.0), (2.0, 10.5), (5.0, 11.0)],
    )
    .unwrap();
    assert!(matches!(
        NssFitter::default().fit(&three),
        Err(CurveError::InsufficientData { required: 6, distinct: 3 })
    ));

    let stacked = ObservationSet::from_pairs(as_of(), CurveFamily::Nominal, &[(3.0, 10.0); 6]).unwrap();
    assert!(matches!(
        NssFitter::default().fit(&stacked),
        Err(CurveError::InsufficientData { distinct: 1, .. })
    ));
}
