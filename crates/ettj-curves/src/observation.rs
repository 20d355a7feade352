//! Market observations used as fitting input.

use serde::{Deserialize, Serialize};

use ettj_core::{CurveFamily, Date};

use crate::error::{CurveError, CurveResult};

/// A single yield quote.
///
/// Yields are in percent (`10.5` means 10.5%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Time to maturity in years.
    pub maturity: f64,
    /// Observed yield in percent.
    #[serde(rename = "yield")]
    pub yield_pct: f64,
    /// Weight of the squared residual in the objective.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Observation {
    /// Creates an unweighted observation.
    #[must_use]
    pub fn new(maturity: f64, yield_pct: f64) -> Self {
        Self {
            maturity,
            yield_pct,
            weight: 1.0,
        }
    }

    /// Sets the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    fn check(&self, index: usize) -> CurveResult<()> {
        let malformed = |reason: &str| CurveError::MalformedObservation {
            index,
            maturity: self.maturity,
            yield_value: self.yield_pct,
            reason: reason.to_string(),
        };
        if !self.maturity.is_finite() {
            return Err(malformed("maturity is not finite"));
        }
        if self.maturity <= 0.0 {
            return Err(malformed("maturity must be positive"));
        }
        if !self.yield_pct.is_finite() {
            return Err(malformed("yield is not finite"));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(malformed("weight must be finite and non-negative"));
        }
        Ok(())
    }
}

/// All observations for one `(as_of_date, family)` pair.
///
/// Observations are validated on construction and kept sorted by maturity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObservationSet")]
pub struct ObservationSet {
    as_of_date: Date,
    family: CurveFamily,
    observations: Vec<Observation>,
}

#[derive(Deserialize)]
struct RawObservationSet {
    as_of_date: Date,
    family: CurveFamily,
    observations: Vec<Observation>,
}

impl TryFrom<RawObservationSet> for ObservationSet {
    type Error = CurveError;

    fn try_from(raw: RawObservationSet) -> Result<Self, Self::Error> {
        Self::new(raw.as_of_date, raw.family, raw.observations)
    }
}

impl ObservationSet {
    /// Creates a validated, maturity-sorted observation set.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::MalformedObservation` for a non-positive or
    /// non-finite maturity, a non-finite yield or an invalid weight.
    pub fn new(
        as_of_date: Date,
        family: CurveFamily,
        mut observations: Vec<Observation>,
    ) -> CurveResult<Self> {
        for (index, obs) in observations.iter().enumerate() {
            obs.check(index)?;
        }
        observations.sort_by(|a, b| a.maturity.total_cmp(&b.maturity));
        Ok(Self {
            as_of_date,
            family,
            observations,
        })
    }

    /// Builds a set from `(maturity, yield)` pairs.
    pub fn from_pairs(
        as_of_date: Date,
        family: CurveFamily,
        pairs: &[(f64, f64)],
    ) -> CurveResult<Self> {
        let observations = pairs.iter().map(|&(m, y)| Observation::new(m, y)).collect();
        Self::new(as_of_date, family, observations)
    }

    /// Date the quotes refer to.
    #[must_use]
    pub fn as_of_date(&self) -> Date {
        self.as_of_date
    }

    /// Curve family.
    #[must_use]
    pub fn family(&self) -> CurveFamily {
        self.family
    }

    /// Observations sorted by maturity.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns true if there are no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of distinct maturities carrying a positive weight.
    ///
    /// Zero-weight quotes do not enter the objective and are not counted.
    #[must_use]
    pub fn distinct_maturities(&self) -> usize {
        let mut count = 0;
        let mut last: Option<f64> = None;
        for obs in self.observations.iter().filter(|o| o.weight > 0.0) {
            if last.map_or(true, |m| (obs.maturity - m).abs() > 1e-12) {
                count += 1;
                last = Some(obs.maturity);
            }
        }
        count
    }

    /// Unweighted mean yield.
    #[must_use]
    pub fn mean_yield(&self) -> f64 {
        if self.observations.is_empty() {
            return 0.0;
        }
        self.observations.iter().map(|o| o.yield_pct).sum::<f64>() / self.observations.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> Date {
        Date::from_ymd(2025, 1, 6).unwrap()
    }

    #[test]
    fn test_sorted_on_construction() {
        let set = ObservationSet::from_pairs(
            date(),
            CurveFamily::Nominal,
            &[(5.0, 11.0), (0.5, 10.0), (2.0, 10.5)],
        )
        .unwrap();
        let maturities: Vec<f64> = set.observations().iter().map(|o| o.maturity).collect();
        assert_eq!(maturities, vec![0.5, 2.0, 5.0]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_malformed_observations() {
        let cases = [(0.0, 10.0), (-1.0, 10.0), (f64::NAN, 10.0), (1.0, f64::INFINITY)];
        for (maturity, y) in cases {
            let err = ObservationSet::from_pairs(
                date(),
                CurveFamily::Real,
                &[(1.0, 5.0), (maturity, y)],
            )
            .unwrap_err();
            assert!(matches!(err, CurveError::MalformedObservation { index: 1, .. }));
        }

        let negative_weight = Observation::new(1.0, 5.0).with_weight(-1.0);
        assert!(ObservationSet::new(date(), CurveFamily::Real, vec![negative_weight]).is_err());
    }

    #[test]
    fn test_distinct_maturities() {
        let set = ObservationSet::from_pairs(
            date(),
            CurveFamily::Nominal,
            &[(1.0, 10.0), (1.0, 10.1), (2.0, 10.2), (2.0, 10.3)],
        )
        .unwrap();
        assert_eq!(set.distinct_maturities(), 2);
        assert!((set.mean_yield() - 10.15).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weight_maturities_are_not_counted() {
        let observations = vec![
            Observation::new(1.0, 10.0),
            Observation::new(2.0, 10.2).with_weight(0.0),
            Observation::new(2.0, 10.3).with_weight(0.5),
            Observation::new(5.0, 10.9).with_weight(0.0),
        ];
        let set = ObservationSet::new(date(), CurveFamily::Nominal, observations).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.distinct_maturities(), 2);
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"as_of_date":"2025-01-06","family":"nominal",
            "observations":[{"maturity":1.0,"yield":10.0},{"maturity":-2.0,"yield":10.5}]}"#;
        assert!(serde_json::from_str::<ObservationSet>(json).is_err());

        let json = r#"{"as_of_date":"2025-01-06","family":"real",
            "observations":[{"maturity":2.0,"yield":6.0},{"maturity":1.0,"yield":5.5,"weight":2.0}]}"#;
        let set: ObservationSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.family(), CurveFamily::Real);
        assert_eq!(set.observations()[0].weight, 2.0);
    }
}
