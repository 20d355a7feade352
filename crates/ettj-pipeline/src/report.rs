//! Run report.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use ettj_core::{CurveFamily, Date};
use ettj_curves::FittedCurve;
use ettj_storage::MergeReport;

/// A request answered with another date's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Date asked for.
    pub requested: Date,
    /// Date of the data returned.
    pub actual: Date,
}

/// Where a per-date failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// Fetching from the source.
    Source,
    /// Fitting a curve.
    Fit,
    /// Building rows from a curve or vertices.
    Rows,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Source => write!(f, "source"),
            FailureStage::Fit => write!(f, "fit"),
            FailureStage::Rows => write!(f, "rows"),
        }
    }
}

/// A failure isolated to one date (and family).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFailure {
    /// Date concerned; the actual date once known.
    pub date: Date,
    /// Family, when the failure is family specific.
    pub family: Option<CurveFamily>,
    /// Stage.
    pub stage: FailureStage,
    /// Error message.
    pub reason: String,
}

/// A fit kept or dropped with reduced confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegradedFit {
    /// Data date.
    pub date: Date,
    /// Family.
    pub family: CurveFamily,
    /// RMSE of the global-stage parameters.
    pub rmse: f64,
    /// True if the fit was stored.
    pub stored: bool,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Business days requested.
    pub requested: Vec<Date>,
    /// Requests that returned data.
    pub fetched: usize,
    /// Requests that returned nothing.
    pub empty: Vec<Date>,
    /// Requests answered with another date's data.
    pub reconciled: Vec<Reconciliation>,
    /// Per-date source, fit and row failures.
    pub failures: Vec<DateFailure>,
    /// Degraded fits.
    pub degraded: Vec<DegradedFit>,
    /// Curves fitted during the run.
    pub curves: Vec<FittedCurve>,
    /// Rows prepared per family.
    pub pending_rows: BTreeMap<CurveFamily, usize>,
    /// One merge per family with rows. Empty on a dry run.
    pub merges: Vec<MergeReport>,
    /// True if nothing was written.
    pub dry_run: bool,
}

impl RunReport {
    /// Failures at the fit stage.
    pub fn fit_failures(&self) -> impl Iterator<Item = &DateFailure> {
        self.failures.iter().filter(|f| f.stage == FailureStage::Fit)
    }

    /// Rows inserted across families.
    #[must_use]
    pub fn inserted(&self) -> usize {
        self.merges.iter().map(|m| m.inserted).sum()
    }

    /// Distinct data dates received.
    #[must_use]
    pub fn actual_dates(&self) -> Vec<Date> {
        let mut dates: Vec<Date> = self
            .requested
            .iter()
            .filter(|d| !self.empty.contains(d))
            .filter(|d| !self.failures.iter().any(|f| f.stage == FailureStage::Source && f.date == **d))
            .map(|d| {
                self.reconciled
                    .iter()
                    .find(|r| r.requested == *d)
                    .map_or(*d, |r| r.actual)
            })
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "requested={} fetched={} empty={} stale={} failures={} degraded={} inserted={}{}",
            self.requested.len(),
            self.fetched,
            self.empty.len(),
            self.reconciled.len(),
            self.failures.len(),
            self.degraded.len(),
            self.inserted(),
            if self.dry_run { " (dry run)" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> Date {
        Date::from_ymd(2025, 1, d).unwrap()
    }

    #[test]
    fn test_actual_dates() {
        let report = RunReport {
            requested: vec![date(6), date(7), date(8), date(9)],
            fetched: 3,
            empty: vec![date(9)],
            reconciled: vec![
                Reconciliation {
                    requested: date(7),
                    actual: date(6),
                },
                Reconciliation {
                    requested: date(8),
                    actual: date(6),
                },
            ],
            ..RunReport::default()
        };
        assert_eq!(report.actual_dates(), vec![date(6)]);
    }

    #[test]
    fn test_summary() {
        let mut merge = MergeReport::empty(CurveFamily::Nominal);
        merge.inserted = 11;
        let report = RunReport {
            requested: vec![date(6)],
            fetched: 1,
            merges: vec![merge],
            ..RunReport::default()
        };
        assert_eq!(
            report.summary(),
            "requested=1 fetched=1 empty=0 stale=0 failures=0 degraded=0 inserted=11"
        );
    }

    #[test]
    fn test_serializes_family_keys() {
        let mut report = RunReport::default();
        report.pending_rows.insert(CurveFamily::Real, 3);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"pending_rows\":{\"real\":3}"));
    }
}
