//! Pipeline orchestrator.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use ettj_config::EttjConfig;
use ettj_core::calendars::{BusinessDayWindow, Calendar, WeekendCalendar};
use ettj_core::{CurveFamily, Date};
use ettj_curves::fitted::{breakeven, FittedCurve, OutputGrid};
use ettj_curves::{FitStatus, NssFitter, ObservationSet};
use ettj_storage::{rates_match, CurvePoint, CurveStore, StorageResult, TenorUnit};

use crate::error::{PipelineError, PipelineResult};
use crate::report::{DateFailure, DegradedFit, FailureStage, Reconciliation, RunReport};
use crate::source::{CurveDataSource, PayloadContent, Vertex};

/// Run behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Drop degraded fits instead of storing them.
    pub exclude_degraded: bool,
    /// Store `nominal - real` when both fits exist for a date.
    pub derive_breakeven: bool,
    /// Prepare rows without merging them.
    pub dry_run: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            exclude_degraded: false,
            derive_breakeven: true,
            dry_run: false,
        }
    }
}

/// Fetches a window of dates, fits or converts the data and merges the
/// result into the store, one merge per family.
pub struct Pipeline {
    source: Arc<dyn CurveDataSource>,
    store: Arc<dyn CurveStore>,
    fitter: NssFitter,
    grid: OutputGrid,
    calendar: Arc<dyn Calendar>,
    options: PipelineOptions,
}

type Batches = BTreeMap<CurveFamily, Vec<CurvePoint>>;

impl Pipeline {
    /// Creates a pipeline with default fitter, grid and a weekend calendar.
    pub fn new(source: Arc<dyn CurveDataSource>, store: Arc<dyn CurveStore>) -> Self {
        Self {
            source,
            store,
            fitter: NssFitter::default(),
            grid: OutputGrid::default(),
            calendar: Arc::new(WeekendCalendar),
            options: PipelineOptions::default(),
        }
    }

    /// Creates a pipeline from configuration.
    pub fn from_config(
        config: &EttjConfig,
        source: Arc<dyn CurveDataSource>,
        store: Arc<dyn CurveStore>,
    ) -> PipelineResult<Self> {
        Ok(Self::new(source, store)
            .with_fitter(NssFitter::new(config.to_fitter_config()?))
            .with_grid(config.output_grid()?)
            .with_calendar(Arc::new(config.calendar()))
            .with_options(PipelineOptions {
                exclude_degraded: config.pipeline.exclude_degraded,
                derive_breakeven: config.pipeline.derive_breakeven,
                dry_run: false,
            }))
    }

    /// Sets the fitter.
    #[must_use]
    pub fn with_fitter(mut self, fitter: NssFitter) -> Self {
        self.fitter = fitter;
        self
    }

    /// Sets the output grid.
    #[must_use]
    pub fn with_grid(mut self, grid: OutputGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Sets the business-day calendar.
    #[must_use]
    pub fn with_calendar(mut self, calendar: Arc<dyn Calendar>) -> Self {
        self.calendar = calendar;
        self
    }

    /// Sets the run options.
    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Enables or disables dry runs.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.options.dry_run = dry_run;
        self
    }

    /// Run options.
    #[must_use]
    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Runs over the business days of `window`.
    ///
    /// Source, fit and row errors are recorded per date and the run goes on.
    /// Store errors abort the run, as does a data date served twice with
    /// different content. Identical repeats are processed once.
    pub fn run(&self, window: BusinessDayWindow) -> PipelineResult<RunReport> {
        let dates = window.business_days(self.calendar.as_ref());
        info!(
            source = self.source.name(),
            store = self.store.backend_name(),
            start = %window.start(),
            end = %window.end(),
            business_days = dates.len(),
            "Starting pipeline run"
        );

        let mut report = RunReport {
            requested: dates.clone(),
            dry_run: self.options.dry_run,
            ..RunReport::default()
        };
        let mut batches = Batches::new();
        let mut seen: BTreeMap<Date, (Date, PayloadContent)> = BTreeMap::new();

        for requested in dates {
            let payload = match self.source.fetch(requested) {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    info!(%requested, "No data for date");
                    report.empty.push(requested);
                    continue;
                }
                Err(e) => {
                    warn!(%requested, error = %e, "Source failed for date");
                    report.failures.push(DateFailure {
                        date: requested,
                        family: None,
                        stage: FailureStage::Source,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            report.fetched += 1;
            let actual = payload.actual_date;
            if actual != requested {
                info!(%requested, %actual, "Source returned data for an earlier date");
                report.reconciled.push(Reconciliation { requested, actual });
            }
            if let Some((first_requested, first)) = seen.get(&actual) {
                if let Some(reason) = payload_difference(first, &payload.content) {
                    warn!(%actual, %requested, %reason, "Source served conflicting data");
                    return Err(PipelineError::ReconciliationConflict {
                        actual,
                        first_requested: *first_requested,
                        requested,
                        reason,
                    });
                }
                debug!(%actual, "Data date already processed in this run");
                continue;
            }
            seen.insert(actual, (requested, payload.content.clone()));

            match payload.content {
                PayloadContent::Vertices(vertices) => {
                    self.collect_vertices(actual, &vertices, &mut batches, &mut report);
                }
                PayloadContent::Instruments(sets) => {
                    self.collect_fits(actual, &sets, &mut batches, &mut report);
                }
            }
        }

        for (family, rows) in &batches {
            report.pending_rows.insert(*family, rows.len());
        }

        if self.options.dry_run {
            info!(summary = %report.summary(), "Dry run complete");
            return Ok(report);
        }

        for (family, rows) in batches {
            if rows.is_empty() {
                continue;
            }
            let merge = self.store.merge(family, &rows)?;
            info!(report = %merge, "Merged family");
            report.merges.push(merge);
        }

        info!(summary = %report.summary(), "Pipeline run complete");
        Ok(report)
    }

    fn collect_vertices(
        &self,
        actual: Date,
        vertices: &[Vertex],
        batches: &mut Batches,
        report: &mut RunReport,
    ) {
        let unit = self.store.tenor_unit();
        for vertex in vertices {
            let tenor = unit.convert_business_days(vertex.du);
            let rates = [
                (CurveFamily::Nominal, vertex.nominal),
                (CurveFamily::Real, vertex.real),
                (CurveFamily::Breakeven, vertex.breakeven),
            ];
            for (family, rate) in rates {
                let Some(rate) = rate else { continue };
                match CurvePoint::new(actual, tenor, rate) {
                    Ok(point) => batches.entry(family).or_default().push(point),
                    Err(e) => {
                        warn!(%actual, %family, du = vertex.du, error = %e, "Skipping vertex");
                        report.failures.push(DateFailure {
                            date: actual,
                            family: Some(family),
                            stage: FailureStage::Rows,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        debug!(%actual, vertices = vertices.len(), "Collected vertices");
    }

    fn collect_fits(
        &self,
        actual: Date,
        sets: &[ObservationSet],
        batches: &mut Batches,
        report: &mut RunReport,
    ) {
        let mut curves: BTreeMap<CurveFamily, FittedCurve> = BTreeMap::new();

        for set in sets {
            let family = set.family();
            let fitted = self
                .fitter
                .fit(set)
                .and_then(|fit| FittedCurve::from_fit(&fit, &self.grid));
            let curve = match fitted {
                Ok(curve) => curve,
                Err(e) => {
                    warn!(%actual, %family, error = %e, "Fit failed");
                    report.failures.push(DateFailure {
                        date: actual,
                        family: Some(family),
                        stage: FailureStage::Fit,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if curve.status == FitStatus::OptimizationDegraded {
                let stored = !self.options.exclude_degraded;
                warn!(%actual, %family, rmse = curve.rmse, stored, "Degraded fit");
                report.degraded.push(DegradedFit {
                    date: actual,
                    family,
                    rmse: curve.rmse,
                    stored,
                });
                if !stored {
                    continue;
                }
            }
            curves.insert(family, curve);
        }

        if self.options.derive_breakeven && !curves.contains_key(&CurveFamily::Breakeven) {
            if let (Some(nominal), Some(real)) = (
                curves.get(&CurveFamily::Nominal),
                curves.get(&CurveFamily::Real),
            ) {
                match breakeven(nominal, real) {
                    Ok(points) => {
                        let rows = self.rows_from_points(actual, &points);
                        self.push_rows(actual, CurveFamily::Breakeven, rows, batches, report);
                    }
                    Err(e) => report.failures.push(DateFailure {
                        date: actual,
                        family: Some(CurveFamily::Breakeven),
                        stage: FailureStage::Rows,
                        reason: e.to_string(),
                    }),
                }
            }
        }

        for (family, curve) in curves {
            let points: Vec<(f64, f64)> = curve.nodes.iter().map(|n| (n.tenor, n.rate)).collect();
            let rows = self.rows_from_points(actual, &points);
            self.push_rows(actual, family, rows, batches, report);
            report.curves.push(curve);
        }
    }

    /// Converts `(tenor in years, rate)` points to rows keyed by the actual date.
    fn rows_from_points(&self, actual: Date, points: &[(f64, f64)]) -> StorageResult<Vec<CurvePoint>> {
        let unit: TenorUnit = self.store.tenor_unit();
        points
            .iter()
            .map(|&(years, rate)| CurvePoint::new(actual, unit.convert_years(years), rate))
            .collect()
    }

    fn push_rows(
        &self,
        actual: Date,
        family: CurveFamily,
        rows: StorageResult<Vec<CurvePoint>>,
        batches: &mut Batches,
        report: &mut RunReport,
    ) {
        match rows {
            Ok(rows) => batches.entry(family).or_default().extend(rows),
            Err(e) => {
                warn!(%actual, %family, error = %e, "Could not build rows");
                report.failures.push(DateFailure {
                    date: actual,
                    family: Some(family),
                    stage: FailureStage::Rows,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Describes the first difference between two payloads for one data date.
fn payload_difference(first: &PayloadContent, second: &PayloadContent) -> Option<String> {
    match (first, second) {
        (PayloadContent::Vertices(a), PayloadContent::Vertices(b)) => vertex_difference(a, b),
        (PayloadContent::Instruments(a), PayloadContent::Instruments(b)) => {
            if a.len() != b.len() {
                return Some(format!("{} observation sets vs {}", a.len(), b.len()));
            }
            a.iter()
                .zip(b)
                .find(|(x, y)| x != y)
                .map(|(x, _)| format!("{} observations differ", x.family()))
        }
        _ => Some("vertices in one payload, instruments in the other".to_string()),
    }
}

fn vertex_difference(first: &[Vertex], second: &[Vertex]) -> Option<String> {
    if first.len() != second.len() {
        return Some(format!("{} vertices vs {}", first.len(), second.len()));
    }
    let mut a = first.to_vec();
    let mut b = second.to_vec();
    a.sort_by_key(|v| v.du);
    b.sort_by_key(|v| v.du);

    for (x, y) in a.iter().zip(&b) {
        if x.du != y.du {
            return Some(format!("vertex du {} vs {}", x.du, y.du));
        }
        let pairs = [
            (CurveFamily::Nominal, x.nominal, y.nominal),
            (CurveFamily::Real, x.real, y.real),
            (CurveFamily::Breakeven, x.breakeven, y.breakeven),
        ];
        for (family, r1, r2) in pairs {
            match (r1, r2) {
                (Some(r1), Some(r2)) if !rates_match(r1, r2) => {
                    return Some(format!("{family} rate at du {}: {r1} vs {r2}", x.du));
                }
                (Some(_), None) | (None, Some(_)) => {
                    return Some(format!("{family} rate at du {} present once", x.du));
                }
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SourceError, SourceResult};
    use crate::source::SourcePayload;
    use ettj_storage::{InMemoryCurveStore, StorageError};

    struct StaleSource {
        actual: Date,
    }

    impl CurveDataSource for StaleSource {
        fn name(&self) -> &str {
            "stale"
        }

        fn fetch(&self, _requested: Date) -> SourceResult<Option<SourcePayload>> {
            Ok(Some(SourcePayload {
                actual_date: self.actual,
                content: PayloadContent::Vertices(vec![
                    Vertex {
                        du: 21,
                        nominal: Some(10.1),
                        real: Some(6.2),
                        breakeven: Some(3.9),
                    },
                    Vertex {
                        du: 252,
                        nominal: Some(10.5),
                        real: None,
                        breakeven: None,
                    },
                ]),
            }))
        }
    }

    struct FlakySource;

    impl CurveDataSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        fn fetch(&self, requested: Date) -> SourceResult<Option<SourcePayload>> {
            match requested.day() {
                7 => Err(SourceError::Unavailable("timeout".into())),
                8 => Ok(None),
                _ => Ok(Some(SourcePayload {
                    actual_date: requested,
                    content: PayloadContent::Vertices(vec![Vertex {
                        du: 126,
                        nominal: Some(10.3),
                        real: None,
                        breakeven: None,
                    }]),
                })),
            }
        }
    }

    fn week() -> BusinessDayWindow {
        BusinessDayWindow::new(
            Date::from_ymd(2025, 1, 6).unwrap(),
            Date::from_ymd(2025, 1, 10).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_stale_week_reconciles_to_monday() {
        let monday = Date::from_ymd(2025, 1, 6).unwrap();
        let store = Arc::new(InMemoryCurveStore::new(TenorUnit::BusinessDays));
        let pipeline = Pipeline::new(Arc::new(StaleSource { actual: monday }), store.clone());

        let report = pipeline.run(week()).unwrap();

        assert_eq!(report.requested.len(), 5);
        assert_eq!(report.fetched, 5);
        assert_eq!(report.reconciled.len(), 4);
        assert!(report.reconciled.iter().all(|r| r.actual == monday));
        assert_eq!(report.actual_dates(), vec![monday]);

        let nominal = store.load(CurveFamily::Nominal).unwrap();
        assert_eq!(nominal.len(), 2);
        assert!(nominal.iter().all(|p| p.as_of_date == monday));
        assert_eq!(store.load(CurveFamily::Real).unwrap().len(), 1);
        assert_eq!(store.load(CurveFamily::Breakeven).unwrap().len(), 1);
    }

    #[test]
    fn test_source_failures_are_isolated() {
        let store = Arc::new(InMemoryCurveStore::new(TenorUnit::Years));
        let pipeline = Pipeline::new(Arc::new(FlakySource), store.clone());

        let report = pipeline.run(week()).unwrap();

        assert_eq!(report.fetched, 3);
        assert_eq!(report.empty, vec![Date::from_ymd(2025, 1, 8).unwrap()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, FailureStage::Source);

        let rows = store.load(CurveFamily::Nominal).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].tenor.value(), 0.5);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let store = Arc::new(InMemoryCurveStore::new(TenorUnit::BusinessDays));
        let pipeline = Pipeline::new(Arc::new(FlakySource), store.clone()).with_dry_run(true);

        let report = pipeline.run(week()).unwrap();

        assert!(report.dry_run);
        assert!(report.merges.is_empty());
        assert_eq!(report.pending_rows.get(&CurveFamily::Nominal), Some(&3));
        assert!(store.load(CurveFamily::Nominal).unwrap().is_empty());
    }

    #[test]
    fn test_vertex_rows_use_store_unit() {
        let monday = Date::from_ymd(2025, 1, 6).unwrap();
        let store = Arc::new(InMemoryCurveStore::new(TenorUnit::Years));
        Pipeline::new(Arc::new(StaleSource { actual: monday }), store.clone())
            .run(BusinessDayWindow::single(monday))
            .unwrap();

        let tenors: Vec<f64> = store
            .load(CurveFamily::Nominal)
            .unwrap()
            .iter()
            .map(|p| p.tenor.value())
            .collect();
        assert_eq!(tenors, vec![21.0 / 252.0, 1.0]);
    }

    #[test]
    fn test_store_error_is_fatal() {
        struct Conflicting;

        impl CurveDataSource for Conflicting {
            fn name(&self) -> &str {
                "conflicting"
            }

            fn fetch(&self, requested: Date) -> SourceResult<Option<SourcePayload>> {
                Ok(Some(SourcePayload {
                    actual_date: requested,
                    content: PayloadContent::Vertices(vec![
                        Vertex {
                            du: 21,
                            nominal: Some(10.0),
                            real: None,
                            breakeven: None,
                        },
                        Vertex {
                            du: 21,
                            nominal: Some(10.4),
                            real: None,
                            breakeven: None,
                        },
                    ]),
                }))
            }
        }

        let store = Arc::new(InMemoryCurveStore::new(TenorUnit::BusinessDays));
        let err = Pipeline::new(Arc::new(Conflicting), store)
            .run(week())
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::PipelineError::Storage(StorageError::DuplicateKeyConflict { .. })
        ));
    }

    /// Always answers with Monday's data, but the rate drifts with the
    /// requested day.
    struct DriftingSource {
        monday: Date,
        drift: bool,
    }

    impl CurveDataSource for DriftingSource {
        fn name(&self) -> &str {
            "drifting"
        }

        fn fetch(&self, requested: Date) -> SourceResult<Option<SourcePayload>> {
            let bump = if self.drift { f64::from(requested.day()) / 100.0 } else { 0.0 };
            Ok(Some(SourcePayload {
                actual_date: self.monday,
                content: PayloadContent::Vertices(vec![Vertex {
                    du: 21,
                    nominal: Some(10.0 + bump),
                    real: None,
                    breakeven: None,
                }]),
            }))
        }
    }

    #[test]
    fn test_conflicting_stale_payloads_abort_the_run() {
        let monday = Date::from_ymd(2025, 1, 6).unwrap();
        let store = Arc::new(InMemoryCurveStore::new(TenorUnit::BusinessDays));
        let source = DriftingSource { monday, drift: true };

        let err = Pipeline::new(Arc::new(source), store.clone())
            .run(week())
            .unwrap_err();

        match err {
            PipelineError::ReconciliationConflict {
                actual,
                first_requested,
                requested,
                reason,
            } => {
                assert_eq!(actual, monday);
                assert_eq!(first_requested, monday);
                assert_eq!(requested, Date::from_ymd(2025, 1, 7).unwrap());
                assert!(reason.contains("du 21"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.load(CurveFamily::Nominal).unwrap().is_empty());
    }

    #[test]
    fn test_identical_stale_payloads_are_processed_once() {
        let monday = Date::from_ymd(2025, 1, 6).unwrap();
        let store = Arc::new(InMemoryCurveStore::new(TenorUnit::BusinessDays));
        let source = DriftingSource { monday, drift: false };

        let report = Pipeline::new(Arc::new(source), store.clone()).run(week()).unwrap();

        assert_eq!(report.reconciled.len(), 4);
        assert_eq!(report.pending_rows.get(&CurveFamily::Nominal), Some(&1));
        assert_eq!(store.load(CurveFamily::Nominal).unwrap().len(), 1);
    }

    #[test]
    fn test_payload_difference() {
        let vertex = |du, nominal| Vertex {
            du,
            nominal: Some(nominal),
            real: None,
            breakeven: None,
        };
        let a = PayloadContent::Vertices(vec![vertex(21, 10.0), vertex(252, 10.5)]);
        let reordered = PayloadContent::Vertices(vec![vertex(252, 10.5), vertex(21, 10.0)]);
        assert_eq!(payload_difference(&a, &reordered), None);

        let moved = PayloadContent::Vertices(vec![vertex(21, 10.0), vertex(252, 10.6)]);
        assert!(payload_difference(&a, &moved).is_some());

        let shorter = PayloadContent::Vertices(vec![vertex(21, 10.0)]);
        assert!(payload_difference(&a, &shorter).is_some());

        assert!(payload_difference(&a, &PayloadContent::Instruments(vec![])).is_some());
    }
}
