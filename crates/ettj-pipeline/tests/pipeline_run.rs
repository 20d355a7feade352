//! Integration tests: weekly runs from fitting through the store.

use std::sync::Arc;

use approx::assert_relative_eq;
use ettj_core::prelude::*;
use ettj_curves::prelude::*;
use ettj_pipeline::prelude::*;
use ettj_storage::prelude::*;

fn date(d: u32) -> Date {
    Date::from_ymd(2025, 1, d).unwrap()
}

fn synthetic(as_of: Date, family: CurveFamily, params: &NssParameters) -> ObservationSet {
    let pairs: Vec<(f64, f64)> = [0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0]
        .iter()
        .map(|&t| (t, params.evaluate(t)))
        .collect();
    ObservationSet::from_pairs(as_of, family, &pairs).unwrap()
}

fn nominal_truth() -> NssParameters {
    NssParameters::new(12.0, -2.0, 1.5, -1.0, 1.5, 6.0).unwrap()
}

fn real_truth() -> NssParameters {
    NssParameters::new(6.5, -0.5, 1.0, -0.5, 2.0, 7.0).unwrap()
}

/// Answers every request with quotes dated `actual`, except for `failing`.
struct QuoteSource {
    actual: Date,
    failing: Option<Date>,
    short_real: bool,
}

impl CurveDataSource for QuoteSource {
    fn name(&self) -> &str {
        "quotes"
    }

    fn fetch(&self, requested: Date) -> SourceResult<Option<SourcePayload>> {
        if self.failing == Some(requested) {
            return Err(SourceError::Unavailable("HTTP 503".into()));
        }
        let real = if self.short_real {
            ObservationSet::from_pairs(
                self.actual,
                CurveFamily::Real,
                &[(1.0, 6.0), (2.0, 6.1), (5.0, 6.3)],
            )
            .map_err(|e| SourceError::malformed(requested, e.to_string()))?
        } else {
            synthetic(self.actual, CurveFamily::Real, &real_truth())
        };
        Ok(Some(SourcePayload {
            actual_date: self.actual,
            content: PayloadContent::Instruments(vec![
                synthetic(self.actual, CurveFamily::Nominal, &nominal_truth()),
                real,
            ]),
        }))
    }
}

fn week() -> BusinessDayWindow {
    BusinessDayWindow::previous_week(date(15))
}

#[test]
fn test_stale_week_fits_once_and_derives_breakeven() {
    let source = QuoteSource {
        actual: date(6),
        failing: None,
        short_real: false,
    };
    let store = Arc::new(InMemoryCurveStore::new(TenorUnit::BusinessDays));
    let report = Pipeline::new(Arc::new(source), store.clone())
        .run(week())
        .unwrap();

    assert_eq!(report.requested.len(), 5);
    assert_eq!(report.reconciled.len(), 4);
    assert_eq!(report.curves.len(), 2);
    assert!(report.failures.is_empty());

    let grid = OutputGrid::default();
    for family in [CurveFamily::Nominal, CurveFamily::Real, CurveFamily::Breakeven] {
        let rows = store.load(family).unwrap();
        assert_eq!(rows.len(), grid.tenors.len(), "{family}");
        assert!(rows.iter().all(|r| r.as_of_date == date(6)));
    }

    let nominal = store.load(CurveFamily::Nominal).unwrap();
    let real = store.load(CurveFamily::Real).unwrap();
    let breakeven = store.load(CurveFamily::Breakeven).unwrap();
    for ((n, r), b) in nominal.iter().zip(&real).zip(&breakeven) {
        assert_eq!(n.tenor, b.tenor);
        assert_relative_eq!(b.rate, n.rate - r.rate, epsilon = 1e-9);
    }

    let one_year = nominal
        .iter()
        .find(|p| p.tenor.value() == 252.0)
        .unwrap();
    assert_relative_eq!(one_year.rate, nominal_truth().evaluate(1.0), epsilon = 0.05);
}

#[test]
fn test_rerun_is_idempotent() {
    let store = Arc::new(InMemoryCurveStore::new(TenorUnit::Years));
    let pipeline = Pipeline::new(
        Arc::new(QuoteSource {
            actual: date(6),
            failing: None,
            short_real: false,
        }),
        store.clone(),
    );

    let first = pipeline.run(week()).unwrap();
    let second = pipeline.run(week()).unwrap();

    assert!(first.inserted() > 0);
    assert_eq!(second.inserted(), 0);
    assert!(second.merges.iter().all(|m| m.revised_ignored == 0));
}

#[test]
fn test_fit_failure_keeps_other_families() {
    let source = QuoteSource {
        actual: date(6),
        failing: Some(date(8)),
        short_real: true,
    };
    let store = Arc::new(InMemoryCurveStore::new(TenorUnit::BusinessDays));
    let report = Pipeline::new(Arc::new(source), store.clone())
        .run(week())
        .unwrap();

    assert_eq!(report.fit_failures().count(), 1);
    assert!(report
        .failures
        .iter()
        .any(|f| f.stage == FailureStage::Source && f.date == date(8)));

    assert!(!store.load(CurveFamily::Nominal).unwrap().is_empty());
    assert!(store.load(CurveFamily::Real).unwrap().is_empty());
    assert!(store.load(CurveFamily::Breakeven).unwrap().is_empty());
}

#[test]
fn test_degraded_fits_can_be_excluded() {
    let config = NssFitterConfig::new()
        .with_max_generations(5)
        .with_local_max_iterations(1);
    let source = Arc::new(QuoteSource {
        actual: date(6),
        failing: None,
        short_real: false,
    });

    let kept = Arc::new(InMemoryCurveStore::new(TenorUnit::BusinessDays));
    let report = Pipeline::new(source.clone(), kept.clone())
        .with_fitter(NssFitter::new(config.clone()))
        .run(BusinessDayWindow::single(date(6)))
        .unwrap();
    assert!(!report.degraded.is_empty());
    assert!(report.degraded.iter().all(|d| d.stored));

    let dropped = Arc::new(InMemoryCurveStore::new(TenorUnit::BusinessDays));
    let report = Pipeline::new(source, dropped.clone())
        .with_fitter(NssFitter::new(config))
        .with_options(PipelineOptions {
            exclude_degraded: true,
            ..PipelineOptions::default()
        })
        .run(BusinessDayWindow::single(date(6)))
        .unwrap();
    assert!(report.degraded.iter().all(|d| !d.stored));
    for d in &report.degraded {
        assert!(dropped.load(d.family).unwrap().is_empty());
    }
}

#[test]
fn test_replay_file_into_csv_store() {
    let dir = tempfile::tempdir().unwrap();
    let replay = dir.path().join("replay.json");
    std::fs::write(
        &replay,
        r#"{"entries": [
            {"data_referencia": "2025-01-06",
             "curvas": [
                {"vertice_du": 21, "taxa_prefixadas": 10.1, "taxa_ipca": 6.2, "taxa_implicita": 3.9},
                {"vertice_du": 252, "taxa_prefixadas": 10.5, "taxa_ipca": 6.4, "taxa_implicita": 4.1}
             ]},
            {"data_referencia": "2025-01-09",
             "curvas": [{"vertice_du": 21, "taxa_prefixadas": 10.2}]}
        ]}"#,
    )
    .unwrap();

    let store = Arc::new(CsvCurveStore::open(dir.path().join("store"), TenorUnit::BusinessDays).unwrap());
    let source = Arc::new(JsonReplaySource::new(&replay).unwrap());
    let report = Pipeline::new(source, store.clone()).run(week()).unwrap();

    assert_eq!(report.actual_dates(), vec![date(6), date(9)]);
    let nominal = store.load(CurveFamily::Nominal).unwrap();
    assert_eq!(nominal.len(), 3);

    let text = std::fs::read_to_string(store.file_path(CurveFamily::Nominal)).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("date,du,rate"));
    assert!(lines.next().unwrap().starts_with("2025-01-06,21,"));
}
