//! Integration tests: configuration files on disk.

use std::fs;
use std::path::PathBuf;

use ettj_config::{ConfigError, EttjConfig, InitialGuessSetting, StrategySetting};
use ettj_core::calendars::Calendar;
use ettj_core::{Compounding, Date};
use ettj_curves::calibration::InitialGuess;
use ettj_math::optimization::DeStrategy;
use ettj_storage::{StoreBackend, TenorUnit};
use tempfile::tempdir;

const FULL: &str = r#"
[fit]
initial_guess = [11.0, -1.0, 0.5, 0.5, 1.5, 6.0]
min_observations = 8

[fit.bounds]
beta0 = [0.0, 25.0]
tau1 = [0.2, 8.0]

[fit.global]
strategy = "rand1bin"
max_generations = 300
seed = 1234
parallel = false

[fit.local]
max_iterations = 500

[curve]
output_tenors = [1.0, 0.5, 10.0]
forward_horizon = 1.0
compounding = "continuous"

[store]
backend = "redb"
path = "var/ettj.redb"
tenor_unit = "years"
lock_timeout_ms = 1000
stale_lock_ms = 90000

[pipeline]
exclude_degraded = true
derive_breakeven = false
source = "fixtures/replay.json"

[calendar]
name = "anbima"
holidays = ["2025-01-01", "2025-03-03"]
"#;

#[test]
fn test_full_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ettj.toml");
    fs::write(&path, FULL).unwrap();

    let config = EttjConfig::from_file(&path).unwrap();

    let fitter = config.to_fitter_config().unwrap();
    assert!(matches!(fitter.initial_guess, InitialGuess::Fixed(p) if p.tau2 == 6.0));
    assert_eq!(fitter.min_observations, 8);
    assert_eq!(fitter.bounds.beta0, (0.0, 25.0));
    assert_eq!(fitter.bounds.beta1, (-30.0, 30.0));
    assert_eq!(fitter.global.strategy, DeStrategy::Rand1Bin);
    assert_eq!(fitter.global.seed, 1234);
    assert!(!fitter.global.parallel);
    assert_eq!(fitter.local.max_iterations, 500);
    assert_eq!(config.fit.global.strategy, StrategySetting::Rand1bin);

    let grid = config.output_grid().unwrap();
    assert_eq!(grid.tenors, vec![0.5, 1.0, 10.0]);
    assert_eq!(grid.compounding, Compounding::Continuous);

    let store = config.store_settings();
    assert_eq!(store.backend, StoreBackend::Redb);
    assert_eq!(store.tenor_unit, TenorUnit::Years);
    assert_eq!(store.path, PathBuf::from("var/ettj.redb"));
    assert_eq!(store.stale_lock_age, std::time::Duration::from_secs(90));

    assert!(config.pipeline.exclude_degraded);
    assert!(!config.pipeline.derive_breakeven);
    assert_eq!(config.pipeline.source, Some(PathBuf::from("fixtures/replay.json")));

    let calendar = config.calendar();
    assert_eq!(calendar.name(), "anbima");
    assert!(!calendar.is_business_day(Date::from_ymd(2025, 3, 3).unwrap()));
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = EttjConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn test_init_writes_loadable_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ettj.toml");

    EttjConfig::default().write_to(&path, false).unwrap();
    assert!(EttjConfig::default().write_to(&path, false).is_err());
    EttjConfig::default().write_to(&path, true).unwrap();

    let loaded = EttjConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(loaded, EttjConfig::default());
    assert_eq!(loaded.fit.initial_guess, InitialGuessSetting::Named("data".into()));
}

#[test]
fn test_bad_holiday_is_a_parse_error() {
    let err = EttjConfig::from_toml_str("[calendar]\nholidays = [\"2025-13-01\"]\n").unwrap_err();
    assert!(matches!(err, ConfigError::Deserialization(_)));
}
