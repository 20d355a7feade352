//! End-to-end tests of the `ettj` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn ettj(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ettj").unwrap();
    cmd.current_dir(dir).env_remove("ETTJ_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("ettj.toml");
    std::fs::write(
        &path,
        format!(
            "[store]\nbackend = \"csv\"\npath = {:?}\ntenor_unit = \"du\"\n",
            dir.join("store").display().to_string()
        ),
    )
    .unwrap();
    path
}

const REPLAY: &str = r#"{"entries": [
    {"data_referencia": "2025-01-06",
     "curvas": [
        {"vertice_du": 21, "taxa_prefixadas": 10.1, "taxa_ipca": 6.2, "taxa_implicita": 3.9},
        {"vertice_du": 252, "taxa_prefixadas": 10.5, "taxa_ipca": 6.4, "taxa_implicita": 4.1}
     ]}
]}"#;

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    ettj(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fit"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("store"));
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    ettj(dir.path()).args(["config", "init"]).assert().success();
    assert!(dir.path().join("ettj.toml").exists());

    ettj(dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    ettj(dir.path())
        .args(["--format", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"seed\": 42"));
}

#[test]
fn test_fit_prints_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("quotes.csv");
    std::fs::write(
        &input,
        "maturity,yield\n0.5,10.0\n1,10.2\n2,10.5\n5,11.0\n10,11.3\n20,11.4\n",
    )
    .unwrap();

    ettj(dir.path())
        .args(["--format", "json", "fit", "--date", "2025-01-06", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"beta0\""))
        .stdout(predicate::str::contains("\"nodes\""));
}

#[test]
fn test_verbose_fit_logs_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("quotes.csv");
    std::fs::write(
        &input,
        "maturity,yield\n0.5,10.0\n1,10.2\n2,10.5\n5,11.0\n10,11.3\n20,11.4\n",
    )
    .unwrap();

    ettj(dir.path())
        .args(["-v", "--format", "csv", "fit", "--date", "2025-01-06", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("Fit finished"))
        .stdout(predicate::str::contains("Fit finished").not());
}

#[test]
fn test_fit_rejects_too_few_quotes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("quotes.csv");
    std::fs::write(&input, "maturity,yield\n1,10.2\n2,10.5\n5,11.0\n").unwrap();

    ettj(dir.path())
        .args(["fit", "--input"])
        .arg(&input)
        .assert()
        .failure();
}

#[test]
fn test_bad_date_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    ettj(dir.path())
        .args(["store", "show", "--family", "nominal", "--from", "06/01/2025"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date format"));
}

#[test]
fn test_run_then_inspect_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let replay = dir.path().join("replay.json");
    std::fs::write(&replay, REPLAY).unwrap();

    let run = |extra: &[&str]| {
        let mut cmd = ettj(dir.path());
        cmd.arg("--config")
            .arg(&config)
            .args(["--format", "json", "run", "--start", "2025-01-06", "--end", "2025-01-10"])
            .arg("--source")
            .arg(&replay)
            .args(extra);
        cmd
    };

    run(&["--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dry_run\": true"));
    assert!(!dir.path().join("store/ettj_nominal.csv").exists());

    run(&[]).assert().success();
    let nominal = std::fs::read_to_string(dir.path().join("store/ettj_nominal.csv")).unwrap();
    assert_eq!(nominal.lines().count(), 3);
    assert!(nominal.starts_with("date,du,rate\n2025-01-06,21,10.1\n"));

    // Second run inserts nothing.
    run(&[])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"inserted\": 2").not());

    ettj(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["--format", "csv", "store", "show", "--family", "real"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-01-06,252"));

    ettj(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["store", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("breakeven"));
}

#[test]
fn test_run_without_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    ettj(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["run", "--start", "2025-01-06"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--source"));
}
