//! Run command implementation.
//!
//! Drives the pipeline over a window of business days.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use ettj_core::calendars::BusinessDayWindow;
use ettj_core::Date;
use ettj_pipeline::{JsonReplaySource, Pipeline, RunReport};

use crate::cli::OutputFormat;
use crate::commands::{parse_optional_date, Context};
use crate::error::CliError;
use crate::output::{
    print_header, print_json, print_output, print_success, print_table, print_warning, KeyValue,
};

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// First date (YYYY-MM-DD). Defaults to Monday of the previous week.
    #[arg(short, long)]
    pub start: Option<String>,

    /// Last date (YYYY-MM-DD). Defaults to the start date, or Friday of the
    /// previous week when no start is given.
    #[arg(short, long)]
    pub end: Option<String>,

    /// Replay file to read, overriding `[pipeline] source`
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Fit and prepare rows without writing to the store
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Tabled, Serialize)]
struct IssueRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn window(start: Option<Date>, end: Option<Date>) -> Result<BusinessDayWindow> {
    match (start, end) {
        (None, None) => Ok(BusinessDayWindow::previous_week(Date::today())),
        (Some(start), None) => Ok(BusinessDayWindow::single(start)),
        (Some(start), Some(end)) => Ok(BusinessDayWindow::new(start, end)?),
        (None, Some(_)) => Err(CliError::MissingArgument("--start".to_string()).into()),
    }
}

/// Execute the run command.
pub fn execute(args: RunArgs, context: &Context) -> Result<()> {
    let config = context.load_config()?;
    let window = window(
        parse_optional_date(args.start.as_deref())?,
        parse_optional_date(args.end.as_deref())?,
    )?;

    let source_path = args
        .source
        .or_else(|| config.pipeline.source.clone())
        .ok_or_else(|| CliError::MissingArgument("--source or [pipeline] source".to_string()))?;
    let source = JsonReplaySource::new(&source_path)
        .with_context(|| format!("failed to read {}", source_path.display()))?;
    let store = context.open_store(&config)?;
    info!(
        source = %source_path.display(),
        start = %window.start(),
        end = %window.end(),
        dry_run = args.dry_run,
        "Run requested"
    );

    let report = Pipeline::from_config(&config, Arc::new(source), store)?
        .with_dry_run(args.dry_run)
        .run(window)?;
    info!(
        inserted = report.inserted(),
        failures = report.failures.len(),
        "Run finished"
    );

    match context.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Csv => print_output(&issue_rows(&report), OutputFormat::Csv),
        OutputFormat::Table => print_report(&report, window),
    }
}

fn issue_rows(report: &RunReport) -> Vec<IssueRow> {
    let stale = report.reconciled.iter().map(|r| IssueRow {
        date: r.requested.to_string(),
        family: "-".to_string(),
        stage: "stale".to_string(),
        detail: format!("served {}", r.actual),
    });
    let failures = report.failures.iter().map(|f| IssueRow {
        date: f.date.to_string(),
        family: f.family.map_or_else(|| "-".to_string(), |family| family.to_string()),
        stage: f.stage.to_string(),
        detail: f.reason.clone(),
    });
    let degraded = report.degraded.iter().map(|d| IssueRow {
        date: d.date.to_string(),
        family: d.family.to_string(),
        stage: "degraded".to_string(),
        detail: format!(
            "rmse={:.6} {}",
            d.rmse,
            if d.stored { "stored" } else { "excluded" }
        ),
    });
    stale.chain(failures).chain(degraded).collect()
}

fn print_report(report: &RunReport, window: BusinessDayWindow) -> Result<()> {
    print_header(&format!("Run {} to {}", window.start(), window.end()));

    let mut summary = vec![
        KeyValue::new("Business Days", report.requested.len().to_string()),
        KeyValue::new("Fetched", report.fetched.to_string()),
        KeyValue::new("Empty", report.empty.len().to_string()),
        KeyValue::new("Stale", report.reconciled.len().to_string()),
        KeyValue::new("Curves Fitted", report.curves.len().to_string()),
        KeyValue::new("Failures", report.failures.len().to_string()),
        KeyValue::new("Degraded", report.degraded.len().to_string()),
    ];
    for (family, rows) in &report.pending_rows {
        summary.push(KeyValue::new(format!("Rows ({family})"), rows.to_string()));
    }
    for merge in &report.merges {
        summary.push(KeyValue::new(
            format!("Inserted ({})", merge.family),
            format!("{} of {} total", merge.inserted, merge.total_rows),
        ));
    }
    print_table(&summary)?;

    let issues = issue_rows(report);
    if !issues.is_empty() {
        print_header("Issues");
        print_table(&issues)?;
    }

    if report.dry_run {
        print_warning("Dry run: nothing was written");
    } else if report.failures.is_empty() {
        print_success(&format!("Inserted {} rows", report.inserted()));
    } else {
        print_warning(&format!(
            "Inserted {} rows with {} failures",
            report.inserted(),
            report.failures.len()
        ));
    }
    Ok(())
}
