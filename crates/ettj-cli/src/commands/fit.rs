//! Fit command implementation.
//!
//! Fits an NSS curve to a CSV file of `maturity,yield[,weight]` quotes.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, info};

use ettj_core::{CurveFamily, Date};
use ettj_curves::{FitResult, FittedCurve, NssFitter, Observation, ObservationSet};

use crate::cli::{FamilyChoice, OutputFormat};
use crate::commands::{parse_optional_date, Context};
use crate::error::CliError;
use crate::output::{format_rate, print_header, print_json, print_output, print_table, KeyValue};

/// Arguments for the fit command.
#[derive(Args, Debug)]
pub struct FitArgs {
    /// CSV file with `maturity,yield` columns (years, percent)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Date the quotes refer to (YYYY-MM-DD). Defaults to today.
    #[arg(short, long)]
    pub date: Option<String>,

    /// Curve family
    #[arg(long, value_enum, default_value = "nominal")]
    pub family: FamilyChoice,

    /// Global-stage seed, overriding the configuration
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Tabled, Serialize)]
struct NodeRow {
    #[tabled(rename = "Tenor")]
    tenor: f64,
    #[tabled(rename = "Zero (%)")]
    #[serde(rename = "zero")]
    zero_display: String,
    #[tabled(rename = "Forward (%)")]
    #[serde(rename = "forward")]
    forward_display: String,
}

#[derive(Serialize)]
struct FitOutput<'a> {
    fit: &'a FitResult,
    curve: &'a FittedCurve,
}

/// Execute the fit command.
pub fn execute(args: FitArgs, context: &Context) -> Result<()> {
    let config = context.load_config()?;
    let date = parse_optional_date(args.date.as_deref())?.unwrap_or_else(Date::today);
    let family = CurveFamily::from(args.family);

    let set = ObservationSet::new(date, family, read_observations(&args.input)?)?;
    debug!(
        input = %args.input.display(),
        observations = set.len(),
        distinct = set.distinct_maturities(),
        "Read quotes"
    );

    let mut fitter_config = config.to_fitter_config()?;
    if let Some(seed) = args.seed {
        fitter_config.global.seed = seed;
    }
    let fit = NssFitter::new(fitter_config).fit(&set)?;
    let curve = FittedCurve::from_fit(&fit, &config.output_grid()?)?;
    info!(%date, %family, status = %fit.status, rmse = fit.rmse, "Fit finished");

    match context.format {
        OutputFormat::Json => print_json(&FitOutput {
            fit: &fit,
            curve: &curve,
        }),
        OutputFormat::Csv => print_output(&node_rows(&curve, 6), OutputFormat::Csv),
        OutputFormat::Table => print_fit_table(&fit, &curve),
    }
}

fn read_observations(path: &Path) -> Result<Vec<Observation>> {
    let invalid = |reason: String| CliError::InvalidInput {
        path: path.display().to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| invalid(e.to_string()))?;
    let observations = reader
        .deserialize::<Observation>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(e.to_string()))?;

    if observations.is_empty() {
        return Err(invalid("no observations".to_string()).into());
    }
    Ok(observations)
}

fn node_rows(curve: &FittedCurve, precision: usize) -> Vec<NodeRow> {
    curve
        .nodes
        .iter()
        .map(|node| NodeRow {
            tenor: node.tenor,
            zero_display: format!("{:.prec$}", node.rate, prec = precision),
            forward_display: format!("{:.prec$}", node.forward, prec = precision),
        })
        .collect()
}

fn print_fit_table(fit: &FitResult, curve: &FittedCurve) -> Result<()> {
    print_header(&format!("NSS Fit: {} {}", fit.family, fit.as_of_date));

    let p = &fit.parameters;
    let summary = vec![
        KeyValue::from_f64("beta0", p.beta0, 6),
        KeyValue::from_f64("beta1", p.beta1, 6),
        KeyValue::from_f64("beta2", p.beta2, 6),
        KeyValue::from_f64("beta3", p.beta3, 6),
        KeyValue::from_f64("tau1", p.tau1, 6),
        KeyValue::from_f64("tau2", p.tau2, 6),
        KeyValue::new("Status", fit.status.to_string()),
        KeyValue::from_f64("RMSE", fit.rmse, 6),
        KeyValue::new("Max Error", format_rate(fit.max_error())),
        KeyValue::new("Global Generations", fit.global.iterations.to_string()),
        KeyValue::new(
            "Local Iterations",
            fit.local
                .map_or_else(|| "-".to_string(), |local| local.iterations.to_string()),
        ),
    ];
    print_table(&summary)?;

    print_header(&format!(
        "Curve ({}y forwards, {:?} compounding)",
        curve.horizon, curve.compounding
    ));
    print_table(&node_rows(curve, 4))
}
