//! Store command implementation.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use ettj_core::{CurveFamily, Date};
use ettj_storage::{export_csv, CurvePoint, FamilyStats};

use crate::cli::{FamilyChoice, OutputFormat};
use crate::commands::{parse_optional_date, Context};
use crate::output::{print_header, print_info, print_json, print_output, print_success};

/// Arguments for the store command.
#[derive(Args, Debug)]
pub struct StoreArgs {
    #[command(subcommand)]
    pub command: StoreCommand,
}

/// Store subcommands.
#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    /// Show stored rows of one family
    Show(ShowArgs),

    /// Row and date counts per family
    Stats,

    /// Write every family as CSV files
    Export(ExportArgs),
}

/// Arguments for showing rows.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Curve family
    #[arg(long, value_enum)]
    pub family: FamilyChoice,

    /// First date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Last date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

/// Arguments for exporting.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Target directory
    #[arg(short, long)]
    pub dir: PathBuf,
}

#[derive(Tabled, Serialize)]
struct RowDisplay {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Tenor")]
    tenor: f64,
    #[tabled(rename = "Rate")]
    rate: f64,
}

impl From<&CurvePoint> for RowDisplay {
    fn from(point: &CurvePoint) -> Self {
        Self {
            date: point.as_of_date.to_string(),
            tenor: point.tenor.value(),
            rate: point.rate,
        }
    }
}

#[derive(Tabled, Serialize)]
struct StatsRow {
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "Dates")]
    dates: usize,
    #[tabled(rename = "First")]
    first_date: String,
    #[tabled(rename = "Last")]
    last_date: String,
}

impl From<&FamilyStats> for StatsRow {
    fn from(stats: &FamilyStats) -> Self {
        let date_or_dash =
            |d: Option<Date>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        Self {
            family: stats.family.to_string(),
            rows: stats.rows,
            dates: stats.dates,
            first_date: date_or_dash(stats.first_date),
            last_date: date_or_dash(stats.last_date),
        }
    }
}

/// Execute the store command.
pub fn execute(args: StoreArgs, context: &Context) -> Result<()> {
    match args.command {
        StoreCommand::Show(show) => execute_show(show, context),
        StoreCommand::Stats => execute_stats(context),
        StoreCommand::Export(export) => execute_export(export, context),
    }
}

fn execute_show(args: ShowArgs, context: &Context) -> Result<()> {
    let config = context.load_config()?;
    let store = context.open_store(&config)?;
    let family = CurveFamily::from(args.family);

    let from = parse_optional_date(args.from.as_deref())?;
    let to = parse_optional_date(args.to.as_deref())?;
    let rows: Vec<CurvePoint> = match (from, to) {
        (Some(from), Some(to)) => store.load_range(family, from, to)?,
        _ => store
            .load(family)?
            .into_iter()
            .filter(|row| from.map_or(true, |d| row.as_of_date >= d))
            .filter(|row| to.map_or(true, |d| row.as_of_date <= d))
            .collect(),
    };

    let display: Vec<RowDisplay> = rows.iter().map(RowDisplay::from).collect();
    if context.format == OutputFormat::Table {
        print_header(&format!(
            "{family} ({}, {})",
            store.backend_name(),
            store.tenor_unit()
        ));
    }
    print_output(&display, context.format)
}

fn execute_stats(context: &Context) -> Result<()> {
    let config = context.load_config()?;
    let stats = context.open_store(&config)?.stats()?;

    match context.format {
        OutputFormat::Json => print_json(&stats),
        format => {
            if format == OutputFormat::Table {
                print_header(&format!(
                    "{} store, tenors in {}: {} rows",
                    stats.backend,
                    stats.tenor_unit,
                    stats.total_rows()
                ));
            }
            let rows: Vec<StatsRow> = stats.families.iter().map(StatsRow::from).collect();
            print_output(&rows, format)
        }
    }
}

fn execute_export(args: ExportArgs, context: &Context) -> Result<()> {
    let config = context.load_config()?;
    let store = context.open_store(&config)?;

    let written = export_csv(store.as_ref(), &args.dir)?;
    if context.format == OutputFormat::Json {
        let files: Vec<_> = written
            .iter()
            .map(|(path, report)| serde_json::json!({ "path": path, "report": report }))
            .collect();
        return print_json(&files);
    }

    for (path, report) in &written {
        print_info(&format!("{} ({})", path.display(), report));
    }
    print_success(&format!("Exported {} families to {}", written.len(), args.dir.display()));
    Ok(())
}
