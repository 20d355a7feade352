//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use ettj_core::CurveFamily;

use crate::commands::{ConfigArgs, FitArgs, RunArgs, StoreArgs};

/// ETTJ - yield curve estimation and incremental curve store
#[derive(Parser)]
#[command(name = "ettj")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Configuration file (defaults to ./ettj.toml when present)
    #[arg(short, long, env = "ETTJ_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fit an NSS curve to a CSV of quotes
    Fit(FitArgs),

    /// Fetch, fit and store curves over a window of business days
    Run(RunArgs),

    /// Inspect or export the curve store
    Store(StoreArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

/// Curve family choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FamilyChoice {
    /// Nominal (prefixado) curve
    Nominal,
    /// Real (IPCA) curve
    Real,
    /// Implied breakeven inflation
    Breakeven,
}

impl From<FamilyChoice> for CurveFamily {
    fn from(choice: FamilyChoice) -> Self {
        match choice {
            FamilyChoice::Nominal => CurveFamily::Nominal,
            FamilyChoice::Real => CurveFamily::Real,
            FamilyChoice::Breakeven => CurveFamily::Breakeven,
        }
    }
}
