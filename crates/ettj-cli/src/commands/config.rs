//! Config command implementation.
//!
//! Writes and displays `ettj.toml`.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use ettj_config::{EttjConfig, DEFAULT_CONFIG_FILE};

use crate::cli::OutputFormat;
use crate::commands::Context;
use crate::output::{print_header, print_json, print_output, print_success, KeyValue};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a configuration file with every default spelled out
    Init(InitArgs),

    /// Show the effective configuration
    Show,
}

/// Arguments for init subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Target file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, context: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Init(init) => execute_init(init),
        ConfigCommand::Show => execute_show(context),
    }
}

fn execute_init(args: InitArgs) -> Result<()> {
    EttjConfig::default().write_to(&args.path, args.force)?;
    print_success(&format!("Wrote {}", args.path.display()));
    Ok(())
}

fn execute_show(context: &Context) -> Result<()> {
    let config = context.load_config()?;

    match context.format {
        OutputFormat::Json => print_json(&config),
        OutputFormat::Table => {
            let source = context
                .config_path
                .as_ref()
                .map_or_else(|| "defaults / ./ettj.toml".to_string(), |p| p.display().to_string());
            print_header(&format!("Configuration ({source})"));
            println!("{}", config.to_toml_string()?);
            Ok(())
        }
        OutputFormat::Csv => {
            let settings = config.store_settings();
            let pairs = vec![
                KeyValue::new("store.backend", settings.backend.to_string()),
                KeyValue::new("store.path", settings.path.display().to_string()),
                KeyValue::new("store.tenor_unit", settings.tenor_unit.to_string()),
                KeyValue::new("fit.seed", config.fit.global.seed.to_string()),
                KeyValue::new("curve.forward_horizon", config.curve.forward_horizon.to_string()),
                KeyValue::new(
                    "pipeline.exclude_degraded",
                    config.pipeline.exclude_degraded.to_string(),
                ),
                KeyValue::new(
                    "pipeline.derive_breakeven",
                    config.pipeline.derive_breakeven.to_string(),
                ),
            ];
            print_output(&pairs, OutputFormat::Csv)
        }
    }
}
