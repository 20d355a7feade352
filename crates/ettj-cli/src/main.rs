//! ETTJ CLI - fit yield curves and maintain the curve store.
//!
//! # Usage
//!
//! ```bash
//! # Fit an NSS curve to a CSV of (maturity, yield) quotes
//! ettj fit --input quotes.csv --date 2025-01-06 --family nominal
//!
//! # Load last week's curves from a replay file into the store
//! ettj run --source replay.json
//!
//! # Inspect the store
//! ettj store show --family real --from 2025-01-01
//! ettj store stats
//!
//! # Write a default configuration
//! ettj config init
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let context = commands::Context::new(cli.config, cli.format);

    match cli.command {
        Commands::Fit(args) => commands::fit::execute(args, &context)?,
        Commands::Run(args) => commands::run::execute(args, &context)?,
        Commands::Store(args) => commands::store::execute(args, &context)?,
        Commands::Config(args) => commands::config::execute(args, &context)?,
    }

    Ok(())
}

/// Logs go to stderr so that JSON and CSV output stay clean.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "info,ettj=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
