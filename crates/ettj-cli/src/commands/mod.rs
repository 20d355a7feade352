//! CLI command implementations.

pub mod config;
pub mod fit;
pub mod run;
pub mod store;

pub use config::ConfigArgs;
pub use fit::FitArgs;
pub use run::RunArgs;
pub use store::StoreArgs;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use ettj_config::EttjConfig;
use ettj_core::Date;
use ettj_storage::{open_store, CurveStore};

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
    /// Output format.
    pub format: OutputFormat,
}

impl Context {
    /// Creates a context.
    pub fn new(config_path: Option<PathBuf>, format: OutputFormat) -> Self {
        Self {
            config_path,
            format,
        }
    }

    /// Loads the configuration file or the defaults.
    pub fn load_config(&self) -> Result<EttjConfig> {
        EttjConfig::load(self.config_path.as_deref()).context("failed to load configuration")
    }

    /// Opens the configured store.
    pub fn open_store(&self, config: &EttjConfig) -> Result<Arc<dyn CurveStore>> {
        let settings = config.store_settings();
        open_store(&settings).with_context(|| {
            format!(
                "failed to open {} store at {}",
                settings.backend,
                settings.path.display()
            )
        })
    }
}

/// Parses a date string in YYYY-MM-DD format.
pub fn parse_date(s: &str) -> CliResult<Date> {
    Date::parse(s).map_err(|_| CliError::InvalidDate(s.to_string()))
}

/// Parses an optional date argument.
pub fn parse_optional_date(s: Option<&str>) -> CliResult<Option<Date>> {
    s.map(parse_date).transpose()
}
