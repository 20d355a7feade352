//! ETTJ Configuration Layer
//!
//! Loads and validates the `ettj.toml` file that drives fitting, storage and
//! batch runs. Every field has a default, so an empty file is a valid
//! configuration.
//!
//! ```toml
//! [fit]
//! initial_guess = "data"
//!
//! [fit.bounds]
//! beta0 = [-5.0, 30.0]
//! tau1 = [0.1, 10.0]
//!
//! [fit.global]
//! seed = 42
//!
//! [curve]
//! output_tenors = [0.5, 1.0, 2.0, 5.0, 10.0]
//! compounding = "annual"
//!
//! [store]
//! backend = "csv"
//! path = "data"
//! tenor_unit = "du"
//!
//! [calendar]
//! holidays = ["2025-01-01"]
//! ```
//!
//! # Example
//!
//! ```rust
//! use ettj_config::{EttjConfig, Validate};
//!
//! let config = EttjConfig::from_toml_str("[fit.global]\nseed = 7\n").unwrap();
//! assert!(config.is_valid());
//! assert_eq!(config.to_fitter_config().unwrap().global.seed, 7);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod fit;
mod sections;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ettj_core::calendars::HolidayCalendar;
use ettj_curves::calibration::NssFitterConfig;
use ettj_curves::fitted::OutputGrid;
use ettj_storage::StoreSettings;

pub use error::{ConfigError, ConfigResult, Validate, ValidationError};
pub use fit::{
    BoundsSection, FitSection, GlobalSection, InitialGuessSetting, LocalSection, StrategySetting,
    MIN_OBSERVATIONS,
};
pub use sections::{CalendarSection, CurveSection, PipelineSection, StoreSection};

/// Conventional file name.
pub const DEFAULT_CONFIG_FILE: &str = "ettj.toml";

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EttjConfig {
    /// Fitting engine.
    pub fit: FitSection,
    /// Output grid.
    pub curve: CurveSection,
    /// Curve store.
    pub store: StoreSection,
    /// Batch runs.
    pub pipeline: PipelineSection,
    /// Business-day calendar.
    pub calendar: CalendarSection,
}

impl EttjConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Loads `path` if given, else `ettj.toml` in the working directory if
    /// present, else the defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the configuration as TOML, refusing to overwrite unless `force`.
    pub fn write_to(&self, path: impl AsRef<Path>, force: bool) -> ConfigResult<()> {
        let path = path.as_ref();
        if path.exists() && !force {
            return Err(ConfigError::invalid_value(
                "path",
                format!("{} already exists", path.display()),
            ));
        }
        fs::write(path, self.to_toml_string()?)?;
        info!(path = %path.display(), "Wrote configuration");
        Ok(())
    }

    /// Runtime fitter configuration.
    pub fn to_fitter_config(&self) -> ConfigResult<NssFitterConfig> {
        self.fit.to_fitter_config()
    }

    /// Output grid for fitted curves.
    pub fn output_grid(&self) -> ConfigResult<OutputGrid> {
        self.curve.output_grid()
    }

    /// Store settings.
    #[must_use]
    pub fn store_settings(&self) -> StoreSettings {
        self.store.settings()
    }

    /// Business-day calendar.
    #[must_use]
    pub fn calendar(&self) -> HolidayCalendar {
        self.calendar.calendar()
    }
}

impl Validate for EttjConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        errors.extend(self.fit.validate().into_iter().map(|e| e.nested("fit")));
        errors.extend(self.curve.validate().into_iter().map(|e| e.nested("curve")));
        errors.extend(self.store.validate().into_iter().map(|e| e.nested("store")));
        errors.extend(
            self.pipeline
                .validate()
                .into_iter()
                .map(|e| e.nested("pipeline")),
        );
        errors.extend(
            self.calendar
                .validate()
                .into_iter()
                .map(|e| e.nested("calendar")),
        );
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = EttjConfig::from_toml_str("").unwrap();
        assert_eq!(config, EttjConfig::default());
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let text = EttjConfig::default().to_toml_string().unwrap();
        assert!(text.contains("[fit.bounds]"));
        assert!(text.contains("initial_guess = \"data\""));
        assert!(text.contains("tenor_unit = \"du\""));
        assert_eq!(EttjConfig::from_toml_str(&text).unwrap(), EttjConfig::default());
    }

    #[test]
    fn test_unknown_compounding_is_rejected() {
        let err = EttjConfig::from_toml_str("[curve]\ncompounding = \"monthly\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Deserialization(_)));
    }

    #[test]
    fn test_validation_errors_are_collected() {
        let err = EttjConfig::from_toml_str(
            "[fit]\nmin_observations = 2\n[curve]\nforward_horizon = -1.0\n",
        )
        .unwrap_err();
        match err {
            ConfigError::MultipleValidationErrors(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"fit.min_observations"));
                assert!(fields.contains(&"curve.forward_horizon"));
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
