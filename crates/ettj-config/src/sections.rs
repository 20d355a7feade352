//! `[curve]`, `[store]`, `[pipeline]` and `[calendar]` sections.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ettj_core::calendars::HolidayCalendar;
use ettj_core::{Compounding, Date};
use ettj_curves::fitted::{OutputGrid, DEFAULT_FORWARD_HORIZON, DEFAULT_OUTPUT_TENORS};
use ettj_storage::{StoreBackend, StoreSettings, TenorUnit};

use crate::error::{ConfigError, ConfigResult, Validate, ValidationError};

/// Output grid of fitted curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveSection {
    /// Tenors in years at which fitted curves are stored.
    pub output_tenors: Vec<f64>,
    /// Forward horizon in years.
    pub forward_horizon: f64,
    /// Forward compounding convention.
    pub compounding: Compounding,
}

impl Default for CurveSection {
    fn default() -> Self {
        Self {
            output_tenors: DEFAULT_OUTPUT_TENORS.to_vec(),
            forward_horizon: DEFAULT_FORWARD_HORIZON,
            compounding: Compounding::Annual,
        }
    }
}

impl CurveSection {
    /// Builds the output grid.
    pub fn output_grid(&self) -> ConfigResult<OutputGrid> {
        OutputGrid::new(
            self.output_tenors.clone(),
            self.forward_horizon,
            self.compounding,
        )
        .map_err(|e| ConfigError::invalid_value("curve", e.to_string()))
    }
}

impl Validate for CurveSection {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.output_tenors.is_empty() {
            errors.push(ValidationError::new(
                "output_tenors",
                "At least one output tenor is required",
            ));
        }
        if self.output_tenors.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            errors.push(ValidationError::with_rule(
                "output_tenors",
                "Output tenors must be positive",
                "positive_tenor",
            ));
        }
        if !(self.forward_horizon.is_finite() && self.forward_horizon > 0.0) {
            errors.push(ValidationError::with_rule(
                "forward_horizon",
                "Forward horizon must be positive",
                "positive_horizon",
            ));
        }
        errors
    }
}

/// Curve store location and layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Backend.
    pub backend: StoreBackend,
    /// Directory (csv) or database file (redb).
    pub path: PathBuf,
    /// Unit of the tenor column.
    pub tenor_unit: TenorUnit,
    /// How long a CSV merge waits for the lock file.
    pub lock_timeout_ms: u64,
    /// Age at which a leftover CSV lock file is broken.
    pub stale_lock_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        let settings = StoreSettings::default();
        Self {
            backend: settings.backend,
            path: settings.path,
            tenor_unit: settings.tenor_unit,
            lock_timeout_ms: u64::try_from(settings.lock_timeout.as_millis()).unwrap_or(u64::MAX),
            stale_lock_ms: u64::try_from(settings.stale_lock_age.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl StoreSection {
    /// Runtime store settings.
    #[must_use]
    pub fn settings(&self) -> StoreSettings {
        StoreSettings {
            backend: self.backend,
            path: self.path.clone(),
            tenor_unit: self.tenor_unit,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            stale_lock_age: Duration::from_millis(self.stale_lock_ms),
        }
    }
}

impl Validate for StoreSection {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.backend != StoreBackend::Memory && self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new("path", "Store path cannot be empty"));
        }
        if self.lock_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "lock_timeout_ms",
                "Lock timeout must be positive",
            ));
        }
        if self.stale_lock_ms == 0 {
            errors.push(ValidationError::new(
                "stale_lock_ms",
                "Stale lock age must be positive",
            ));
        }
        errors
    }
}

/// Batch run behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Drop fits flagged as degraded instead of storing them.
    pub exclude_degraded: bool,
    /// Store `nominal - real` when both fits exist for a date.
    pub derive_breakeven: bool,
    /// Replay file used as data source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            exclude_degraded: false,
            derive_breakeven: true,
            source: None,
        }
    }
}

impl Validate for PipelineSection {
    fn validate(&self) -> Vec<ValidationError> {
        match &self.source {
            Some(path) if path.as_os_str().is_empty() => {
                vec![ValidationError::new("source", "Source path cannot be empty")]
            }
            _ => vec![],
        }
    }
}

/// Business-day calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSection {
    /// Calendar name for logging.
    pub name: String,
    /// Holidays on top of weekends.
    pub holidays: Vec<Date>,
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            name: "weekends".to_string(),
            holidays: Vec::new(),
        }
    }
}

impl CalendarSection {
    /// Builds the calendar.
    #[must_use]
    pub fn calendar(&self) -> HolidayCalendar {
        HolidayCalendar::new(self.name.clone(), self.holidays.iter().copied())
    }
}

impl Validate for CalendarSection {
    fn validate(&self) -> Vec<ValidationError> {
        if self.name.trim().is_empty() {
            vec![ValidationError::new("name", "Calendar name cannot be empty")]
        } else {
            vec![]
        }
    }
}
