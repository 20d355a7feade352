//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration operation result type.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Validation error.
    #[error("Validation error: {field}: {message}")]
    Validation {
        /// Field that failed validation.
        field: String,
        /// Validation error message.
        message: String,
    },

    /// Multiple validation errors.
    #[error("Multiple validation errors: {}", join_errors(.0))]
    MultipleValidationErrors(Vec<ValidationError>),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Value accepted by the parser but rejected when building runtime settings.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Field.
        field: String,
        /// Description.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Validation error message.
    pub message: String,
    /// Validation rule that was violated.
    pub rule: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Creates a validation error with a rule name.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }

    /// Prefixes the field with a section name.
    #[must_use]
    pub fn nested(mut self, section: &str) -> Self {
        self.field = format!("{section}.{}", self.field);
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref rule) = self.rule {
            write!(f, "{}: {} (rule: {})", self.field, self.message, rule)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Deserialization(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Serialization(err.to_string())
    }
}

/// Trait for validatable configurations.
pub trait Validate {
    /// Validates the configuration.
    ///
    /// Returns a list of validation errors, or an empty vector if valid.
    fn validate(&self) -> Vec<ValidationError>;

    /// Returns true if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validates and returns an error if invalid.
    fn validate_or_error(&self) -> ConfigResult<()> {
        let mut errors = self.validate();
        match errors.len() {
            0 => Ok(()),
            1 => {
                let err = errors.remove(0);
                Err(ConfigError::Validation {
                    field: err.field,
                    message: err.message,
                })
            }
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

/// Checks that a `[lower, upper]` pair is finite and ordered.
pub(crate) fn check_range(field: &str, range: [f64; 2], errors: &mut Vec<ValidationError>) {
    let [lower, upper] = range;
    if !lower.is_finite() || !upper.is_finite() {
        errors.push(ValidationError::with_rule(
            field,
            "Bounds must be finite",
            "finite_bounds",
        ));
    } else if lower >= upper {
        errors.push(ValidationError::with_rule(
            field,
            format!("Lower bound {lower} must be below upper bound {upper}"),
            "ordered_bounds",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Positive(f64);

    impl Validate for Positive {
        fn validate(&self) -> Vec<ValidationError> {
            if self.0 > 0.0 {
                vec![]
            } else {
                vec![ValidationError::new("value", "must be positive")]
            }
        }
    }

    #[test]
    fn test_validate_or_error() {
        assert!(Positive(1.0).validate_or_error().is_ok());
        assert!(matches!(
            Positive(-1.0).validate_or_error(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_display() {
        let err = ValidationError::with_rule("seed", "bad", "rule").nested("fit.global");
        assert_eq!(err.to_string(), "fit.global.seed: bad (rule: rule)");

        let multi = ConfigError::MultipleValidationErrors(vec![
            ValidationError::new("a", "x"),
            ValidationError::new("b", "y"),
        ]);
        assert_eq!(multi.to_string(), "Multiple validation errors: a: x; b: y");
    }

    #[test]
    fn test_check_range() {
        let mut errors = Vec::new();
        check_range("ok", [0.0, 1.0], &mut errors);
        check_range("flipped", [1.0, 0.0], &mut errors);
        check_range("nan", [f64::NAN, 1.0], &mut errors);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].rule.as_deref(), Some("ordered_bounds"));
        assert_eq!(errors[1].rule.as_deref(), Some("finite_bounds"));
    }
}
