//! Compounding convention used when deriving forward rates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Interest compounding convention.
///
/// One convention applies to every curve family of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compounding {
    /// Annual compounding: growth factor `(1 + r)^t`.
    #[default]
    Annual,
    /// Continuous compounding: growth factor `exp(r t)`.
    Continuous,
}

impl Compounding {
    /// Returns true if this is continuous compounding.
    #[must_use]
    pub fn is_continuous(&self) -> bool {
        matches!(self, Compounding::Continuous)
    }

    /// Accumulation factor for a decimal rate over `t` years.
    #[must_use]
    pub fn growth_factor(&self, rate: f64, t: f64) -> f64 {
        match self {
            Compounding::Annual => (1.0 + rate).powf(t),
            Compounding::Continuous => (rate * t).exp(),
        }
    }
}

impl fmt::Display for Compounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compounding::Annual => "Annual",
            Compounding::Continuous => "Continuous",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Compounding {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" | "exponential" => Ok(Compounding::Annual),
            "continuous" => Ok(Compounding::Continuous),
            _ => Err(CoreError::UnknownCompounding { name: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_factor() {
        assert!((Compounding::Annual.growth_factor(0.10, 2.0) - 1.21).abs() < 1e-12);
        let cont = Compounding::Continuous.growth_factor(0.05, 1.0);
        assert!((cont - 0.05f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_default_and_parse() {
        assert_eq!(Compounding::default(), Compounding::Annual);
        assert_eq!(
            "continuous".parse::<Compounding>().unwrap(),
            Compounding::Continuous
        );
        assert!("monthly".parse::<Compounding>().is_err());
    }
}
