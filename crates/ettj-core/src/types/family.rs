//! Curve family identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The kind of curve a row or observation belongs to.
///
/// Each family is stored as an independent partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveFamily {
    /// Nominal (fixed-rate) government curve.
    Nominal,
    /// Real (inflation-linked) government curve.
    Real,
    /// Breakeven inflation: nominal minus real at the same tenor.
    Breakeven,
}

impl CurveFamily {
    /// All families in storage order.
    pub const ALL: [CurveFamily; 3] = [Self::Nominal, Self::Real, Self::Breakeven];

    /// Stable lowercase name, used in file names and on the command line.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveFamily::Nominal => "nominal",
            CurveFamily::Real => "real",
            CurveFamily::Breakeven => "breakeven",
        }
    }
}

impl fmt::Display for CurveFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurveFamily {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nominal" | "pre" | "prefixado" => Ok(CurveFamily::Nominal),
            "real" | "ipca" => Ok(CurveFamily::Real),
            "breakeven" | "implicita" | "inflation" => Ok(CurveFamily::Breakeven),
            _ => Err(CoreError::unknown_family(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_names() {
        for family in CurveFamily::ALL {
            assert_eq!(family.as_str().parse::<CurveFamily>().unwrap(), family);
        }
        assert_eq!("IPCA".parse::<CurveFamily>().unwrap(), CurveFamily::Real);
        assert!("swap".parse::<CurveFamily>().is_err());
    }

    #[test]
    fn test_family_serde() {
        let json = serde_json::to_string(&CurveFamily::Breakeven).unwrap();
        assert_eq!(json, "\"breakeven\"");
    }
}
