//! Data source boundary.

use serde::{Deserialize, Serialize};

use ettj_core::Date;
use ettj_curves::ObservationSet;

use crate::error::SourceResult;

/// One zero-coupon vertex as published by ANBIMA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Business days to maturity.
    #[serde(alias = "vertice_du", alias = "prazo_du")]
    pub du: u32,
    /// Nominal (prefixado) rate in percent.
    #[serde(
        default,
        alias = "taxa_prefixadas",
        alias = "taxa_nominal",
        alias = "taxa_pre"
    )]
    pub nominal: Option<f64>,
    /// Real (IPCA) rate in percent.
    #[serde(default, alias = "taxa_ipca", alias = "taxa_real")]
    pub real: Option<f64>,
    /// Breakeven (implicit) inflation in percent.
    #[serde(default, alias = "taxa_implicita", alias = "taxa_breakeven")]
    pub breakeven: Option<f64>,
}

impl Vertex {
    /// Returns true if at least one rate is present.
    #[must_use]
    pub fn has_rates(&self) -> bool {
        self.nominal.is_some() || self.real.is_some() || self.breakeven.is_some()
    }
}

/// Data returned for one date.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadContent {
    /// Raw quotes to fit, one set per family.
    Instruments(Vec<ObservationSet>),
    /// Pre-fitted vertices.
    Vertices(Vec<Vertex>),
}

impl PayloadContent {
    /// Number of observation sets or vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            PayloadContent::Instruments(sets) => sets.len(),
            PayloadContent::Vertices(vertices) => vertices.len(),
        }
    }

    /// Returns true if there is nothing to process.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A source response: the data and the date it actually refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePayload {
    /// Date of the data, which may precede the requested date.
    pub actual_date: Date,
    /// Data.
    pub content: PayloadContent,
}

/// Something that returns curve data for a requested date.
///
/// Sources may answer with an earlier date's data (the last available
/// business day); `actual_date` must say so.
pub trait CurveDataSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Fetches data for `requested`. `Ok(None)` means no data.
    fn fetch(&self, requested: Date) -> SourceResult<Option<SourcePayload>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_aliases() {
        let json = r#"{"vertice_du": 252, "taxa_prefixadas": 10.5, "taxa_ipca": 6.1, "taxa_implicita": 4.2}"#;
        let vertex: Vertex = serde_json::from_str(json).unwrap();
        assert_eq!(vertex.du, 252);
        assert_eq!(vertex.nominal, Some(10.5));
        assert_eq!(vertex.real, Some(6.1));
        assert_eq!(vertex.breakeven, Some(4.2));

        let json = r#"{"prazo_du": 21, "taxa_pre": 10.1}"#;
        let vertex: Vertex = serde_json::from_str(json).unwrap();
        assert_eq!(vertex.du, 21);
        assert!(vertex.real.is_none());
        assert!(vertex.has_rates());
    }
}
