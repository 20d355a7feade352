//! File-backed replay source.
//!
//! A replay file is a JSON list of dated entries, either bare or under an
//! `"entries"` key. Each entry carries ANBIMA-style vertices or raw quotes:
//!
//! ```json
//! [
//!   {
//!     "data_referencia": "2025-01-06",
//!     "curvas": [{ "vertice_du": 252, "taxa_prefixadas": 10.2, "taxa_ipca": 6.5 }]
//!   },
//!   {
//!     "date": "2025-01-07",
//!     "instruments": [
//!       { "family": "nominal", "observations": [{ "maturity": 0.5, "yield": 10.0 }] }
//!     ]
//!   }
//! ]
//! ```
//!
//! A request for a date without an entry is answered with the latest
//! earlier entry, like an upstream that returns the last available
//! business day.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, info, warn};

use ettj_core::{CurveFamily, Date};
use ettj_curves::{Observation, ObservationSet};

use crate::error::{SourceError, SourceResult};
use crate::source::{CurveDataSource, PayloadContent, SourcePayload, Vertex};

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayFile {
    Entries(Vec<RawEntry>),
    Wrapped { entries: Vec<RawEntry> },
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(alias = "data_referencia", alias = "as_of_date")]
    date: Date,
    #[serde(default, alias = "curvas", alias = "curvas_juros", alias = "data")]
    vertices: Vec<RawVertex>,
    #[serde(default)]
    instruments: Vec<InstrumentBlock>,
}

#[derive(Deserialize)]
struct RawVertex {
    #[serde(default, alias = "vertice_du", alias = "prazo_du")]
    du: Option<u32>,
    #[serde(
        default,
        alias = "taxa_prefixadas",
        alias = "taxa_nominal",
        alias = "taxa_pre"
    )]
    nominal: Option<f64>,
    #[serde(default, alias = "taxa_ipca", alias = "taxa_real")]
    real: Option<f64>,
    #[serde(default, alias = "taxa_implicita", alias = "taxa_breakeven")]
    breakeven: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct InstrumentBlock {
    family: CurveFamily,
    observations: Vec<Observation>,
}

#[derive(Debug, Clone)]
struct ReplayEntry {
    vertices: Vec<Vertex>,
    instruments: Vec<InstrumentBlock>,
}

fn parse_entries(content: &str) -> SourceResult<BTreeMap<Date, ReplayEntry>> {
    let raw = match serde_json::from_str::<ReplayFile>(content)? {
        ReplayFile::Entries(entries) | ReplayFile::Wrapped { entries } => entries,
    };

    let mut entries = BTreeMap::new();
    for entry in raw {
        let total = entry.vertices.len();
        let vertices: Vec<Vertex> = entry
            .vertices
            .into_iter()
            .filter_map(|v| {
                let vertex = Vertex {
                    du: v.du?,
                    nominal: v.nominal,
                    real: v.real,
                    breakeven: v.breakeven,
                };
                vertex.has_rates().then_some(vertex)
            })
            .collect();
        if vertices.len() < total {
            warn!(
                date = %entry.date,
                skipped = total - vertices.len(),
                "Skipping vertices without du or rates"
            );
        }

        let parsed = ReplayEntry {
            vertices,
            instruments: entry.instruments,
        };
        if entries.insert(entry.date, parsed).is_some() {
            return Err(SourceError::Parse(format!(
                "duplicate entry for {}",
                entry.date
            )));
        }
    }
    Ok(entries)
}

/// Replays recorded source responses from a JSON file.
#[derive(Debug)]
pub struct JsonReplaySource {
    file_path: Option<PathBuf>,
    entries: RwLock<BTreeMap<Date, ReplayEntry>>,
}

impl JsonReplaySource {
    /// Loads a replay file.
    pub fn new(file_path: impl AsRef<Path>) -> SourceResult<Self> {
        let source = Self {
            file_path: Some(file_path.as_ref().to_path_buf()),
            entries: RwLock::new(BTreeMap::new()),
        };
        source.reload()?;
        Ok(source)
    }

    /// Parses replay content held in memory.
    pub fn from_json_str(content: &str) -> SourceResult<Self> {
        Ok(Self {
            file_path: None,
            entries: RwLock::new(parse_entries(content)?),
        })
    }

    /// Re-reads the file. A missing file gives an empty source.
    pub fn reload(&self) -> SourceResult<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        if !path.exists() {
            warn!(path = %path.display(), "Replay file not found, source is empty");
            *self.entries.write() = BTreeMap::new();
            return Ok(());
        }

        let content = std::fs::read_to_string(path)?;
        let entries = parse_entries(&content)?;
        info!(path = %path.display(), entries = entries.len(), "Loaded replay file");
        *self.entries.write() = entries;
        Ok(())
    }

    /// Number of dated entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the source has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CurveDataSource for JsonReplaySource {
    fn name(&self) -> &str {
        "json-replay"
    }

    fn fetch(&self, requested: Date) -> SourceResult<Option<SourcePayload>> {
        let entries = self.entries.read();
        let Some((&actual_date, entry)) = entries.range(..=requested).next_back() else {
            debug!(%requested, "No replay entry on or before date");
            return Ok(None);
        };

        let content = match (entry.vertices.is_empty(), entry.instruments.is_empty()) {
            (true, true) => {
                warn!(%requested, %actual_date, "Replay entry has no curve data");
                return Ok(None);
            }
            (false, false) => {
                return Err(SourceError::malformed(
                    requested,
                    "entry has both vertices and instruments",
                ));
            }
            (false, true) => PayloadContent::Vertices(entry.vertices.clone()),
            (true, false) => PayloadContent::Instruments(
                entry
                    .instruments
                    .iter()
                    .map(|block| {
                        ObservationSet::new(actual_date, block.family, block.observations.clone())
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| SourceError::malformed(requested, e.to_string()))?,
            ),
        };

        Ok(Some(SourcePayload {
            actual_date,
            content,
        }))
    }
}
