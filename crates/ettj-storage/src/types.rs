//! Row types persisted by curve stores.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ettj_core::{CurveFamily, Date};

use crate::error::{StorageError, StorageResult};

/// Business days per year used to convert `du` tenors to years.
pub const BUSINESS_DAYS_PER_YEAR: f64 = 252.0;

/// Rates closer than this are treated as the same value.
pub const RATE_TOLERANCE: f64 = 1e-12;

/// Returns true if two rates are equal within [`RATE_TOLERANCE`].
#[must_use]
pub fn rates_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= RATE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Unit of the tenor column, fixed per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenorUnit {
    /// Business days to maturity.
    #[default]
    #[serde(rename = "du")]
    BusinessDays,
    /// Years to maturity.
    Years,
}

impl TenorUnit {
    /// Name of the tenor column in the CSV contract.
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            TenorUnit::BusinessDays => "du",
            TenorUnit::Years => "tenor",
        }
    }

    /// Converts a tenor in years to this unit.
    #[must_use]
    pub fn convert_years(&self, years: f64) -> f64 {
        match self {
            TenorUnit::BusinessDays => (years * BUSINESS_DAYS_PER_YEAR).round(),
            TenorUnit::Years => years,
        }
    }

    /// Converts a business-day count to this unit.
    #[must_use]
    pub fn convert_business_days(&self, du: u32) -> f64 {
        match self {
            TenorUnit::BusinessDays => f64::from(du),
            TenorUnit::Years => f64::from(du) / BUSINESS_DAYS_PER_YEAR,
        }
    }
}

impl fmt::Display for TenorUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenorUnit::BusinessDays => write!(f, "du"),
            TenorUnit::Years => write!(f, "years"),
        }
    }
}

impl FromStr for TenorUnit {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "du" | "business_days" => Ok(TenorUnit::BusinessDays),
            "years" | "tenor" | "y" => Ok(TenorUnit::Years),
            other => Err(StorageError::Configuration(format!(
                "unknown tenor unit '{other}'"
            ))),
        }
    }
}

/// A non-negative finite tenor with a total order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tenor(f64);

impl Tenor {
    /// Creates a tenor.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRow` for negative or non-finite values.
    pub fn new(value: f64) -> StorageResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(StorageError::invalid_row(format!(
                "tenor must be non-negative and finite, got {value}"
            )));
        }
        // -0.0 and 0.0 must share a key
        Ok(Self(value + 0.0))
    }

    /// Returns the tenor value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Order-preserving bit pattern used as a database key.
    #[must_use]
    pub fn to_key_bits(&self) -> u64 {
        self.0.to_bits()
    }

    /// Inverse of [`Tenor::to_key_bits`].
    pub fn from_key_bits(bits: u64) -> StorageResult<Self> {
        Self::new(f64::from_bits(bits))
    }
}

impl PartialEq for Tenor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Tenor {}

impl PartialOrd for Tenor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tenor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for Tenor {
    type Error = StorageError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Tenor> for f64 {
    fn from(tenor: Tenor) -> Self {
        tenor.0
    }
}

impl fmt::Display for Tenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One persisted rate of a curve family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Actual data date of the source.
    pub as_of_date: Date,
    /// Tenor in the store's unit.
    pub tenor: Tenor,
    /// Rate in percent.
    pub rate: f64,
}

impl CurvePoint {
    /// Creates a curve point.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRow` for an invalid tenor or a non-finite rate.
    pub fn new(as_of_date: Date, tenor: f64, rate: f64) -> StorageResult<Self> {
        if !rate.is_finite() {
            return Err(StorageError::invalid_row(format!(
                "rate must be finite, got {rate} at {as_of_date} tenor {tenor}"
            )));
        }
        Ok(Self {
            as_of_date,
            tenor: Tenor::new(tenor)?,
            rate,
        })
    }

    /// Uniqueness key within a family.
    #[must_use]
    pub fn key(&self) -> (Date, Tenor) {
        (self.as_of_date, self.tenor)
    }
}

/// Outcome of one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Family merged into.
    pub family: CurveFamily,
    /// Rows newly written.
    pub inserted: usize,
    /// Candidates dropped because their key was already stored.
    pub skipped_duplicates: usize,
    /// Identical candidates collapsed within the batch.
    pub in_batch_duplicates: usize,
    /// Skipped candidates whose rate differed from the stored one.
    pub revised_ignored: usize,
    /// Rows stored after the merge.
    pub total_rows: usize,
}

impl MergeReport {
    /// A report with all counters at zero.
    #[must_use]
    pub fn empty(family: CurveFamily) -> Self {
        Self {
            family,
            inserted: 0,
            skipped_duplicates: 0,
            in_batch_duplicates: 0,
            revised_ignored: 0,
            total_rows: 0,
        }
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: inserted={} skipped={} in_batch_dupes={} revised_ignored={} total={}",
            self.family,
            self.inserted,
            self.skipped_duplicates,
            self.in_batch_duplicates,
            self.revised_ignored,
            self.total_rows
        )
    }
}

/// Per-family statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyStats {
    /// Curve family.
    pub family: CurveFamily,
    /// Stored rows.
    pub rows: usize,
    /// Distinct dates.
    pub dates: usize,
    /// Earliest date.
    pub first_date: Option<Date>,
    /// Latest date.
    pub last_date: Option<Date>,
}

impl FamilyStats {
    /// Computes statistics from ordered rows.
    #[must_use]
    pub fn from_rows(family: CurveFamily, rows: &[CurvePoint]) -> Self {
        let mut dates = 0;
        let mut previous = None;
        for row in rows {
            if previous != Some(row.as_of_date) {
                dates += 1;
                previous = Some(row.as_of_date);
            }
        }
        Self {
            family,
            rows: rows.len(),
            dates,
            first_date: rows.first().map(|r| r.as_of_date),
            last_date: rows.last().map(|r| r.as_of_date),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Backend name.
    pub backend: String,
    /// Tenor unit.
    pub tenor_unit: TenorUnit,
    /// One entry per family.
    pub families: Vec<FamilyStats>,
}

impl StoreStats {
    /// Total rows across families.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.families.iter().map(|f| f.rows).sum()
    }
}
