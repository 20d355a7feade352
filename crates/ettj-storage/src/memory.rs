//! In-memory curve store.
//!
//! Useful for tests and dry runs. Data is not persisted across restarts.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use ettj_core::CurveFamily;

use crate::error::{StorageError, StorageResult};
use crate::merge::merge_rows;
use crate::store::CurveStore;
use crate::types::{CurvePoint, MergeReport, TenorUnit};

/// In-memory curve store.
///
/// # Example
///
/// ```rust
/// use ettj_core::{CurveFamily, Date};
/// use ettj_storage::{CurvePoint, CurveStore, InMemoryCurveStore, TenorUnit};
///
/// let store = InMemoryCurveStore::new(TenorUnit::BusinessDays);
/// let date = Date::from_ymd(2025, 1, 6).unwrap();
/// let report = store
///     .merge(CurveFamily::Nominal, &[CurvePoint::new(date, 252.0, 10.2).unwrap()])
///     .unwrap();
/// assert_eq!(report.inserted, 1);
/// ```
#[derive(Debug)]
pub struct InMemoryCurveStore {
    unit: TenorUnit,
    rows: RwLock<HashMap<CurveFamily, Vec<CurvePoint>>>,
}

impl Default for InMemoryCurveStore {
    fn default() -> Self {
        Self::new(TenorUnit::default())
    }
}

impl InMemoryCurveStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(unit: TenorUnit) -> Self {
        Self {
            unit,
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Removes every row.
    pub fn clear(&self) -> StorageResult<()> {
        self.rows
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {e}")))?
            .clear();
        Ok(())
    }
}

impl CurveStore for InMemoryCurveStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn tenor_unit(&self) -> TenorUnit {
        self.unit
    }

    fn load(&self, family: CurveFamily) -> StorageResult<Vec<CurvePoint>> {
        let rows = self
            .rows
            .read()
            .map_err(|e| StorageError::Database(format!("Lock error: {e}")))?;
        Ok(rows.get(&family).cloned().unwrap_or_default())
    }

    fn merge(&self, family: CurveFamily, batch: &[CurvePoint]) -> StorageResult<MergeReport> {
        let mut rows = self
            .rows
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {e}")))?;
        let existing = rows.get(&family).map(Vec::as_slice).unwrap_or_default();
        let outcome = merge_rows(family, existing, batch)?;

        debug!(report = %outcome.report, "Memory merge complete");
        if outcome.report.total_rows > 0 {
            rows.insert(family, outcome.rows);
        }
        Ok(outcome.report)
    }
}
