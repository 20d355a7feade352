//! Store trait shared by all backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use ettj_core::{CurveFamily, Date};

use crate::csv_store::CsvCurveStore;
use crate::error::{StorageError, StorageResult};
use crate::memory::InMemoryCurveStore;
use crate::redb_store::RedbCurveStore;
use crate::types::{CurvePoint, FamilyStats, MergeReport, StoreStats, TenorUnit};

/// Default time to wait for the CSV lock file.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default age after which a CSV lock file is considered abandoned.
pub const DEFAULT_STALE_LOCK_AGE: Duration = Duration::from_secs(600);

/// A persisted, per-family series of curve points.
///
/// Rows of a family are unique by `(date, tenor)` and kept in that order.
/// `merge` only ever adds rows.
pub trait CurveStore: Send + Sync {
    /// Returns the backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Unit of stored tenors.
    fn tenor_unit(&self) -> TenorUnit;

    /// Checks if the backend is reachable.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Loads every row of a family in `(date, tenor)` order.
    fn load(&self, family: CurveFamily) -> StorageResult<Vec<CurvePoint>>;

    /// Loads rows with `from <= date <= to`.
    fn load_range(
        &self,
        family: CurveFamily,
        from: Date,
        to: Date,
    ) -> StorageResult<Vec<CurvePoint>> {
        Ok(self
            .load(family)?
            .into_iter()
            .filter(|row| row.as_of_date >= from && row.as_of_date <= to)
            .collect())
    }

    /// Latest stored date of a family.
    fn latest_date(&self, family: CurveFamily) -> StorageResult<Option<Date>> {
        Ok(self.load(family)?.last().map(|row| row.as_of_date))
    }

    /// Merges candidate rows into a family.
    ///
    /// # Errors
    ///
    /// `DuplicateKeyConflict` if the batch disagrees with itself, in which
    /// case nothing is written. I/O and database errors are propagated.
    fn merge(&self, family: CurveFamily, rows: &[CurvePoint]) -> StorageResult<MergeReport>;

    /// Row counts and date ranges per family.
    fn stats(&self) -> StorageResult<StoreStats> {
        let families = CurveFamily::ALL
            .iter()
            .map(|&family| Ok(FamilyStats::from_rows(family, &self.load(family)?)))
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(StoreStats {
            backend: self.backend_name().to_string(),
            tenor_unit: self.tenor_unit(),
            families,
        })
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One CSV file per family.
    #[default]
    Csv,
    /// redb database file.
    Redb,
    /// Process memory.
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Csv => write!(f, "csv"),
            StoreBackend::Redb => write!(f, "redb"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Everything needed to open a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Backend.
    pub backend: StoreBackend,
    /// Directory for CSV, database file for redb. Ignored for memory.
    pub path: PathBuf,
    /// Tenor unit.
    pub tenor_unit: TenorUnit,
    /// CSV lock wait.
    pub lock_timeout: Duration,
    /// Age at which a CSV lock file is broken.
    pub stale_lock_age: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Csv,
            path: PathBuf::from("data"),
            tenor_unit: TenorUnit::BusinessDays,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            stale_lock_age: DEFAULT_STALE_LOCK_AGE,
        }
    }
}

/// Opens the configured store.
pub fn open_store(settings: &StoreSettings) -> StorageResult<Arc<dyn CurveStore>> {
    let store: Arc<dyn CurveStore> = match settings.backend {
        StoreBackend::Csv => Arc::new(
            CsvCurveStore::open(&settings.path, settings.tenor_unit)?
                .with_lock_timeout(settings.lock_timeout)
                .with_stale_lock_age(settings.stale_lock_age),
        ),
        StoreBackend::Redb => Arc::new(RedbCurveStore::open(&settings.path, settings.tenor_unit)?),
        StoreBackend::Memory => Arc::new(InMemoryCurveStore::new(settings.tenor_unit)),
    };
    info!(
        backend = store.backend_name(),
        path = %settings.path.display(),
        tenor_unit = %settings.tenor_unit,
        "Opened curve store"
    );
    Ok(store)
}

/// Exports every family of `store` into the CSV layout under `dir`.
///
/// Rows already present in `dir` win, as in any merge.
pub fn export_csv(store: &dyn CurveStore, dir: &Path) -> StorageResult<Vec<(PathBuf, MergeReport)>> {
    if !store.is_healthy() {
        return Err(StorageError::Database(format!(
            "{} store is not healthy",
            store.backend_name()
        )));
    }
    let target = CsvCurveStore::open(dir, store.tenor_unit())?;
    CurveFamily::ALL
        .iter()
        .map(|&family| {
            let rows = store.load(family)?;
            let report = target.merge(family, &rows)?;
            Ok((target.file_path(family), report))
        })
        .collect()
}
