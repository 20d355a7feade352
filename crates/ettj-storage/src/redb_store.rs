//! redb store: one B-tree table per curve family.
//!
//! Keys are `(date ordinal, tenor bits)`. Non-negative `f64` bit patterns
//! sort like the values, so the table order is the `(date, tenor)` order and
//! no re-sort is needed on write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::info;

use ettj_core::{CurveFamily, Date};

use crate::error::{StorageError, StorageResult};
use crate::merge::merge_rows;
use crate::store::CurveStore;
use crate::types::{CurvePoint, MergeReport, Tenor, TenorUnit};

type CurveTable = TableDefinition<'static, (i64, u64), f64>;

const NOMINAL_TABLE: CurveTable = TableDefinition::new("ettj_nominal");
const REAL_TABLE: CurveTable = TableDefinition::new("ettj_real");
const BREAKEVEN_TABLE: CurveTable = TableDefinition::new("ettj_breakeven");
const META_TABLE: TableDefinition<&str, &str> = TableDefinition::new("ettj_meta");

const TENOR_UNIT_KEY: &str = "tenor_unit";

fn table_for(family: CurveFamily) -> CurveTable {
    match family {
        CurveFamily::Nominal => NOMINAL_TABLE,
        CurveFamily::Real => REAL_TABLE,
        CurveFamily::Breakeven => BREAKEVEN_TABLE,
    }
}

fn to_key(row: &CurvePoint) -> (i64, u64) {
    (row.as_of_date.ordinal(), row.tenor.to_key_bits())
}

fn from_entry(key: (i64, u64), rate: f64) -> StorageResult<CurvePoint> {
    let date = Date::from_ordinal(key.0).map_err(|e| StorageError::Database(e.to_string()))?;
    Ok(CurvePoint {
        as_of_date: date,
        tenor: Tenor::from_key_bits(key.1)?,
        rate,
    })
}

fn collect_rows<T: ReadableTable<(i64, u64), f64>>(table: &T) -> StorageResult<Vec<CurvePoint>> {
    let mut rows = Vec::new();
    for entry in table.iter()? {
        let (key, value) = entry?;
        rows.push(from_entry(key.value(), value.value())?);
    }
    Ok(rows)
}

/// redb-backed curve store.
pub struct RedbCurveStore {
    db: Arc<Database>,
    path: PathBuf,
    unit: TenorUnit,
}

impl RedbCurveStore {
    /// Opens or creates a database file.
    ///
    /// # Errors
    ///
    /// `TenorUnitMismatch` if the file was created with another tenor unit.
    pub fn open(path: impl AsRef<Path>, unit: TenorUnit) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(&path)?;
        let store = Self {
            db: Arc::new(db),
            path,
            unit,
        };
        store.initialize_tables()?;
        Ok(store)
    }

    /// Database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initialize_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            for family in CurveFamily::ALL {
                let _ = write_txn.open_table(table_for(family))?;
            }
            let mut meta = write_txn.open_table(META_TABLE)?;
            let stored = meta.get(TENOR_UNIT_KEY)?.map(|v| v.value().to_string());
            match stored {
                Some(found) if found != self.unit.to_string() => {
                    return Err(StorageError::TenorUnitMismatch {
                        expected: self.unit.to_string(),
                        found,
                    });
                }
                Some(_) => {}
                None => {
                    meta.insert(TENOR_UNIT_KEY, self.unit.to_string().as_str())?;
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl CurveStore for RedbCurveStore {
    fn backend_name(&self) -> &'static str {
        "redb"
    }

    fn tenor_unit(&self) -> TenorUnit {
        self.unit
    }

    fn is_healthy(&self) -> bool {
        self.db.begin_read().is_ok()
    }

    fn load(&self, family: CurveFamily) -> StorageResult<Vec<CurvePoint>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table_for(family))?;
        collect_rows(&table)
    }

    fn load_range(
        &self,
        family: CurveFamily,
        from: Date,
        to: Date,
    ) -> StorageResult<Vec<CurvePoint>> {
        if to < from {
            return Ok(Vec::new());
        }
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table_for(family))?;

        let mut rows = Vec::new();
        for entry in table.range((from.ordinal(), 0u64)..=(to.ordinal(), u64::MAX))? {
            let (key, value) = entry?;
            rows.push(from_entry(key.value(), value.value())?);
        }
        Ok(rows)
    }

    fn latest_date(&self, family: CurveFamily) -> StorageResult<Option<Date>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table_for(family))?;
        let latest = match table.last()? {
            Some((key, _)) => {
                let (ordinal, _) = key.value();
                Some(Date::from_ordinal(ordinal).map_err(|e| StorageError::Database(e.to_string()))?)
            }
            None => None,
        };
        Ok(latest)
    }

    fn merge(&self, family: CurveFamily, rows: &[CurvePoint]) -> StorageResult<MergeReport> {
        // Write transactions are exclusive, which makes the merge atomic.
        let write_txn = self.db.begin_write()?;
        let report = {
            let mut table = write_txn.open_table(table_for(family))?;
            let existing = collect_rows(&table)?;
            let outcome = merge_rows(family, &existing, rows)?;
            for row in &outcome.inserted {
                table.insert(to_key(row), row.rate)?;
            }
            outcome.report
        };
        write_txn.commit()?;

        info!(report = %report, "redb merge complete");
        Ok(report)
    }
}
