//! CSV store: one sorted file per curve family.
//!
//! ```text
//! data/
//!   ettj_nominal.csv
//!   ettj_real.csv
//!   ettj_breakeven.csv
//! ```
//!
//! Each file has the header `date,du,rate` (or `date,tenor,rate` for year
//! tenors). A merge holds `<file>.lock` while it reads, merges and rewrites
//! the file through a temporary file renamed over the original.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use ettj_core::{CurveFamily, Date};

use crate::error::{StorageError, StorageResult};
use crate::lock::FileLock;
use crate::merge::{is_canonical, merge_rows};
use crate::store::{CurveStore, DEFAULT_LOCK_TIMEOUT, DEFAULT_STALE_LOCK_AGE};
use crate::types::{CurvePoint, MergeReport, TenorUnit};

/// CSV-backed curve store.
#[derive(Debug, Clone)]
pub struct CsvCurveStore {
    dir: PathBuf,
    unit: TenorUnit,
    lock_timeout: Duration,
    stale_lock_age: Duration,
}

impl CsvCurveStore {
    /// Opens a store directory, creating it if needed.
    pub fn open(dir: impl AsRef<Path>, unit: TenorUnit) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            unit,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            stale_lock_age: DEFAULT_STALE_LOCK_AGE,
        })
    }

    /// Sets how long a merge waits for the lock file.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the age at which a leftover lock file is broken.
    #[must_use]
    pub fn with_stale_lock_age(mut self, age: Duration) -> Self {
        self.stale_lock_age = age;
        self
    }

    /// Store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Data file of a family.
    #[must_use]
    pub fn file_path(&self, family: CurveFamily) -> PathBuf {
        self.dir.join(format!("ettj_{family}.csv"))
    }

    /// Lock file guarding a family's data file.
    #[must_use]
    pub fn lock_path(&self, family: CurveFamily) -> PathBuf {
        self.dir.join(format!("ettj_{family}.csv.lock"))
    }

    fn read_rows(&self, family: CurveFamily) -> StorageResult<Vec<CurvePoint>> {
        let path = self.file_path(family);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&path)?;
        self.check_header(&path, reader.headers()?)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, csv::Position::line);
            let parse_error = |reason: String| StorageError::Parse {
                path: path.clone(),
                line,
                reason,
            };

            if record.len() != 3 {
                return Err(parse_error(format!("expected 3 fields, found {}", record.len())));
            }
            let date = Date::parse(&record[0]).map_err(|e| parse_error(e.to_string()))?;
            let tenor: f64 = record[1]
                .trim()
                .parse()
                .map_err(|e| parse_error(format!("tenor '{}': {e}", &record[1])))?;
            let rate: f64 = record[2]
                .trim()
                .parse()
                .map_err(|e| parse_error(format!("rate '{}': {e}", &record[2])))?;
            rows.push(CurvePoint::new(date, tenor, rate).map_err(|e| parse_error(e.to_string()))?);
        }
        Ok(rows)
    }

    fn check_header(&self, path: &Path, header: &csv::StringRecord) -> StorageResult<()> {
        let columns: Vec<&str> = header.iter().map(str::trim).collect();
        if columns.len() == 3 && columns[0] == "date" && columns[2] == "rate" {
            if columns[1] == self.unit.column() {
                return Ok(());
            }
            let other = match self.unit {
                TenorUnit::BusinessDays => TenorUnit::Years,
                TenorUnit::Years => TenorUnit::BusinessDays,
            };
            if columns[1] == other.column() {
                return Err(StorageError::TenorUnitMismatch {
                    expected: self.unit.to_string(),
                    found: other.to_string(),
                });
            }
        }
        Err(StorageError::Parse {
            path: path.to_path_buf(),
            line: 1,
            reason: format!(
                "unexpected header '{}', expected 'date,{},rate'",
                columns.join(","),
                self.unit.column()
            ),
        })
    }

    fn write_rows(&self, family: CurveFamily, rows: &[CurvePoint]) -> StorageResult<()> {
        let path = self.file_path(family);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer.write_record(["date", self.unit.column(), "rate"])?;
            for row in rows {
                writer.write_record([
                    row.as_of_date.to_string(),
                    row.tenor.to_string(),
                    row.rate.to_string(),
                ])?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;
        debug!(path = %path.display(), rows = rows.len(), "Rewrote curve file");
        Ok(())
    }
}

impl CurveStore for CsvCurveStore {
    fn backend_name(&self) -> &'static str {
        "csv"
    }

    fn tenor_unit(&self) -> TenorUnit {
        self.unit
    }

    fn is_healthy(&self) -> bool {
        self.dir.is_dir()
    }

    fn load(&self, family: CurveFamily) -> StorageResult<Vec<CurvePoint>> {
        let mut rows = self.read_rows(family)?;
        if !is_canonical(&rows) {
            rows = merge_rows(family, &rows, &[])?.rows;
        }
        Ok(rows)
    }

    fn merge(&self, family: CurveFamily, rows: &[CurvePoint]) -> StorageResult<MergeReport> {
        let _lock = FileLock::acquire(self.lock_path(family), self.lock_timeout, self.stale_lock_age)?;

        let existing = self.read_rows(family)?;
        let outcome = merge_rows(family, &existing, rows)?;

        if outcome.report.inserted > 0 || !is_canonical(&existing) {
            self.write_rows(family, &outcome.rows)?;
        }

        info!(report = %outcome.report, "CSV merge complete");
        Ok(outcome.report)
    }
}
