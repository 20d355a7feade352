//! # ETTJ Storage
//!
//! Incremental, deduplicated persistence of fitted curve points.
//!
//! Each curve family is an append-only series of [`CurvePoint`]s, unique and
//! ordered by `(date, tenor)`. [`CurveStore::merge`] adds a batch without
//! ever overwriting a stored rate.
//!
//! ## Backends
//!
//! - [`CsvCurveStore`]: one sorted CSV file per family, lock file + atomic rename
//! - [`RedbCurveStore`]: one redb table per family, one write transaction per merge
//! - [`InMemoryCurveStore`]: for tests
//!
//! ## Example
//!
//! ```rust
//! use ettj_core::{CurveFamily, Date};
//! use ettj_storage::prelude::*;
//!
//! let store = InMemoryCurveStore::new(TenorUnit::BusinessDays);
//! let monday = Date::from_ymd(2025, 1, 6).unwrap();
//! let rows = vec![
//!     CurvePoint::new(monday, 252.0, 10.2).unwrap(),
//!     CurvePoint::new(monday, 504.0, 10.5).unwrap(),
//! ];
//!
//! assert_eq!(store.merge(CurveFamily::Nominal, &rows).unwrap().inserted, 2);
//! // Merging the same rows again is a no-op.
//! assert_eq!(store.merge(CurveFamily::Nominal, &rows).unwrap().inserted, 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod csv_store;
mod error;
mod lock;
mod memory;
mod merge;
mod redb_store;
mod store;
mod types;

pub use csv_store::CsvCurveStore;
pub use error::{StorageError, StorageResult};
pub use lock::FileLock;
pub use memory::InMemoryCurveStore;
pub use merge::{dedupe_batch, is_canonical, merge_rows, verify_ordering, MergeOutcome};
pub use redb_store::RedbCurveStore;
pub use store::{
    export_csv, open_store, CurveStore, StoreBackend, StoreSettings, DEFAULT_LOCK_TIMEOUT,
    DEFAULT_STALE_LOCK_AGE,
};
pub use types::{
    rates_match, CurvePoint, FamilyStats, MergeReport, StoreStats, Tenor, TenorUnit,
    BUSINESS_DAYS_PER_YEAR, RATE_TOLERANCE,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::csv_store::CsvCurveStore;
    pub use crate::error::{StorageError, StorageResult};
    pub use crate::memory::InMemoryCurveStore;
    pub use crate::redb_store::RedbCurveStore;
    pub use crate::store::{open_store, CurveStore, StoreBackend, StoreSettings};
    pub use crate::types::{CurvePoint, MergeReport, StoreStats, Tenor, TenorUnit};
}
