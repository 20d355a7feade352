//! Merge of a candidate batch into the rows already stored for a family.
//!
//! Every backend runs the same algorithm:
//!
//! 1. Collapse identical candidates within the batch; conflicting candidates
//!    for one key abort the merge with `DuplicateKeyConflict`.
//! 2. Drop candidates whose key is already stored. The stored rate wins.
//! 3. Sort the union by `(date, tenor)` and verify strict ordering.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use ettj_core::{CurveFamily, Date};

use crate::error::{StorageError, StorageResult};
use crate::types::{rates_match, CurvePoint, MergeReport, Tenor};

/// Result of merging a batch into a row set.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Full row set after the merge, ordered by `(date, tenor)`.
    pub rows: Vec<CurvePoint>,
    /// Rows that were not stored before, ordered.
    pub inserted: Vec<CurvePoint>,
    /// Counters.
    pub report: MergeReport,
}

/// Collapses identical in-batch duplicates.
///
/// Returns the unique candidates keyed by `(date, tenor)` and the number of
/// collapsed rows.
///
/// # Errors
///
/// Returns `StorageError::DuplicateKeyConflict` when two candidates share a
/// key but carry different rates.
pub fn dedupe_batch(
    family: CurveFamily,
    batch: &[CurvePoint],
) -> StorageResult<(BTreeMap<(Date, Tenor), f64>, usize)> {
    let mut unique = BTreeMap::new();
    let mut collapsed = 0;

    for row in batch {
        match unique.get(&row.key()) {
            Some(&first) if rates_match(first, row.rate) => collapsed += 1,
            Some(&first) => {
                return Err(StorageError::DuplicateKeyConflict {
                    family,
                    date: row.as_of_date,
                    tenor: row.tenor.value(),
                    first,
                    second: row.rate,
                });
            }
            None => {
                unique.insert(row.key(), row.rate);
            }
        }
    }

    Ok((unique, collapsed))
}

/// Merges `batch` into `existing`.
///
/// `existing` may be in any order. If it holds the same key twice the first
/// occurrence is kept.
pub fn merge_rows(
    family: CurveFamily,
    existing: &[CurvePoint],
    batch: &[CurvePoint],
) -> StorageResult<MergeOutcome> {
    let (candidates, in_batch_duplicates) = dedupe_batch(family, batch)?;

    let mut stored: BTreeMap<(Date, Tenor), f64> = BTreeMap::new();
    for row in existing {
        match stored.entry(row.key()) {
            Entry::Vacant(slot) => {
                slot.insert(row.rate);
            }
            Entry::Occupied(_) => warn!(
                family = %family,
                date = %row.as_of_date,
                tenor = %row.tenor,
                "Stored data repeats a key, keeping the first row"
            ),
        }
    }

    let mut report = MergeReport::empty(family);
    report.in_batch_duplicates = in_batch_duplicates;
    let mut inserted = Vec::new();

    for ((date, tenor), rate) in candidates {
        match stored.get(&(date, tenor)) {
            Some(&current) => {
                report.skipped_duplicates += 1;
                if !rates_match(current, rate) {
                    report.revised_ignored += 1;
                    warn!(
                        family = %family,
                        date = %date,
                        tenor = %tenor,
                        stored = current,
                        revised = rate,
                        "Ignoring revised rate for an existing row"
                    );
                }
            }
            None => {
                stored.insert((date, tenor), rate);
                inserted.push(CurvePoint {
                    as_of_date: date,
                    tenor,
                    rate,
                });
            }
        }
    }

    let rows: Vec<CurvePoint> = stored
        .into_iter()
        .map(|((as_of_date, tenor), rate)| CurvePoint {
            as_of_date,
            tenor,
            rate,
        })
        .collect();
    verify_ordering(family, &rows)?;

    report.inserted = inserted.len();
    report.total_rows = rows.len();
    debug!(%report, "Merged batch");

    Ok(MergeOutcome {
        rows,
        inserted,
        report,
    })
}

/// Verifies rows are strictly increasing by `(date, tenor)`.
///
/// # Errors
///
/// Returns `StorageError::OrderingViolation` at the first offending row.
pub fn verify_ordering(family: CurveFamily, rows: &[CurvePoint]) -> StorageResult<()> {
    for (index, pair) in rows.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.key() >= next.key() {
            let reason = if prev.key() == next.key() {
                format!("duplicate key ({}, {})", next.as_of_date, next.tenor)
            } else {
                format!(
                    "({}, {}) follows ({}, {})",
                    next.as_of_date, next.tenor, prev.as_of_date, prev.tenor
                )
            };
            return Err(StorageError::OrderingViolation {
                family,
                index: index + 1,
                reason,
            });
        }
    }
    Ok(())
}

/// Returns true if rows are already strictly ordered.
#[must_use]
pub fn is_canonical(rows: &[CurvePoint]) -> bool {
    rows.windows(2).all(|pair| pair[0].key() < pair[1].key())
}
