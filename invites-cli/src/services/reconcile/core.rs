//! Core reconciliation functions
//!
//! Everything here is a pure function of a fetched [`Table`]: no store access,
//! no clock. Callers supply the timestamp so results are deterministic.

use log::debug;
use std::collections::{HashMap, HashSet};

use super::models::{DUPLICATE_STATUS, Row, Table};
use super::planner::{RowEdit, plan_writes};
use crate::store::CellRegionWrite;

/// Rows still waiting for a decision, in table order
pub fn filter_unprocessed(table: Table) -> Table {
    table.into_iter().filter(Row::is_unprocessed).collect()
}

/// Number of rows whose status column is absent or empty
pub fn count_new(table: &[Row]) -> usize {
    table.iter().filter(|row| row.is_unprocessed()).count()
}

/// Stage whole-row rewrites marking repeated emails as duplicates.
///
/// The first row carrying an email is canonical and never written. A later
/// row with the same email is marked when either the canonical row or the
/// later row itself still has an empty status. Both checks read the fetched
/// snapshot, never an edit staged earlier in the same pass. Rows already
/// marked `Duplicate` are left alone so repeated passes stage nothing new.
pub fn mark_duplicates(table: &[Row], timestamp: &str) -> Vec<CellRegionWrite> {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut edits = Vec::new();

    for (position, row) in table.iter().enumerate() {
        let Some(key) = row.key() else {
            debug!("row {} has no email column, skipping", position + 1);
            continue;
        };

        let Some(&first) = first_seen.get(key) else {
            first_seen.insert(key, position);
            continue;
        };

        if row.is_duplicate() {
            continue;
        }

        if table[first].is_unprocessed() || row.is_unprocessed() {
            debug!(
                "row {} repeats email from row {}, marking duplicate",
                position + 1,
                first + 1
            );
            edits.push(RowEdit::Rewrite {
                row: position,
                values: row.rewritten_with_status(DUPLICATE_STATUS, timestamp),
            });
        }
    }

    plan_writes(edits)
}

/// Map each email to the position of its last occurrence
pub fn index_keys_last_wins(table: &[Row]) -> HashMap<&str, usize> {
    let mut index = HashMap::new();
    for (position, row) in table.iter().enumerate() {
        if let Some(key) = row.key() {
            index.insert(key, position);
        }
    }
    index
}

/// Stage status/timestamp writes (columns J..K only) for the requested emails.
///
/// Emails are matched verbatim against the last row carrying them. Unknown
/// emails are skipped, and an email requested twice is written once.
pub fn apply_status(
    table: &[Row],
    keys: &[String],
    status: &str,
    timestamp: &str,
) -> Vec<CellRegionWrite> {
    let index = index_keys_last_wins(table);
    let mut requested = HashSet::new();
    let mut edits = Vec::new();

    for key in keys {
        if !requested.insert(key.as_str()) {
            continue;
        }
        match index.get(key.as_str()) {
            Some(&row) => {
                let current = &table[row];
                debug!(
                    "row {}: status {:?} ({:?}) -> {:?}",
                    row + 1,
                    current.status(),
                    current.status_timestamp(),
                    status
                );
                edits.push(RowEdit::SetStatus {
                    row,
                    status: status.to_string(),
                    timestamp: timestamp.to_string(),
                });
            }
            None => debug!("no row for email {:?}, skipping", key),
        }
    }

    plan_writes(edits)
}

/// Row positions touched by a set of writes, for logging and summaries
pub fn touched_rows(writes: &[CellRegionWrite]) -> Vec<usize> {
    writes.iter().map(|w| w.range.start_row).collect()
}
