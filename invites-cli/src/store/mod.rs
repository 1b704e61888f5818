//! Tabular store abstraction
//!
//! The reconciliation engine never talks to Google Sheets directly. It reads
//! and writes through [`TabularStore`], a remote grid addressed by sheet name
//! and column span for reads, and by zero-based cell coordinates for writes.
//!
//! There are no transactions behind this trait. A pass fetches a snapshot,
//! computes writes in memory and applies them in one batch; anything another
//! writer changes in between is overwritten (last write wins).

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Raw grid as returned by the store: one sparse field list per row.
/// Trailing empty cells are usually omitted by the store.
pub type Grid = Vec<Vec<String>>;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by a store client
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport, auth, quota or timeout failure, or an undecodable response
    #[error("store unavailable during {operation}: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    /// No sheet with this title exists in the spreadsheet
    #[error("sheet with name '{0}' not found")]
    SheetNotFound(String),
}

impl StoreError {
    pub fn unavailable(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            message: message.into(),
        }
    }
}

/// Opaque numeric sheet identifier required for coordinate writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetHandle(pub i64);

/// Inclusive span of whole columns, e.g. `A:K`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub first: usize,
    pub last: usize,
}

impl ColumnSpan {
    pub const fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }
}

impl fmt::Display for ColumnSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            column_letter(self.first),
            column_letter(self.last)
        )
    }
}

/// A named range: sheet title plus column span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    pub sheet_name: String,
    pub columns: ColumnSpan,
}

impl SheetRange {
    pub fn new(sheet_name: impl Into<String>, columns: ColumnSpan) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            columns,
        }
    }

    /// A1 notation with the sheet title quoted, e.g. `'Form Responses 1'!A:K`
    pub fn to_a1(&self) -> String {
        format!(
            "'{}'!{}",
            self.sheet_name.replace('\'', "''"),
            self.columns
        )
    }
}

/// Zero-based, half-open rectangle of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRange {
    pub start_row: usize,
    pub end_row: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl GridRange {
    pub fn row_count(&self) -> usize {
        self.end_row.saturating_sub(self.start_row)
    }

    pub fn column_count(&self) -> usize {
        self.end_column.saturating_sub(self.start_column)
    }

    /// A1 label of the rectangle, e.g. `J5:K5`. Empty ranges have no label.
    pub fn to_a1(&self) -> Option<String> {
        if self.row_count() == 0 || self.column_count() == 0 {
            return None;
        }
        Some(format!(
            "{}{}:{}{}",
            column_letter(self.start_column),
            self.start_row + 1,
            column_letter(self.end_column - 1),
            self.end_row
        ))
    }
}

/// A planned rectangular overwrite: coordinates plus row-major values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRegionWrite {
    pub range: GridRange,
    pub values: Vec<Vec<String>>,
}

impl CellRegionWrite {
    /// Single-row write starting at `start_column`; the column range is
    /// derived from the number of values.
    pub fn row(row: usize, start_column: usize, values: Vec<String>) -> Self {
        Self {
            range: GridRange {
                start_row: row,
                end_row: row + 1,
                start_column,
                end_column: start_column + values.len(),
            },
            values: vec![values],
        }
    }

    /// True when the values exactly fill the rectangle
    pub fn is_well_formed(&self) -> bool {
        self.values.len() == self.range.row_count()
            && self
                .values
                .iter()
                .all(|row| row.len() == self.range.column_count())
    }
}

/// Remote grid store consumed by the reconciliation engine
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Fetch every row inside the named range. All or nothing.
    async fn fetch_range(&self, range: &SheetRange) -> StoreResult<Grid>;

    /// Map a sheet title to the handle used for coordinate writes
    async fn resolve_sheet_id(&self, sheet_name: &str) -> StoreResult<SheetHandle>;

    /// Apply all writes in one call. Callers never pass an empty slice.
    async fn apply_batch(
        &self,
        sheet: SheetHandle,
        writes: &[CellRegionWrite],
    ) -> StoreResult<()>;
}

/// Spreadsheet column letter for a zero-based index (0 -> A, 26 -> AA)
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
