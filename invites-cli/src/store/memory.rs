//! In-memory store used by tests and offline runs
//!
//! Behaves like the Sheets values API where it matters to the engine: reads
//! are clipped to the requested column span, trailing empty cells and
//! trailing empty rows are dropped, and every applied batch is recorded.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{
    CellRegionWrite, Grid, SheetHandle, SheetRange, StoreError, StoreResult, TabularStore,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: Vec<(String, SheetHandle)>,
    rows: Mutex<Grid>,
    batches: Mutex<Vec<(SheetHandle, Vec<CellRegionWrite>)>>,
    fetch_calls: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_apply: AtomicBool,
}

impl MemoryStore {
    /// Store holding a single sheet with handle 0
    pub fn new(sheet_name: impl Into<String>, rows: Grid) -> Self {
        Self {
            sheets: vec![(sheet_name.into(), SheetHandle(0))],
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    /// Register another sheet title. Reads and writes still target the one grid.
    pub fn with_sheet(mut self, sheet_name: impl Into<String>, handle: SheetHandle) -> Self {
        self.sheets.push((sheet_name.into(), handle));
        self
    }

    /// Make every subsequent fetch fail with `Unavailable`
    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent batch fail with `Unavailable`
    pub fn set_fail_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }

    /// Current contents of the grid, untrimmed
    pub fn rows(&self) -> Grid {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Every batch applied so far, in order
    pub fn batches(&self) -> Vec<(SheetHandle, Vec<CellRegionWrite>)> {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

/// Clip a row to `[first, last]` and drop trailing empty cells
fn clip_row(row: &[String], first: usize, last: usize) -> Vec<String> {
    let mut clipped: Vec<String> = row
        .iter()
        .skip(first)
        .take(last + 1 - first)
        .cloned()
        .collect();
    while clipped.last().is_some_and(|cell| cell.is_empty()) {
        clipped.pop();
    }
    clipped
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn fetch_range(&self, range: &SheetRange) -> StoreResult<Grid> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("fetch_range", "simulated outage"));
        }
        if !self.sheets.iter().any(|(name, _)| *name == range.sheet_name) {
            return Err(StoreError::unavailable(
                "fetch_range",
                format!("Unable to parse range: {}", range.to_a1()),
            ));
        }

        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let mut grid: Grid = rows
            .iter()
            .map(|row| clip_row(row, range.columns.first, range.columns.last))
            .collect();
        while grid.last().is_some_and(|row| row.is_empty()) {
            grid.pop();
        }
        Ok(grid)
    }

    async fn resolve_sheet_id(&self, sheet_name: &str) -> StoreResult<SheetHandle> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("resolve_sheet_id", "simulated outage"));
        }
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, handle)| *handle)
            .ok_or_else(|| StoreError::SheetNotFound(sheet_name.to_string()))
    }

    async fn apply_batch(
        &self,
        sheet: SheetHandle,
        writes: &[CellRegionWrite],
    ) -> StoreResult<()> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("apply_batch", "simulated outage"));
        }
        if !self.sheets.iter().any(|(_, handle)| *handle == sheet) {
            return Err(StoreError::unavailable(
                "apply_batch",
                format!("No grid with id: {}", sheet.0),
            ));
        }
        if let Some(bad) = writes.iter().find(|w| !w.is_well_formed()) {
            return Err(StoreError::unavailable(
                "apply_batch",
                format!("values do not fill range {:?}", bad.range),
            ));
        }

        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        for write in writes {
            for (offset, values) in write.values.iter().enumerate() {
                let row_index = write.range.start_row + offset;
                if rows.len() <= row_index {
                    rows.resize(row_index + 1, Vec::new());
                }
                let row = &mut rows[row_index];
                if row.len() < write.range.end_column {
                    row.resize(write.range.end_column, String::new());
                }
                for (col_offset, value) in values.iter().enumerate() {
                    row[write.range.start_column + col_offset] = value.clone();
                }
            }
        }
        drop(rows);

        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((sheet, writes.to_vec()));
        Ok(())
    }
}
