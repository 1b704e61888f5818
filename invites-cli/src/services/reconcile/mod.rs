// Invite reconciliation service
//
// Fetches a fresh snapshot for every call, decides in memory, and applies at
// most one batch of writes. Holds no state between calls besides the store
// handle, so independent calls may run concurrently. There is no
// compare-and-swap against the sheet: if two passes race, the later batch
// wins on overlapping cells.

pub mod core;
pub mod models;
pub mod planner;

pub use models::{DUPLICATE_STATUS, Invite, Row, Table};
pub use planner::RowEdit;

use log::info;

use crate::store::{CellRegionWrite, SheetHandle, SheetRange, StoreResult, TabularStore};
use models::{LISTING_SPAN, RECONCILE_SPAN, table_from_grid};

/// Reconciliation operations over one sheet of a store
pub struct InviteService<S> {
    store: S,
    sheet_name: String,
}

impl<S: TabularStore> InviteService<S> {
    pub fn new(store: S, sheet_name: impl Into<String>) -> Self {
        Self {
            store,
            sheet_name: sheet_name.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn fetch(&self, range: SheetRange) -> StoreResult<Table> {
        let grid = self.store.fetch_range(&range).await?;
        Ok(table_from_grid(grid))
    }

    /// Outstanding rows (status column empty), read from columns A:J
    pub async fn get_sheet_data(&self) -> StoreResult<Table> {
        let table = self
            .fetch(SheetRange::new(&self.sheet_name, LISTING_SPAN))
            .await?;
        Ok(core::filter_unprocessed(table))
    }

    /// Outstanding rows that carry enough columns to show as invites
    pub async fn get_outstanding_invites(&self) -> StoreResult<Vec<Invite>> {
        let rows = self.get_sheet_data().await?;
        Ok(rows.iter().filter_map(Invite::from_row).collect())
    }

    /// Number of new (unprocessed) requests
    pub async fn get_new_invites(&self) -> StoreResult<usize> {
        let table = self
            .fetch(SheetRange::new(&self.sheet_name, RECONCILE_SPAN))
            .await?;
        Ok(core::count_new(&table))
    }

    /// Writes a duplicate pass would apply, without applying them.
    ///
    /// The plan reflects the sheet as fetched. Applying it later overwrites
    /// whatever another writer put in the same cells meanwhile.
    pub async fn plan_duplicate_requests(
        &self,
        timestamp: &str,
    ) -> StoreResult<Vec<CellRegionWrite>> {
        let table = self
            .fetch(SheetRange::new(&self.sheet_name, RECONCILE_SPAN))
            .await?;
        Ok(core::mark_duplicates(&table, timestamp))
    }

    /// Writes a status update would apply, without applying them
    pub async fn plan_invite_status(
        &self,
        emails: &[String],
        status: &str,
        timestamp: &str,
    ) -> StoreResult<Vec<CellRegionWrite>> {
        let table = self
            .fetch(SheetRange::new(&self.sheet_name, RECONCILE_SPAN))
            .await?;
        Ok(core::apply_status(&table, emails, status, timestamp))
    }

    /// Mark repeated emails as `Duplicate`. Returns the number of rows written.
    pub async fn update_duplicate_requests(&self, timestamp: &str) -> StoreResult<usize> {
        let sheet = self.store.resolve_sheet_id(&self.sheet_name).await?;
        let writes = self.plan_duplicate_requests(timestamp).await?;
        self.apply(sheet, writes, "duplicate").await
    }

    /// Set `status` and `timestamp` on the rows for `emails`. Unknown emails
    /// are ignored. Returns the number of rows written.
    pub async fn update_invite_status(
        &self,
        emails: &[String],
        status: &str,
        timestamp: &str,
    ) -> StoreResult<usize> {
        let sheet = self.store.resolve_sheet_id(&self.sheet_name).await?;
        let writes = self.plan_invite_status(emails, status, timestamp).await?;
        self.apply(sheet, writes, "status").await
    }

    async fn apply(
        &self,
        sheet: SheetHandle,
        writes: Vec<CellRegionWrite>,
        pass: &str,
    ) -> StoreResult<usize> {
        if writes.is_empty() {
            info!("{} pass: nothing to write", pass);
            return Ok(0);
        }

        info!(
            "{} pass: writing {} row(s) {:?}",
            pass,
            writes.len(),
            core::touched_rows(&writes)
                .iter()
                .map(|r| r + 1)
                .collect::<Vec<_>>()
        );
        self.store.apply_batch(sheet, &writes).await?;
        Ok(writes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Grid, MemoryStore, StoreError};

    const TS: &str = "2024-02-14 12:00:00";

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn service(rows: &[&[&str]]) -> InviteService<MemoryStore> {
        InviteService::new(MemoryStore::new("Sheet1", grid(rows)), "Sheet1")
    }

    #[tokio::test]
    async fn test_get_sheet_data_filters_processed() {
        let svc = service(&[
            &["A1", "B1", "C1", "D1", "E1", "F1", "G1", "H1", "I1", ""],
            &["A2", "B2", "C2", "D2", "E2", "F2", "G2", "H2", "I2", "done"],
            &["A3", "B3", "C3", "D3", "E3", "F3", "G3", "H3", "I3"],
            &["A4", "B4", "C4", "D4", "E4", "F4", "G4", "H4", "I4", ""],
        ]);

        let rows = svc.get_sheet_data().await.unwrap();

        let firsts: Vec<&str> = rows.iter().map(|r| r.field(0)).collect();
        assert_eq!(firsts, vec!["A1", "A3", "A4"]);
    }

    #[tokio::test]
    async fn test_get_sheet_data_reads_a_to_j_only() {
        let svc = service(&[&["A1", "", "", "D1", "", "", "", "", "", "", "stale-ts", "notes"]]);

        let rows = svc.get_sheet_data().await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields(), &["A1", "", "", "D1"]);
    }

    #[tokio::test]
    async fn test_empty_sheet() {
        let svc = service(&[]);
        assert!(svc.get_sheet_data().await.unwrap().is_empty());
        assert_eq!(svc.get_new_invites().await.unwrap(), 0);
        assert_eq!(svc.update_duplicate_requests(TS).await.unwrap(), 0);
        assert_eq!(svc.store().batch_count(), 0);
    }

    #[tokio::test]
    async fn test_outstanding_invites_skip_short_rows() {
        let svc = service(&[
            &["t", "Ann", "Dev", "ann@x.com", "", "Acme", "3", "Why", "Web"],
            &["t", "Bob"],
            &["t", "Cy", "Ops", "cy@x.com", "", "Co", "1", "Fun", "Ad", "sent"],
        ]);

        let invites = svc.get_outstanding_invites().await.unwrap();

        assert_eq!(invites.len(), 1);
        assert_eq!(invites[0].email, "ann@x.com");
    }

    #[tokio::test]
    async fn test_get_new_invites() {
        let svc = service(&[
            &["1", "2", "3", "test1@example.com", "5", "6", "7", "8", "9", "", ""],
            &["1", "2", "3", "test2@example.com", "5", "6", "7", "8", "9", "", ""],
            &["1", "2", "3", "test3@example.com", "5", "6", "7", "8", "9", "Processed", ""],
        ]);
        assert_eq!(svc.get_new_invites().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_pass_writes_one_batch() {
        let svc = service(&[
            &["", "", "", "dup@x.com", "", "", "", "", "", "", ""],
            &["", "", "", "dup@x.com", "", "", "", "", "", "", ""],
        ]);

        let written = svc.update_duplicate_requests(TS).await.unwrap();

        assert_eq!(written, 1);
        assert_eq!(svc.store().batch_count(), 1);
        let rows = svc.store().rows();
        assert_eq!(rows[0][3], "dup@x.com");
        assert_eq!(rows[0][9], "");
        assert_eq!(&rows[1][9..11], &["Duplicate", TS]);
    }

    #[tokio::test]
    async fn test_duplicate_pass_preserves_passengers() {
        let svc = service(&[
            &["t1", "Ann", "Dev", "a@example.com", "x", "Acme", "4", "Why", "Web"],
            &["t2", "Ann B", "Lead", "a@example.com", "y", "Acme 2", "5", "Because", "Ad"],
        ]);

        svc.update_duplicate_requests(TS).await.unwrap();

        let rows = svc.store().rows();
        assert_eq!(
            rows[1],
            vec![
                "t2", "Ann B", "Lead", "a@example.com", "y", "Acme 2", "5", "Because", "Ad",
                "Duplicate", TS
            ]
        );
        assert_eq!(rows[0].len(), 9);
    }

    #[tokio::test]
    async fn test_duplicate_pass_twice_writes_once() {
        let e = "a@example.com";
        let svc = service(&[
            &["1", "2", "3", e, "5", "6", "7", "8", "9"],
            &["1", "2", "3", e, "5", "6", "7", "8", "9"],
            &["1", "2", "3", e, "5", "6", "7", "8", "9"],
        ]);

        assert_eq!(svc.update_duplicate_requests(TS).await.unwrap(), 2);
        assert_eq!(
            svc.update_duplicate_requests("2024-03-01 08:00:00")
                .await
                .unwrap(),
            0
        );
        assert_eq!(svc.store().batch_count(), 1);
        assert_eq!(svc.store().rows()[2][10], TS);
    }

    #[tokio::test]
    async fn test_no_duplicates_no_batch() {
        let svc = service(&[
            &["1", "2", "3", "test1@example.com"],
            &["1", "2", "3", "test2@example.com"],
        ]);

        assert_eq!(svc.update_duplicate_requests(TS).await.unwrap(), 0);
        assert_eq!(svc.store().batch_count(), 0);
    }

    #[tokio::test]
    async fn test_update_invite_status() {
        let svc = service(&[
            &["1", "2", "3", "w@example.com", "5", "6", "7", "8", "9"],
            &["1", "2", "3", "x@example.com", "5", "6", "7", "8", "9", "", "", "keep"],
        ]);

        let emails = vec!["x@example.com".to_string(), "ghost@example.com".to_string()];
        let written = svc.update_invite_status(&emails, "sent", TS).await.unwrap();

        assert_eq!(written, 1);
        let batches = svc.store().batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, SheetHandle(0));
        assert_eq!(batches[0].1[0].range.start_column, 9);
        assert_eq!(batches[0].1[0].range.end_column, 11);

        let rows = svc.store().rows();
        assert_eq!(&rows[1][9..], &["sent", TS, "keep"]);
        assert_eq!(rows[0].len(), 9);
    }

    #[tokio::test]
    async fn test_batch_targets_resolved_sheet() {
        let store = MemoryStore::new("Sheet1", grid(&[&["1", "2", "3", "x@example.com"]]))
            .with_sheet("Form Responses 1", SheetHandle(918273));
        let svc = InviteService::new(store, "Form Responses 1");

        svc.update_invite_status(&["x@example.com".to_string()], "sent", TS)
            .await
            .unwrap();

        assert_eq!(svc.store().batches()[0].0, SheetHandle(918273));
    }

    #[tokio::test]
    async fn test_unknown_emails_no_batch() {
        let svc = service(&[&["1", "2", "3", "w@example.com"]]);
        let emails = vec!["nobody@example.com".to_string()];

        assert_eq!(svc.update_invite_status(&emails, "sent", TS).await.unwrap(), 0);
        assert_eq!(svc.store().batch_count(), 0);
    }

    #[tokio::test]
    async fn test_status_then_count() {
        let svc = service(&[
            &["1", "2", "3", "a@x.com"],
            &["1", "2", "3", "b@x.com"],
        ]);
        assert_eq!(svc.get_new_invites().await.unwrap(), 2);

        svc.update_invite_status(&["a@x.com".to_string()], "denied", TS)
            .await
            .unwrap();

        assert_eq!(svc.get_new_invites().await.unwrap(), 1);
        assert_eq!(svc.get_sheet_data().await.unwrap()[0].key(), Some("b@x.com"));
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces() {
        let svc = service(&[&["1", "2", "3", "a@x.com"]]);
        svc.store().set_fail_fetch(true);

        let err = svc.get_new_invites().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
        assert!(svc.update_duplicate_requests(TS).await.is_err());
        assert_eq!(svc.store().batch_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_failure_surfaces() {
        let svc = service(&[&["1", "2", "3", "a@x.com"], &["1", "2", "3", "a@x.com"]]);
        svc.store().set_fail_apply(true);

        let err = svc.update_duplicate_requests(TS).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Unavailable {
                operation: "apply_batch",
                ..
            }
        ));
        assert_eq!(svc.store().rows()[1].len(), 4);
    }

    #[tokio::test]
    async fn test_missing_sheet_fails_before_fetch() {
        let store = MemoryStore::new("Sheet1", grid(&[&["1", "2", "3", "a@x.com"]]));
        let svc = InviteService::new(store, "Responses");

        let err = svc.update_duplicate_requests(TS).await.unwrap_err();

        assert!(matches!(err, StoreError::SheetNotFound(_)));
        assert_eq!(svc.store().fetch_count(), 0);
        assert_eq!(svc.store().batch_count(), 0);
    }

    #[tokio::test]
    async fn test_plan_does_not_write() {
        let svc = service(&[&["1", "2", "3", "a@x.com"], &["1", "2", "3", "a@x.com"]]);

        let writes = svc.plan_duplicate_requests(TS).await.unwrap();

        assert_eq!(writes.len(), 1);
        assert_eq!(svc.store().batch_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_plan_overwrites_external_status() {
        let svc = service(&[
            &["1", "2", "3", "dup@x.com"],
            &["1", "2", "3", "dup@x.com"],
        ]);
        let sheet = svc.store().resolve_sheet_id("Sheet1").await.unwrap();

        // Snapshot taken before anyone else touches the sheet
        let plan = svc.plan_duplicate_requests("T1").await.unwrap();

        // A reviewer invites row 2 between our fetch and our write
        let external = CellRegionWrite::row(1, 9, vec!["Invited".to_string(), "T0".to_string()]);
        svc.store().apply_batch(sheet, &[external]).await.unwrap();
        assert_eq!(&svc.store().rows()[1][9..11], &["Invited", "T0"]);

        svc.store().apply_batch(sheet, &plan).await.unwrap();

        // No conflict check: the later batch wins on the overlapping cells
        assert_eq!(&svc.store().rows()[1][9..11], &["Duplicate", "T1"]);
        assert_eq!(svc.store().batch_count(), 2);
    }

    #[tokio::test]
    async fn test_shared_service_across_tasks() {
        let svc = std::sync::Arc::new(service(&[
            &["1", "2", "3", "a@x.com"],
            &["1", "2", "3", "b@x.com"],
        ]));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.get_new_invites().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 2);
        }
    }
}
