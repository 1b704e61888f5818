//! Batch update planner
//!
//! Turns logical row edits into coordinate-addressed cell writes. Bounds are
//! computed from the row position and the column contract alone, so planning
//! never touches the store.

use super::models::columns;
use crate::store::CellRegionWrite;

/// A logical change to one row of the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEdit {
    /// Overwrite columns A..K with the given values (passengers included)
    Rewrite {
        /// Row position in the fetched table
        row: usize,
        /// Exactly `REWRITE_WIDTH` values
        values: Vec<String>,
    },
    /// Overwrite only the status and timestamp columns (J..K)
    SetStatus {
        row: usize,
        status: String,
        timestamp: String,
    },
}

impl RowEdit {
    /// Convert this edit into a single-row write
    pub fn into_write(self) -> CellRegionWrite {
        match self {
            Self::Rewrite { row, values } => CellRegionWrite::row(row, 0, values),
            Self::SetStatus {
                row,
                status,
                timestamp,
            } => CellRegionWrite::row(row, columns::STATUS, vec![status, timestamp]),
        }
    }
}

/// Plan the writes for one pass, one write per edit, in edit order
pub fn plan_writes(edits: impl IntoIterator<Item = RowEdit>) -> Vec<CellRegionWrite> {
    edits.into_iter().map(RowEdit::into_write).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_covers_a_to_k() {
        let values: Vec<String> = (0..11).map(|i| i.to_string()).collect();
        let write = RowEdit::Rewrite {
            row: 7,
            values: values.clone(),
        }
        .into_write();

        assert_eq!(write.range.start_row, 7);
        assert_eq!(write.range.end_row, 8);
        assert_eq!(write.range.start_column, 0);
        assert_eq!(write.range.end_column, 11);
        assert_eq!(write.values, vec![values]);
    }

    #[test]
    fn test_status_edit_covers_j_to_k() {
        let write = RowEdit::SetStatus {
            row: 2,
            status: "sent".to_string(),
            timestamp: "2024-02-14 12:00:00".to_string(),
        }
        .into_write();

        assert_eq!(write.range.start_row, 2);
        assert_eq!(write.range.end_row, 3);
        assert_eq!(write.range.start_column, 9);
        assert_eq!(write.range.end_column, 11);
        assert_eq!(write.values, vec![vec!["sent", "2024-02-14 12:00:00"]]);
        assert!(write.is_well_formed());
    }

    #[test]
    fn test_plan_keeps_edit_order() {
        let edits = vec![
            RowEdit::SetStatus {
                row: 5,
                status: "denied".into(),
                timestamp: "t".into(),
            },
            RowEdit::SetStatus {
                row: 1,
                status: "denied".into(),
                timestamp: "t".into(),
            },
        ];
        let writes = plan_writes(edits);

        let rows: Vec<usize> = writes.iter().map(|w| w.range.start_row).collect();
        assert_eq!(rows, vec![5, 1]);
    }

    #[test]
    fn test_empty_plan() {
        assert!(plan_writes(Vec::new()).is_empty());
    }
}
