//! Row model and column contract for the invite request sheet

use serde::{Deserialize, Serialize};

use crate::store::{ColumnSpan, Grid};

/// Fixed column positions (zero-based)
pub mod columns {
    /// Email address, the identity used for duplicate detection and lookups
    pub const KEY: usize = 3;
    /// Status flag; empty means the request is still new
    pub const STATUS: usize = 9;
    /// Free-text timestamp set together with the status
    pub const STATUS_TIMESTAMP: usize = 10;

    /// Rows shorter than this carry no key
    pub const MIN_IDENTITY_FIELDS: usize = KEY + 1;
    /// Width a row is padded to before the engine rewrites it (A..K)
    pub const REWRITE_WIDTH: usize = STATUS_TIMESTAMP + 1;
}

/// Status written to rows whose email already appeared earlier in the sheet
pub const DUPLICATE_STATUS: &str = "Duplicate";

/// Columns read when listing outstanding requests (A:J)
pub const LISTING_SPAN: ColumnSpan = ColumnSpan::new(0, columns::STATUS);
/// Columns read by reconciliation passes (A:K)
pub const RECONCILE_SPAN: ColumnSpan = ColumnSpan::new(0, columns::STATUS_TIMESTAMP);

/// One request row as fetched, addressed by its position in the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    fields: Vec<String>,
}

impl Row {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field at `index`, absent fields read as empty
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// Dedup key (email). `None` when the row is too short to have one.
    /// Compared verbatim: no trimming, no case folding.
    pub fn key(&self) -> Option<&str> {
        if self.fields.len() < columns::MIN_IDENTITY_FIELDS {
            return None;
        }
        Some(&self.fields[columns::KEY])
    }

    pub fn status(&self) -> &str {
        self.field(columns::STATUS)
    }

    pub fn status_timestamp(&self) -> &str {
        self.field(columns::STATUS_TIMESTAMP)
    }

    /// A row is new/unprocessed while its status column is absent or empty
    pub fn is_unprocessed(&self) -> bool {
        self.status().is_empty()
    }

    pub fn is_duplicate(&self) -> bool {
        self.status() == DUPLICATE_STATUS
    }

    /// Copy of the fields padded with empty strings to at least `width`
    pub fn padded(&self, width: usize) -> Vec<String> {
        pad_fields(&self.fields, width)
    }

    /// The A..K rewrite of this row with a new status and timestamp.
    /// Passenger fields are kept as-is; fields past K are not part of the
    /// result and stay untouched in the store.
    pub fn rewritten_with_status(&self, status: &str, timestamp: &str) -> Vec<String> {
        let mut values = self.padded(columns::REWRITE_WIDTH);
        values.truncate(columns::REWRITE_WIDTH);
        values[columns::STATUS] = status.to_string();
        values[columns::STATUS_TIMESTAMP] = timestamp.to_string();
        values
    }
}

/// Pad `fields` with empty strings up to `width`; longer input is kept whole
pub fn pad_fields(fields: &[String], width: usize) -> Vec<String> {
    let mut padded = fields.to_vec();
    if padded.len() < width {
        padded.resize(width, String::new());
    }
    padded
}

/// Full snapshot of the sheet for one operation
pub type Table = Vec<Row>;

pub fn table_from_grid(grid: Grid) -> Table {
    grid.into_iter().map(Row::new).collect()
}

/// Outstanding invite request as shown to reviewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub name: String,
    pub role: String,
    pub email: String,
    pub company: String,
    pub years_experience: String,
    pub reasons: String,
    pub source: String,
}

impl Invite {
    /// Minimum fields (A..I) a row needs to be shown as an invite
    pub const MIN_FIELDS: usize = 9;

    /// Build the invite view of a row; `None` for rows too short to list
    pub fn from_row(row: &Row) -> Option<Self> {
        if row.fields().len() < Self::MIN_FIELDS {
            return None;
        }
        Some(Self {
            name: row.field(1).to_string(),
            role: row.field(2).to_string(),
            email: row.field(columns::KEY).to_string(),
            company: row.field(5).to_string(),
            years_experience: row.field(6).to_string(),
            reasons: row.field(7).to_string(),
            source: row.field(8).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Row {
        Row::new(fields.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_key_requires_four_fields() {
        assert_eq!(row(&["a", "b", "c"]).key(), None);
        assert_eq!(row(&["a", "b", "c", "x@example.com"]).key(), Some("x@example.com"));
        assert_eq!(row(&["a", "b", "c", ""]).key(), Some(""));
    }

    #[test]
    fn test_key_is_verbatim() {
        let r = row(&["", "", "", " Test@Example.com "]);
        assert_eq!(r.key(), Some(" Test@Example.com "));
    }

    #[test]
    fn test_missing_status_is_unprocessed() {
        assert!(row(&["a"]).is_unprocessed());
        assert!(row(&["", "", "", "", "", "", "", "", "", ""]).is_unprocessed());
        assert!(!row(&["", "", "", "", "", "", "", "", "", "sent"]).is_unprocessed());
        assert!(row(&["", "", "", "", "", "", "", "", "", "Duplicate"]).is_duplicate());
    }

    #[test]
    fn test_pad_fields() {
        let fields = vec!["a".to_string()];
        assert_eq!(pad_fields(&fields, 3), vec!["a", "", ""]);
        assert_eq!(pad_fields(&fields, 0), vec!["a"]);
    }

    #[test]
    fn test_rewrite_pads_and_preserves_passengers() {
        let r = row(&["ts", "Ann", "Dev", "ann@x.com", "", "Acme"]);
        let values = r.rewritten_with_status("Duplicate", "2024-02-14 12:00:00");

        assert_eq!(values.len(), 11);
        assert_eq!(&values[..6], &["ts", "Ann", "Dev", "ann@x.com", "", "Acme"]);
        assert_eq!(&values[6..9], &["", "", ""]);
        assert_eq!(values[9], "Duplicate");
        assert_eq!(values[10], "2024-02-14 12:00:00");
    }

    #[test]
    fn test_rewrite_stops_at_column_k() {
        let mut fields: Vec<&str> = vec!["x"; 9];
        fields.extend(["old", "old-ts", "notes"]);
        let values = row(&fields).rewritten_with_status("sent", "now");

        assert_eq!(values.len(), 11);
        assert_eq!(values[9], "sent");
        assert_eq!(values[10], "now");
    }

    #[test]
    fn test_invite_from_row() {
        let r = row(&[
            "2024-01-01", "Ann", "Engineer", "ann@x.com", "", "Acme", "5", "Learning", "Friend",
        ]);
        let invite = Invite::from_row(&r).unwrap();

        assert_eq!(invite.name, "Ann");
        assert_eq!(invite.role, "Engineer");
        assert_eq!(invite.email, "ann@x.com");
        assert_eq!(invite.company, "Acme");
        assert_eq!(invite.years_experience, "5");
        assert_eq!(invite.reasons, "Learning");
        assert_eq!(invite.source, "Friend");

        let json = serde_json::to_value(&invite).unwrap();
        assert_eq!(json["yearsExperience"], "5");
    }

    #[test]
    fn test_short_row_is_not_an_invite() {
        assert!(Invite::from_row(&row(&["a", "b", "c", "d@x.com"])).is_none());
    }
}
