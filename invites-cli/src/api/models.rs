//! Sheets API and OAuth wire types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::constants::{DEFAULT_TOKEN_LIFETIME_SECS, TOKEN_EXPIRY_SKEW_SECS, UPDATE_CELLS_FIELDS};
use crate::store::{CellRegionWrite, Grid, SheetHandle};

/// Response of `spreadsheets.values.get`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub major_dimension: Option<String>,
    /// Omitted entirely by the API when the range is empty
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ValueRange {
    /// Render every cell as a string. Formatted reads already return
    /// strings; anything else is rendered the way the sheet would show it.
    pub fn into_grid(self) -> Grid {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect()
    }
}

fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Subset of `spreadsheets.get` needed to resolve sheet titles
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Spreadsheet {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sheet {
    pub properties: Option<SheetProperties>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    /// The API omits `sheetId` for the first sheet when it is 0
    #[serde(default)]
    pub sheet_id: i64,
    #[serde(default)]
    pub title: String,
}

impl Spreadsheet {
    /// Handle of the sheet whose title matches exactly
    pub fn find_sheet(&self, title: &str) -> Option<SheetHandle> {
        self.sheets
            .iter()
            .filter_map(|sheet| sheet.properties.as_ref())
            .find(|props| props.title == title)
            .map(|props| SheetHandle(props.sheet_id))
    }
}

/// Body of `spreadsheets.batchUpdate`
#[derive(Debug, Clone, Serialize)]
pub struct BatchUpdateSpreadsheetRequest {
    pub requests: Vec<Request>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub update_cells: UpdateCellsRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateCellsRequest {
    pub range: GridRange,
    pub rows: Vec<RowData>,
    pub fields: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub sheet_id: i64,
    pub start_row_index: usize,
    pub end_row_index: usize,
    pub start_column_index: usize,
    pub end_column_index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowData {
    pub values: Vec<CellData>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub user_entered_value: ExtendedValue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedValue {
    pub string_value: String,
}

impl BatchUpdateSpreadsheetRequest {
    /// One `updateCells` request per planned write, in plan order
    pub fn from_writes(sheet: SheetHandle, writes: &[CellRegionWrite]) -> Self {
        let requests = writes
            .iter()
            .map(|write| Request {
                update_cells: UpdateCellsRequest {
                    range: GridRange {
                        sheet_id: sheet.0,
                        start_row_index: write.range.start_row,
                        end_row_index: write.range.end_row,
                        start_column_index: write.range.start_column,
                        end_column_index: write.range.end_column,
                    },
                    rows: write
                        .values
                        .iter()
                        .map(|row| RowData {
                            values: row
                                .iter()
                                .map(|value| CellData {
                                    user_entered_value: ExtendedValue {
                                        string_value: value.clone(),
                                    },
                                })
                                .collect(),
                        })
                        .collect(),
                    fields: UPDATE_CELLS_FIELDS.to_string(),
                },
            })
            .collect();

        Self { requests }
    }
}

/// Google API error envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// Best-effort summary of an error response body
pub fn describe_error_body(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => {
            if parsed.error.status.is_empty() {
                format!("HTTP {}: {}", status, parsed.error.message)
            } else {
                format!(
                    "HTTP {} {}: {}",
                    status, parsed.error.status, parsed.error.message
                )
            }
        }
        _ if body.trim().is_empty() => format!("HTTP {}", status),
        _ => format!("HTTP {}: {}", status, body.trim()),
    }
}

/// Response of the OAuth token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// OAuth error response (`invalid_grant` and friends)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Cached access token
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenInfo {
    /// Out-of-range or missing `expires_in` falls back to the default lifetime
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        let expires_at = response
            .expires_in
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or_else(|| now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
        Self {
            access_token: response.access_token,
            expires_at,
        }
    }

    /// True once the token is within the refresh margin of its expiry
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_EXPIRY_SKEW_SECS) >= self.expires_at
    }
}
