//! Google endpoints and client constants

/// Sheets REST API root
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// OAuth token endpoint used when a credentials file does not name one
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh access tokens this many seconds before they expire
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

/// Assumed lifetime when the token endpoint omits `expires_in`
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Only these properties are needed to resolve a sheet title
pub const SHEET_PROPERTIES_FIELDS: &str = "sheets.properties(sheetId,title)";

/// Cells are written as user-entered strings
pub const UPDATE_CELLS_FIELDS: &str = "userEnteredValue";

pub const USER_AGENT: &str = concat!("invites-cli/", env!("CARGO_PKG_VERSION"));
