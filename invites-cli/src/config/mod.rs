//! Runtime configuration
//!
//! Settings come from the process environment (optionally seeded from a
//! `.env` file by `main`). Everything is validated up front; a missing or
//! malformed value is reported as a [`ConfigError`] instead of aborting.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_CREDENTIALS_FILE: &str = "GOOGLE_CREDENTIALS_FILE";
pub const ENV_TOKEN_FILE: &str = "GOOGLE_TOKEN_FILE";
pub const ENV_SPREADSHEET_ID: &str = "GOOGLE_SPREADSHEET_ID";
pub const ENV_SHEET_NAME: &str = "GOOGLE_SHEET_NAME";
pub const ENV_TIMEOUT_SECS: &str = "SHEETS_TIMEOUT_SECS";

/// Default bound on every store request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration problems found at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),

    #[error("{var} is invalid: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credentials in {}: {reason}", path.display())]
    InvalidCredentials { path: PathBuf, reason: String },

    #[error("unsupported credentials in {}: {reason}", path.display())]
    UnsupportedCredentials { path: PathBuf, reason: String },

    #[error("no token file configured and no user config directory found; set GOOGLE_TOKEN_FILE")]
    NoTokenLocation,
}

/// Validated settings for talking to the invite sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub credentials_file: PathBuf,
    /// `None` when unset and no user config directory exists; only OAuth
    /// client credentials need it
    pub token_file: Option<PathBuf>,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub timeout: Duration,
}

impl Config {
    /// Read and validate configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read and validate configuration through `lookup`. Empty values count
    /// as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::MissingVar(name));

        let credentials_file = PathBuf::from(require(ENV_CREDENTIALS_FILE)?);
        let spreadsheet_id = require(ENV_SPREADSHEET_ID)?;
        let sheet_name = require(ENV_SHEET_NAME)?;

        let token_file = get(ENV_TOKEN_FILE)
            .map(PathBuf::from)
            .or_else(default_token_file);

        let timeout = match get(ENV_TIMEOUT_SECS) {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            credentials_file,
            token_file,
            spreadsheet_id,
            sheet_name,
            timeout,
        })
    }
}

/// `<user config dir>/invites-cli/token.json`
pub fn default_token_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("invites-cli").join("token.json"))
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
        var: ENV_TIMEOUT_SECS,
        reason: format!("expected whole seconds, got {:?}", raw),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidVar {
            var: ENV_TIMEOUT_SECS,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
