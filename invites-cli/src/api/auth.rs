//! OAuth access for the Sheets API
//!
//! Supports the refresh-token flow: either an OAuth client secrets file
//! (`installed` or `web`) paired with a token file holding a refresh token,
//! or a self-contained `authorized_user` file as written by `gcloud`.
//! Access tokens are cached and refreshed shortly before they expire.

use chrono::Utc;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::constants::DEFAULT_TOKEN_URI;
use super::models::{TokenErrorResponse, TokenInfo, TokenResponse};
use crate::config::ConfigError;
use crate::store::{StoreError, StoreResult};

/// Everything needed to mint access tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorizedUser {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// Token file as saved by the usual OAuth tooling; only the refresh token
/// is needed
#[derive(Debug, Deserialize)]
struct StoredToken {
    #[serde(default)]
    refresh_token: String,
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })
}

impl OAuthCredentials {
    /// Load credentials from disk. The token file is only needed, and only
    /// read, when the credentials file does not carry its own refresh token.
    pub fn load(
        credentials_file: &Path,
        token_file: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let credentials = read_file(credentials_file)?;
        let kind = credential_kind(&credentials, credentials_file)?;

        match kind {
            CredentialKind::AuthorizedUser => {
                Self::from_documents(&credentials, None, credentials_file)
            }
            CredentialKind::ClientSecret => {
                let token_file = token_file.ok_or(ConfigError::NoTokenLocation)?;
                let token = read_file(token_file)?;
                Self::from_documents(&credentials, Some((token.as_str(), token_file)), credentials_file)
            }
        }
    }

    /// Parse already-read documents: the credentials and, for OAuth client
    /// credentials, the token document with its path. Paths are only used in
    /// error messages.
    pub fn from_documents(
        credentials: &str,
        token: Option<(&str, &Path)>,
        credentials_file: &Path,
    ) -> Result<Self, ConfigError> {
        let invalid = |path: &Path, reason: String| ConfigError::InvalidCredentials {
            path: path.to_path_buf(),
            reason,
        };

        let raw: Value =
            serde_json::from_str(credentials).map_err(|e| invalid(credentials_file, e.to_string()))?;

        match credential_kind(credentials, credentials_file)? {
            CredentialKind::AuthorizedUser => {
                let user: AuthorizedUser = serde_json::from_value(raw)
                    .map_err(|e| invalid(credentials_file, e.to_string()))?;
                Ok(Self {
                    client_id: user.client_id,
                    client_secret: user.client_secret,
                    token_uri: user.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
                    refresh_token: user.refresh_token,
                })
            }
            CredentialKind::ClientSecret => {
                let section = raw
                    .get("installed")
                    .or_else(|| raw.get("web"))
                    .cloned()
                    .ok_or_else(|| {
                        invalid(
                            credentials_file,
                            "expected an \"installed\" or \"web\" client section".to_string(),
                        )
                    })?;
                let client: ClientSecret = serde_json::from_value(section)
                    .map_err(|e| invalid(credentials_file, e.to_string()))?;

                let (token, token_file) = token.ok_or(ConfigError::NoTokenLocation)?;
                let stored: StoredToken =
                    serde_json::from_str(token).map_err(|e| invalid(token_file, e.to_string()))?;
                if stored.refresh_token.is_empty() {
                    return Err(invalid(token_file, "missing refresh_token".to_string()));
                }

                Ok(Self {
                    client_id: client.client_id,
                    client_secret: client.client_secret,
                    token_uri: client.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
                    refresh_token: stored.refresh_token,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialKind {
    AuthorizedUser,
    ClientSecret,
}

fn credential_kind(credentials: &str, path: &Path) -> Result<CredentialKind, ConfigError> {
    let raw: Value = serde_json::from_str(credentials).map_err(|e| ConfigError::InvalidCredentials {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    match raw.get("type").and_then(Value::as_str) {
        Some("authorized_user") => Ok(CredentialKind::AuthorizedUser),
        Some("service_account") => Err(ConfigError::UnsupportedCredentials {
            path: PathBuf::from(path),
            reason: "service account keys are not supported; use an OAuth client file with a \
                     token file, or authorized_user credentials"
                .to_string(),
        }),
        Some(other) => Err(ConfigError::UnsupportedCredentials {
            path: PathBuf::from(path),
            reason: format!("unknown credential type {:?}", other),
        }),
        None => Ok(CredentialKind::ClientSecret),
    }
}

/// Hands out access tokens, refreshing them through the token endpoint
pub struct AuthManager {
    http: reqwest::Client,
    credentials: OAuthCredentials,
    cached: Mutex<Option<TokenInfo>>,
}

impl AuthManager {
    pub fn new(http: reqwest::Client, credentials: OAuthCredentials) -> Self {
        Self {
            http,
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// A valid bearer token, refreshed if the cached one is close to expiry
    pub async fn access_token(&self) -> StoreResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if !token.needs_refresh(now) {
                return Ok(token.access_token.clone());
            }
            debug!("access token expires at {}, refreshing", token.expires_at);
        }

        let token = self.refresh().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn refresh(&self) -> StoreResult<TokenInfo> {
        let unavailable = |message: String| StoreError::unavailable("authenticate", message);

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
        ];

        let response = self
            .http
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| unavailable(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| unavailable(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body.trim().to_string(),
            };
            warn!("token refresh rejected with HTTP {}", status.as_u16());
            return Err(unavailable(format!(
                "token refresh failed (HTTP {}): {}",
                status.as_u16(),
                reason
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| unavailable(format!("invalid token response: {}", e)))?;
        debug!("obtained new access token");
        Ok(TokenInfo::from_response(parsed, Utc::now()))
    }
}
