//! Google Sheets implementation of the tabular store
//!
//! Three endpoints are used: `values.get` for reads, `spreadsheets.get` to
//! resolve sheet titles, and `spreadsheets.batchUpdate` for writes. Every
//! request is bounded by the configured timeout. Failures are returned as
//! `StoreError::Unavailable` and never retried here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::auth::{AuthManager, OAuthCredentials};
use super::constants::{SHEETS_API_BASE, SHEET_PROPERTIES_FIELDS, USER_AGENT};
use super::models::{BatchUpdateSpreadsheetRequest, Spreadsheet, ValueRange, describe_error_body};
use crate::config::Config;
use crate::store::{
    CellRegionWrite, Grid, SheetHandle, SheetRange, StoreError, StoreResult, TabularStore,
};

pub struct SheetsClient {
    http: reqwest::Client,
    auth: AuthManager,
    spreadsheet_id: String,
    timeout: Duration,
}

impl SheetsClient {
    /// Build a client from validated configuration, loading credentials
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials =
            OAuthCredentials::load(&config.credentials_file, config.token_file.as_deref())?;
        Self::new(credentials, &config.spreadsheet_id, config.timeout)
    }

    pub fn new(
        credentials: OAuthCredentials,
        spreadsheet_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            auth: AuthManager::new(http.clone(), credentials),
            http,
            spreadsheet_id: spreadsheet_id.into(),
            timeout,
        })
    }

    fn spreadsheet_url(&self) -> String {
        spreadsheet_url(SHEETS_API_BASE, &self.spreadsheet_id)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> StoreResult<T> {
        let token = self.auth.access_token().await?;

        let response = request.bearer_auth(token).send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::unavailable(
                    operation,
                    format!("request timed out after {}s", self.timeout.as_secs()),
                )
            } else {
                StoreError::unavailable(operation, e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::unavailable(operation, format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            let message = describe_error_body(status.as_u16(), &body);
            warn!("{} failed: {}", operation, message);
            return Err(StoreError::unavailable(operation, message));
        }

        serde_json::from_str(&body).map_err(|e| {
            StoreError::unavailable(operation, format!("unexpected response body: {}", e))
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.http.request(method, url)
    }
}

/// `<base>/spreadsheets/<id>`
pub fn spreadsheet_url(base_url: &str, spreadsheet_id: &str) -> String {
    format!(
        "{}/spreadsheets/{}",
        base_url,
        urlencoding::encode(spreadsheet_id)
    )
}

/// `<base>/spreadsheets/<id>/values/<range>` with the A1 range escaped
pub fn values_url(base_url: &str, spreadsheet_id: &str, range: &SheetRange) -> String {
    format!(
        "{}/values/{}",
        spreadsheet_url(base_url, spreadsheet_id),
        urlencoding::encode(&range.to_a1())
    )
}

#[async_trait]
impl TabularStore for SheetsClient {
    async fn fetch_range(&self, range: &SheetRange) -> StoreResult<Grid> {
        let url = values_url(SHEETS_API_BASE, &self.spreadsheet_id, range);
        let request = self
            .request(Method::GET, &url)
            .query(&[("majorDimension", "ROWS")]);

        let values: ValueRange = self.send("fetch_range", request).await?;
        let grid = values.into_grid();
        debug!("fetched {} row(s) from {}", grid.len(), range.to_a1());
        Ok(grid)
    }

    async fn resolve_sheet_id(&self, sheet_name: &str) -> StoreResult<SheetHandle> {
        let url = self.spreadsheet_url();
        let request = self
            .request(Method::GET, &url)
            .query(&[("fields", SHEET_PROPERTIES_FIELDS)]);

        let spreadsheet: Spreadsheet = self.send("resolve_sheet_id", request).await?;
        spreadsheet
            .find_sheet(sheet_name)
            .ok_or_else(|| StoreError::SheetNotFound(sheet_name.to_string()))
    }

    async fn apply_batch(
        &self,
        sheet: SheetHandle,
        writes: &[CellRegionWrite],
    ) -> StoreResult<()> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = BatchUpdateSpreadsheetRequest::from_writes(sheet, writes);
        let request = self.request(Method::POST, &url).json(&body);

        let _: serde_json::Value = self.send("apply_batch", request).await?;
        debug!("applied {} update(s) to sheet {}", writes.len(), sheet.0);
        Ok(())
    }
}
