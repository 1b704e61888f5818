//! Google Sheets API access
//!
//! OAuth token handling, wire types and a [`SheetsClient`] that implements
//! [`TabularStore`](crate::store::TabularStore) against the Sheets v4 REST API.

pub mod auth;
pub mod client;
pub mod constants;
pub mod models;

pub use auth::{AuthManager, OAuthCredentials};
pub use client::SheetsClient;
pub use models::TokenInfo;
