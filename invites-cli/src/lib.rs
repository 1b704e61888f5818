//! Slack invite request management backed by a Google Sheet
//!
//! The reconciliation engine in [`services::reconcile`] works against any
//! [`store::TabularStore`]; [`api::SheetsClient`] is the production store and
//! [`store::MemoryStore`] the in-memory one.

pub mod api;
pub mod cli;
pub mod config;
pub mod services;
pub mod store;
