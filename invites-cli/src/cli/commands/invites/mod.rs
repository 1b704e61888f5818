//! Invite sheet commands

use clap::Args;

pub mod handler;

pub use handler::{handle_config, handle_count, handle_dedupe, handle_list, handle_status};

#[derive(Args, Debug)]
pub struct DedupeArgs {
    /// Timestamp written next to each status (defaults to local now)
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Show the rows that would be marked without writing them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Status to record, e.g. "Invited" or "Rejected"
    #[arg(long)]
    pub status: String,

    /// Email whose request gets the status; repeat for several
    #[arg(long = "email", required = true)]
    pub emails: Vec<String>,

    /// Timestamp written next to the status (defaults to local now)
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Show the rows that would be updated without writing them
    #[arg(long)]
    pub dry_run: bool,
}
