//! Command-line surface

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

pub mod commands;

use commands::invites::{self, DedupeArgs, StatusArgs};
use crate::api::SheetsClient;
use crate::config::Config;
use crate::services::InviteService;

#[derive(Parser, Debug)]
#[command(name = "invites-cli", version, about = "Manage Slack invite requests kept in a Google Sheet")]
pub struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List outstanding invite requests
    List,
    /// Count new, unprocessed requests
    Count,
    /// Mark repeated requests from the same email as duplicates
    Dedupe(DedupeArgs),
    /// Set the status of the requests for one or more emails
    Status(StatusArgs),
    /// Validate configuration and print the resolved settings
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is not set
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    let format = cli.format;

    match cli.command {
        Commands::Config => invites::handle_config(&config, format),
        Commands::List => invites::handle_list(&connect(&config)?, format).await,
        Commands::Count => invites::handle_count(&connect(&config)?, format).await,
        Commands::Dedupe(args) => invites::handle_dedupe(&connect(&config)?, args, format).await,
        Commands::Status(args) => invites::handle_status(&connect(&config)?, args, format).await,
    }
}

fn connect(config: &Config) -> Result<InviteService<SheetsClient>> {
    let client =
        SheetsClient::from_config(config).context("Failed to set up Google Sheets access")?;
    Ok(InviteService::new(client, config.sheet_name.clone()))
}
