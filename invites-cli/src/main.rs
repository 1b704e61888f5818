use anyhow::Result;
use clap::Parser;
use log::{debug, warn};

use invites_cli::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    match dotenv {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("no .env file found"),
        Err(e) => warn!("failed to load .env: {}", e),
    }

    cli::run(args).await
}
