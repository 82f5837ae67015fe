//! Paylio CLI - Subscription review from the terminal
//!
//! Usage:
//!   paylio detect --days 90       Detect recurring charges
//!   paylio spend --days 30        Show debit spend for a window
//!   paylio serve --port 3000      Start the review API server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Detect { days, file, json } => {
            let source = commands::make_source(&cli.api_base, file.as_deref())?;
            commands::cmd_detect(source.as_ref(), days, json).await
        }
        Commands::Spend { days, file } => {
            let source = commands::make_source(&cli.api_base, file.as_deref())?;
            commands::cmd_spend(source.as_ref(), days).await
        }
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&cli.api_base, &host, port, no_auth).await,
    }
}
