//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Paylio - Review recurring subscription charges
#[derive(Parser)]
#[command(name = "paylio")]
#[command(about = "Detect and review recurring subscription charges", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Base URL of the Plaid-style transaction proxy
    #[arg(long, default_value = "http://127.0.0.1:8000", global = true)]
    pub api_base: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run subscription detection and print the results
    Detect {
        /// Look-back window in days
        #[arg(short, long, default_value = "90")]
        days: u32,

        /// Read transactions from a local JSON fixture instead of the proxy
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show total debit spend for a look-back window
    Spend {
        /// Look-back window in days
        #[arg(short, long, default_value = "30")]
        days: u32,

        /// Read transactions from a local JSON fixture instead of the proxy
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Start the review API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a
        /// network. By default the server requires a bearer API key from
        /// the PAYLIO_API_KEYS environment variable.
        #[arg(long)]
        no_auth: bool,
    },
}
