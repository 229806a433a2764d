//! Digestwatch
//!
//! Watches an upstream signal (a registry manifest digest or a hash
//! published at a URL) and, when it changes, rebuilds and pushes container
//! images for a configured set of repositories and branches.
//!
//! Architecture:
//! - Config: YAML documents describing the signal and the repository list
//! - State: one durable marker file per monitored signal
//! - Check: fetch, compare, persist, notify
//! - Pipeline: clone / checkout / build / push, one repository at a time
//!
//! Designed to be run from cron, one invocation per monitored signal; the
//! scheduler owns retries, wall-clock limits and mutual exclusion. The
//! process exits non-zero when the fetch fails or the configuration cannot
//! be loaded; per-repository build failures are logged and, unless
//! `fail_on_pipeline_error` is set, do not affect the exit code.

mod check;
mod config;
mod notify;
mod pipeline;
mod state;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "digestwatch")]
#[command(about = "Watch an upstream digest or hash and rebuild images on change", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a registry manifest digest for changes
    CheckDigest {
        /// Path to the YAML configuration file
        config: PathBuf,
    },
    /// Check a hash published at a URL for changes
    CheckHash {
        /// Path to the YAML configuration file
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "digestwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CheckDigest { config } => {
            let config = config::load_digest_config(&config)?;
            check::check_digest(&config).await
        }
        Commands::CheckHash { config } => {
            let config = config::load_hash_config(&config)?;
            check::check_hash(&config).await
        }
    }
}
