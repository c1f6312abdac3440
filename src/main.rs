// src/main.rs

//! pyexec
//!
//! Entry point for the pyexec binary.
//!
//! Responsibilities of this file:
//! - Load `.env` and initialise logging
//! - Parse CLI arguments
//! - Hand off to the runner
//!
//! There is intentionally *no business logic* here.

use anyhow::Result;
use clap::Parser;
use pyexec::{cli, runner};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    // Logs go to stderr so `pyexec run` keeps stdout for the JSON result.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    runner::run(cli).await
}
