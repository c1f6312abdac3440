// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sandboxed Python snippet execution service.
///
/// `config.yaml` is optional. CLI flags only override config values.
#[derive(Parser, Debug)]
#[command(name = "pyexec", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// All supported CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve `POST /api/run-python` over HTTP.
    Serve {
        /// Path to config file (defaults apply when it does not exist)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Override listen address
        ///
        /// Example:
        /// --addr 0.0.0.0:8080
        #[arg(long)]
        addr: Option<String>,

        /// Override the preferred interpreter
        #[arg(long)]
        python: Option<String>,
    },

    /// Execute one snippet and print the result as JSON.
    ///
    /// Reads the snippet from FILE, or from stdin when omitted.
    Run {
        /// Path to config file (defaults apply when it does not exist)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Override the preferred interpreter
        #[arg(long)]
        python: Option<String>,

        /// Override the deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Snippet file
        file: Option<PathBuf>,
    },

    /// Write a default config.yaml into the current directory.
    Init,
}
