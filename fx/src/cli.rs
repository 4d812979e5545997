//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// sidefx - restart-on-change task lifecycle demo
#[derive(Parser)]
#[command(
    name = "fx",
    about = "Restart-on-change task lifecycle demo with one-shot and periodic posts",
    version = env!("CARGO_PKG_VERSION"),
    after_help = log_path_help()
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive console driving the effect and ad-hoc tasks (default)
    Demo,

    /// Create one post and print the result
    Post {
        /// Post title (defaults to the configured title)
        #[arg(short, long)]
        title: Option<String>,

        /// Post body (defaults to the configured body)
        #[arg(short, long)]
        body: Option<String>,

        /// Author user id (defaults to the configured user id)
        #[arg(short, long)]
        user_id: Option<i64>,
    },

    /// Run the periodic post job in the foreground until interrupted
    Schedule {
        /// Minutes between runs (defaults to the configured interval)
        #[arg(short, long)]
        interval_minutes: Option<u64>,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sidefx")
        .join("logs")
        .join("sidefx.log");
    debug!(?path, "get_log_path: returning path");
    path
}

fn log_path_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}
