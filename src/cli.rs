// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `procdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procdag",
    version,
    about = "Launch and supervise a fleet of local processes from a compose file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the compose file (YAML).
    ///
    /// When omitted, the current directory is searched for compose.yml,
    /// compose.yaml, process-compose.yml or process-compose.yaml.
    #[arg(short = 'f', long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCDAG_LOG`, then the compose file's `log_level`, then
    /// a default of `info` will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the startup order, but don't spawn anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
