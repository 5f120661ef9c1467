// src/logging.rs

//! Logging setup for `procdag` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `PROCDAG_LOG` environment variable (e.g. "info", "debug")
//! 3. `log_level` from the compose file
//! 4. default to `info`

use anyhow::Result;
use tracing::warn;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup. Called after the compose file is loaded so
/// its `log_level` can participate; an unknown config value falls back to
/// the default with a warning.
pub fn init_logging(cli_level: Option<LogLevel>, config_level: Option<&str>) -> Result<()> {
    let mut unknown_config_level = None;

    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("PROCDAG_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .or_else(|| {
                config_level.and_then(|s| {
                    let parsed = parse_level_str(s);
                    if parsed.is_none() {
                        unknown_config_level = Some(s.to_string());
                    }
                    parsed
                })
            })
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    if let Some(bad) = unknown_config_level {
        warn!(log_level = %bad, "unknown log_level in compose file; defaulting to info");
    }

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
