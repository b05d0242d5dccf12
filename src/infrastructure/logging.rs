//! Tracing initialisation.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::domain::models::config::LoggingConfig;

/// Guard keeping the non-blocking file writer alive for the process
/// lifetime. Dropping it flushes and stops the background writer.
pub struct LoggingGuard {
    _appender_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialise the global tracing subscriber from config.
///
/// `RUST_LOG` overrides the configured level when set. With a log
/// directory configured, output goes to a daily-rotated file; otherwise to
/// stderr.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let guard = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "sercha.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            if config.format == "json" {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .try_init()
            } else {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .try_init()
            }
            .map_err(|err| anyhow::anyhow!("{err}"))
            .context("Failed to initialise logging")?;
            Some(guard)
        }
        None => {
            if config.format == "json" {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .try_init()
            } else {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .try_init()
            }
            .map_err(|err| anyhow::anyhow!("{err}"))
            .context("Failed to initialise logging")?;
            None
        }
    };

    Ok(LoggingGuard {
        _appender_guard: guard,
    })
}
