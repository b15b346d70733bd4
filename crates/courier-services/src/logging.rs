//! Tracing subscriber setup

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;

/// Build the event filter. `RUST_LOG` wins over the configured level.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level or filter: {}", level)),
    }
}

/// Install the global subscriber
///
/// Calling this twice is harmless: the second subscriber is dropped.
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = build_filter(level)?;

    let installed = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init(),
    };
    installed.ok(); // Ignore error if already initialized

    Ok(())
}
