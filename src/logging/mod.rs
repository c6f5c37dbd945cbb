// Logging module for structured logging using the tracing crate

use crate::config::{LogFormat, LoggingConfig};
use std::error::Error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for structured logging
///
/// The subscriber is configured with:
/// - JSON or compact text formatting depending on `logging.format`
/// - Filtering from `RUST_LOG` when set, otherwise from `logging.level`
/// - Output to stderr, keeping stdout free for command output
///
/// Calling this more than once is harmless: the first subscriber stays
/// installed and later calls return `Ok(())`.
///
/// # Errors
///
/// Returns an error if `logging.level` is not a valid filter directive.
///
/// # Examples
///
/// ```
/// use pagewarden::config::LoggingConfig;
/// use pagewarden::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), Box<dyn Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    // A global subscriber is already set (tests, embedding hosts)
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }

    Ok(())
}
