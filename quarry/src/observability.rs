//! Tracing subscriber setup
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application. [`init_tracing`] is a convenience for applications that
//! want the configured defaults.

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{Error, Result};

/// Install a global fmt subscriber using `config.logging`
///
/// `RUST_LOG` is not consulted; the filter comes from the configured level,
/// falling back to `info` when it does not parse.
///
/// # Errors
///
/// [`Error::Tracing`] if a global subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if config.logging.json {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };
    installed.map_err(|e| Error::Tracing(e.to_string()))?;

    tracing::debug!(
        level = %config.logging.level,
        json = config.logging.json,
        "Tracing initialized"
    );
    Ok(())
}
