//! # Structured Logging
//!
//! Tracing subscriber initialization for the envkeep core. Library users
//! embedding the crate can skip this and install their own subscriber.

use crate::config::ObservabilityConfig;
use crate::errors::{EnvkeepError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber from configuration.
///
/// Honors `RUST_LOG` when set, falling back to the configured level. Fails
/// if a global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| EnvkeepError::config(format!("Invalid log level filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    result.map_err(|e| {
        EnvkeepError::config(format!("Failed to initialize tracing subscriber: {}", e))
    })?;

    tracing::debug!(
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Tracing initialized"
    );
    Ok(())
}
