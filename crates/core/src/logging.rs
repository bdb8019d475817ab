//! Structured logging infrastructure for GuardianGrid.
//!
//! This module provides centralized logging initialization with support
//! for structured JSON output and environment-based configuration. Output
//! goes to stderr; stdout is left to the node protocol.

use crate::config::LoggingConfig;
use crate::error::{CoreError, CoreResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter, letting `RUST_LOG` override the configured default.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the logging system with structured output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `default_level`.
///
/// # Example
/// ```no_run
/// use guardiangrid_core::logging;
///
/// logging::init("info");
/// tracing::info!("Application started");
/// ```
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize the logging system with JSON output for production environments.
///
/// This format is suitable for log aggregation systems and structured log analysis.
/// Log level can be configured via the `RUST_LOG` environment variable.
///
/// # Example
/// ```no_run
/// use guardiangrid_core::logging;
///
/// logging::init_json("info");
/// tracing::info!(service = "mesh", "Service started");
/// ```
pub fn init_json(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();
}

/// Initialize logging from a [`LoggingConfig`], failing instead of panicking
/// when a global subscriber is already installed.
pub fn try_init(config: &LoggingConfig) -> CoreResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter(&config.level));
    let result = if config.json {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
    };
    result.map_err(|e| CoreError::LoggingInit(e.to_string()))
}
