//! Core error types

use thiserror::Error;

/// Core error type for GuardianGrid
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML
    #[cfg(feature = "toml")]
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration parsed but holds an unusable value
    #[error("Invalid setting `{field}`: {reason}")]
    InvalidSetting {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// A global tracing subscriber was already installed
    #[error("Logging already initialized: {0}")]
    LoggingInit(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
