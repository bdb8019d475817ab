//! Core functionality for the GuardianGrid mesh simulator.
//!
//! This crate provides the configuration model, error types and logging
//! bootstrap shared across the GuardianGrid workspace.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, LoggingConfig, MeshSettings, NodeConfig};
pub use error::{CoreError, CoreResult};
