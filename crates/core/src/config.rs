//! Configuration management for GuardianGrid.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
#[cfg(feature = "toml")]
use std::path::Path;

/// Top-level configuration for a GuardianGrid node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mesh engine settings
    pub mesh: MeshSettings,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Node service settings
    pub node: NodeConfig,
}

/// Tunables for the mesh-state engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// Number of recent packets kept for display
    pub history_capacity: usize,
    /// Upper bound on in-flight direct deliveries; `None` means unbounded
    pub max_pending_deliveries: Option<usize>,
    /// Seed for neighbor sampling; `None` draws from OS randomness
    pub neighbor_seed: Option<u64>,
    /// Capacity of the actor command queue
    pub command_buffer: usize,
    /// Capacity of the outbound event channel
    pub event_buffer: usize,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            max_pending_deliveries: None,
            neighbor_seed: None,
            command_buffer: 256,
            event_buffer: 1024,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Node service identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Service name reported in logs
    pub name: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "guardiangrid-node".to_string(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        self.mesh.validate()
    }
}

impl MeshSettings {
    /// Reject buffer sizes and bounds the mesh service cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.history_capacity == 0 {
            return Err(invalid("mesh.history_capacity", "must be at least 1"));
        }
        if self.command_buffer == 0 {
            return Err(invalid("mesh.command_buffer", "must be at least 1"));
        }
        if self.event_buffer == 0 {
            return Err(invalid("mesh.event_buffer", "must be at least 1"));
        }
        if self.max_pending_deliveries == Some(0) {
            return Err(invalid(
                "mesh.max_pending_deliveries",
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> CoreError {
    CoreError::InvalidSetting {
        field,
        reason: reason.to_string(),
    }
}
