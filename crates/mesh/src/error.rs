//! Error types for GuardianGrid mesh operations.
//!
//! Routine network outcomes (no route, a recipient that left before its
//! packet arrived) are not errors: they are counted and reported as
//! outcomes. These variants cover invalid input and a stopped service.

use guardiangrid_core::CoreError;
use thiserror::Error;

/// Errors that can occur in mesh operations.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Node not found in the registry
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// The missing node
        node_id: String,
    },

    /// Id already registered, or retired by an earlier disconnect
    #[error("Node id already used: {node_id}")]
    DuplicateNode {
        /// The colliding id
        node_id: String,
    },

    /// Attempted to link a node to itself
    #[error("Refusing to connect node {node_id} to itself")]
    SelfConnection {
        /// The node on both ends
        node_id: String,
    },

    /// Route not found
    #[error("No route found from {from} to {to}")]
    NoRoute {
        /// Sender
        from: String,
        /// Unreachable destination
        to: String,
    },

    /// Message type outside the known set
    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(String),

    /// Payload does not match the shape its message type declares
    #[error("Invalid {message_type} payload: {reason}")]
    InvalidPayload {
        /// Declared message type
        message_type: String,
        /// Decoder diagnostic
        reason: String,
    },

    /// The mesh actor has stopped
    #[error("Mesh service unavailable")]
    ServiceUnavailable,

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),
}

impl MeshError {
    /// Whether the error stems from caller input rather than service state.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            MeshError::NodeNotFound { .. }
                | MeshError::DuplicateNode { .. }
                | MeshError::SelfConnection { .. }
                | MeshError::UnsupportedMessageType(_)
                | MeshError::InvalidPayload { .. }
        )
    }
}

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;
