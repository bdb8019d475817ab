//! Mesh node types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node in the mesh
pub type NodeId = String;

/// Opaque transport handle used to reach a participant.
///
/// The engine never interprets it; the transport collaborator that
/// registered the node knows what it means.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(pub String);

impl NodeHandle {
    /// Wrap a transport-specific address
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Borrow the raw handle
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Liveness status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Registered and heard from
    Active,
    /// Leaving the mesh
    Inactive,
}

/// WGS84 position reported by a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

/// Participant in the simulated mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshNode {
    /// Unique node identifier
    pub id: NodeId,
    /// How the transport reaches this node
    pub handle: NodeHandle,
    /// Display name
    pub name: String,
    /// Adjacent nodes, in the order the edges were formed
    pub neighbors: Vec<NodeId>,
    /// Liveness status
    pub status: NodeStatus,
    /// Last heartbeat (Unix epoch milliseconds)
    pub last_seen: u64,
    /// Last reported position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

impl MeshNode {
    /// Create an active node with no neighbors
    pub fn new(id: NodeId, handle: NodeHandle, name: String, now_ms: u64) -> Self {
        Self {
            id,
            handle,
            name,
            neighbors: Vec::new(),
            status: NodeStatus::Active,
            last_seen: now_ms,
            location: None,
        }
    }

    /// Check whether `node_id` is a direct neighbor
    pub fn is_neighbor(&self, node_id: &str) -> bool {
        self.neighbors.iter().any(|n| n == node_id)
    }

    /// Append a neighbor unless already present. Returns true if added.
    pub(crate) fn add_neighbor(&mut self, node_id: &str) -> bool {
        if self.is_neighbor(node_id) {
            return false;
        }
        self.neighbors.push(node_id.to_string());
        true
    }

    /// Drop a neighbor if present
    pub(crate) fn remove_neighbor(&mut self, node_id: &str) {
        self.neighbors.retain(|n| n != node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_active_and_isolated() {
        let node = MeshNode::new("n1".into(), NodeHandle::new("h1"), "Alpha".into(), 1000);
        assert_eq!(node.status, NodeStatus::Active);
        assert!(node.neighbors.is_empty());
        assert_eq!(node.last_seen, 1000);
        assert!(node.location.is_none());
    }

    #[test]
    fn test_add_neighbor_is_idempotent() {
        let mut node = MeshNode::new("n1".into(), NodeHandle::new("h1"), "Alpha".into(), 0);
        assert!(node.add_neighbor("n2"));
        assert!(!node.add_neighbor("n2"));
        assert_eq!(node.neighbors, vec!["n2".to_string()]);

        node.remove_neighbor("n2");
        assert!(!node.is_neighbor("n2"));
    }

    #[test]
    fn test_node_wire_format() {
        let mut node = MeshNode::new("n1".into(), NodeHandle::new("sock-9"), "Alpha".into(), 42);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["handle"], "sock-9");
        assert_eq!(json["lastSeen"], 42);
        assert_eq!(json["status"], "active");
        assert!(json.get("location").is_none());

        node.location = Some(GeoLocation { lat: 1.5, lng: -2.0 });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["location"]["lng"], -2.0);
    }
}
