//! Node registry and undirected adjacency graph.
//!
//! Neighbor lists are kept symmetric: every mutation that adds or removes
//! an edge touches both endpoints.

use crate::error::{MeshError, MeshResult};
use crate::node::{GeoLocation, MeshNode, NodeHandle, NodeId, NodeStatus};
use crate::routing::Adjacency;
use crate::selection::NeighborSelector;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

/// Edges made for each newcomer when enough nodes exist
pub const AUTO_CONNECT_FANOUT: usize = 3;

/// Registry of live nodes and their links
#[derive(Debug, Default)]
pub struct TopologyStore {
    /// Live nodes indexed by id
    nodes: HashMap<NodeId, MeshNode>,
    /// Live ids in registration order
    order: Vec<NodeId>,
    /// Ids removed by disconnect; never handed out again
    retired: HashSet<NodeId>,
}

impl TopologyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under a fresh id.
    ///
    /// A blank `name` becomes `Node-<first four id characters>`.
    pub fn register(&mut self, name: &str, handle: NodeHandle, now_ms: u64) -> MeshNode {
        let mut id = Uuid::new_v4().to_string();
        while self.nodes.contains_key(&id) || self.retired.contains(&id) {
            id = Uuid::new_v4().to_string();
        }
        let name = if name.trim().is_empty() {
            format!("Node-{}", &id[..4])
        } else {
            name.to_string()
        };
        let node = MeshNode::new(id, handle, name, now_ms);
        self.insert(node.clone());
        node
    }

    /// Register a node under a caller-chosen id.
    ///
    /// Rejects ids that are live or were retired by a disconnect.
    pub fn register_with_id(
        &mut self,
        id: &str,
        name: &str,
        handle: NodeHandle,
        now_ms: u64,
    ) -> MeshResult<MeshNode> {
        if self.nodes.contains_key(id) || self.retired.contains(id) {
            return Err(MeshError::DuplicateNode {
                node_id: id.to_string(),
            });
        }
        let node = MeshNode::new(id.to_string(), handle, name.to_string(), now_ms);
        self.insert(node.clone());
        Ok(node)
    }

    fn insert(&mut self, node: MeshNode) {
        info!(node_id = %node.id, name = %node.name, "Node registered");
        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    /// Refresh a node's heartbeat. Returns false if the node is unknown.
    pub fn heartbeat(&mut self, node_id: &str, now_ms: u64) -> bool {
        match self.nodes.get_mut(node_id) {
            Some(node) => {
                node.last_seen = now_ms;
                node.status = NodeStatus::Active;
                debug!(node_id, "Heartbeat");
                true
            }
            None => false,
        }
    }

    /// Link two nodes in both directions.
    ///
    /// Repeated calls are harmless. Returns whether any new edge was added.
    pub fn connect(&mut self, a: &str, b: &str) -> MeshResult<bool> {
        if a == b {
            return Err(MeshError::SelfConnection {
                node_id: a.to_string(),
            });
        }
        for id in [a, b] {
            if !self.nodes.contains_key(id) {
                return Err(MeshError::NodeNotFound {
                    node_id: id.to_string(),
                });
            }
        }

        let mut added = false;
        if let Some(node) = self.nodes.get_mut(a) {
            added |= node.add_neighbor(b);
        }
        if let Some(node) = self.nodes.get_mut(b) {
            added |= node.add_neighbor(a);
        }
        Ok(added)
    }

    /// Link a newcomer to up to [`AUTO_CONNECT_FANOUT`] existing nodes chosen
    /// by `selector`. Returns the ids it was linked to.
    pub fn auto_connect(
        &mut self,
        new_id: &str,
        selector: &mut dyn NeighborSelector,
    ) -> Vec<NodeId> {
        let existing: Vec<NodeId> = self
            .order
            .iter()
            .filter(|id| id.as_str() != new_id)
            .cloned()
            .collect();
        if existing.is_empty() || !self.nodes.contains_key(new_id) {
            return Vec::new();
        }

        let wanted = AUTO_CONNECT_FANOUT.min(existing.len());
        let mut linked = Vec::with_capacity(wanted);
        for target in selector.select(&existing, wanted) {
            match self.connect(new_id, &target) {
                Ok(_) => {
                    debug!(node_id = new_id, neighbor = %target, "Auto-connected");
                    linked.push(target);
                }
                Err(e) => debug!(node_id = new_id, error = %e, "Auto-connect skipped"),
            }
        }
        linked
    }

    /// Remove a node and every edge that touches it.
    pub fn disconnect(&mut self, node_id: &str) -> Option<MeshNode> {
        let mut node = self.nodes.remove(node_id)?;
        node.status = NodeStatus::Inactive;
        for other in self.nodes.values_mut() {
            other.remove_neighbor(node_id);
        }
        self.order.retain(|id| id != node_id);
        self.retired.insert(node_id.to_string());
        info!(node_id, name = %node.name, "Node disconnected");
        Some(node)
    }

    /// Record a node's reported position. Returns false if the node is unknown.
    pub fn set_location(&mut self, node_id: &str, location: GeoLocation) -> bool {
        match self.nodes.get_mut(node_id) {
            Some(node) => {
                node.location = Some(location);
                true
            }
            None => false,
        }
    }

    /// Copy of all live nodes in registration order
    pub fn snapshot(&self) -> Vec<MeshNode> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .cloned()
            .collect()
    }

    /// Get a node by id
    pub fn get(&self, node_id: &str) -> Option<&MeshNode> {
        self.nodes.get(node_id)
    }

    /// Whether the id is live
    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the mesh has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.neighbors.len()).sum::<usize>() / 2
    }
}

impl Adjacency for TopologyStore {
    fn contains_node(&self, node_id: &str) -> bool {
        self.contains(node_id)
    }

    fn neighbors_of(&self, node_id: &str) -> Option<&[NodeId]> {
        self.nodes.get(node_id).map(|n| n.neighbors.as_slice())
    }
}
