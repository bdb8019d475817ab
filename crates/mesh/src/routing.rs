//! Hop-count routing over the mesh graph.
//!
//! Breadth-first search from the source, expanding neighbors in their
//! stored order, so the first path found has the minimum number of hops.
//! Among equally short paths the one through the earliest-listed neighbor
//! wins; neighbor lists are ordered by when each edge was formed.

use crate::error::{MeshError, MeshResult};
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Simulated latency added by each hop (milliseconds)
pub const PER_HOP_LATENCY_MS: u64 = 50;

/// Read-only view of an undirected graph
pub trait Adjacency {
    /// Whether the node is part of the graph
    fn contains_node(&self, node_id: &str) -> bool;
    /// Neighbors of a node in stored order, `None` if the node is absent
    fn neighbors_of(&self, node_id: &str) -> Option<&[NodeId]>;
}

impl Adjacency for HashMap<NodeId, Vec<NodeId>> {
    fn contains_node(&self, node_id: &str) -> bool {
        self.contains_key(node_id)
    }

    fn neighbors_of(&self, node_id: &str) -> Option<&[NodeId]> {
        self.get(node_id).map(Vec::as_slice)
    }
}

/// Route from source to destination, both inclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePath {
    /// Node ids along the route
    pub path: Vec<NodeId>,
    /// Number of edges traversed
    pub hops: usize,
    /// `hops` × [`PER_HOP_LATENCY_MS`]
    pub estimated_latency: u64,
}

impl RoutePath {
    /// Build a route from an ordered node list
    pub fn from_path(path: Vec<NodeId>) -> Self {
        let hops = path.len().saturating_sub(1);
        Self {
            path,
            hops,
            estimated_latency: hops as u64 * PER_HOP_LATENCY_MS,
        }
    }
}

/// Stateless shortest-path finder
#[derive(Debug, Default, Clone, Copy)]
pub struct RoutingEngine;

impl RoutingEngine {
    /// Find a minimum-hop route, or `None` if either end is absent or unreachable.
    pub fn find_path<G: Adjacency + ?Sized>(
        graph: &G,
        source: &str,
        target: &str,
    ) -> Option<RoutePath> {
        if !graph.contains_node(source) || !graph.contains_node(target) {
            return None;
        }

        let mut queue = VecDeque::from([source.to_string()]);
        let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
        let mut visited = HashSet::from([source.to_string()]);

        while let Some(current) = queue.pop_front() {
            if current == target {
                return Some(Self::reconstruct(&parent, target));
            }
            let Some(neighbors) = graph.neighbors_of(&current) else {
                continue;
            };
            for neighbor in neighbors {
                // Dangling entries are skipped rather than trusted
                if !graph.contains_node(neighbor) || visited.contains(neighbor) {
                    continue;
                }
                visited.insert(neighbor.clone());
                parent.insert(neighbor.clone(), current.clone());
                queue.push_back(neighbor.clone());
            }
        }
        None
    }

    /// Like [`RoutingEngine::find_path`] but reports failure as [`MeshError::NoRoute`].
    pub fn require_path<G: Adjacency + ?Sized>(
        graph: &G,
        source: &str,
        target: &str,
    ) -> MeshResult<RoutePath> {
        Self::find_path(graph, source, target).ok_or_else(|| MeshError::NoRoute {
            from: source.to_string(),
            to: target.to_string(),
        })
    }

    fn reconstruct(parent: &HashMap<NodeId, NodeId>, target: &str) -> RoutePath {
        let mut path = vec![target.to_string()];
        let mut current = target;
        while let Some(prev) = parent.get(current) {
            path.push(prev.clone());
            current = prev.as_str();
        }
        path.reverse();
        RoutePath::from_path(path)
    }
}
