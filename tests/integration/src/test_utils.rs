//! Test utilities for mesh service integration tests

use guardiangrid_core::MeshSettings;
use guardiangrid_mesh::{
    MeshEvent, MeshHandle, MeshNode, MeshService, NeighborSelector, NodeHandle, NodeId,
    RecordingTransport,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

/// Selector that never links anything, so tests build edges explicitly
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAutoLinks;

impl NeighborSelector for NoAutoLinks {
    fn select(&mut self, _candidates: &[NodeId], _count: usize) -> Vec<NodeId> {
        Vec::new()
    }
}

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("guardiangrid_mesh=debug")
        .with_test_writer()
        .try_init();
}

/// A running service wired to a recording transport
pub struct TestMesh {
    pub service: MeshService,
    pub mesh: MeshHandle,
    pub transport: RecordingTransport,
}

impl TestMesh {
    /// Start a service with the given neighbor strategy
    pub fn start(selector: Box<dyn NeighborSelector>) -> Self {
        Self::start_with(MeshSettings::default(), selector)
    }

    /// Start a service with explicit settings
    pub fn start_with(settings: MeshSettings, selector: Box<dyn NeighborSelector>) -> Self {
        init_tracing();
        let transport = RecordingTransport::new();
        let service = MeshService::builder(settings)
            .selector(selector)
            .spawn(transport.clone())
            .expect("spawn mesh service");
        let mesh = service.handle();
        Self {
            service,
            mesh,
            transport,
        }
    }

    /// Register a node whose id and client handle are both `id`
    pub async fn add(&self, id: &str) -> MeshNode {
        self.mesh
            .register_as(id, id, NodeHandle::new(id))
            .await
            .expect("register")
    }

    /// Register `ids` and link them into a chain in order
    pub async fn chain(&self, ids: &[&str]) {
        for id in ids {
            self.add(id).await;
        }
        for pair in ids.windows(2) {
            self.mesh.connect(pair[0], pair[1]).await.expect("connect");
        }
    }

    /// Events delivered to the client behind `id`
    pub fn inbox(&self, id: &str) -> Vec<MeshEvent> {
        self.transport.delivered_to(&NodeHandle::new(id))
    }

    /// Stop the service
    pub async fn stop(self) {
        self.service.shutdown().await;
    }
}

/// Let virtual time pass so scheduled deliveries fire
pub async fn elapse(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Reference hop distances from `source` over an adjacency snapshot
pub fn bfs_distances(nodes: &[MeshNode], source: &str) -> HashMap<NodeId, usize> {
    let adjacency: HashMap<&str, &[NodeId]> = nodes
        .iter()
        .map(|n| (n.id.as_str(), n.neighbors.as_slice()))
        .collect();

    let mut distances = HashMap::from([(source.to_string(), 0usize)]);
    let mut seen = HashSet::from([source.to_string()]);
    let mut queue = VecDeque::from([source.to_string()]);
    while let Some(current) = queue.pop_front() {
        let depth = distances[&current];
        for next in adjacency.get(current.as_str()).copied().unwrap_or_default() {
            if seen.insert(next.clone()) {
                distances.insert(next.clone(), depth + 1);
                queue.push_back(next.clone());
            }
        }
    }
    distances
}
