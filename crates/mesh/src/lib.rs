//! GuardianGrid Mesh - simulated emergency mesh network core
//!
//! Keeps an undirected graph of registered nodes, routes direct messages
//! over the fewest hops, floods broadcast-class alerts, and reports delivery
//! health with a rule-based risk assessment.
//!
//! # Core Components
//!
//! - **Topology**: node registry with symmetric adjacency and auto-linking
//! - **Routing**: breadth-first shortest paths with a fixed per-hop latency
//! - **Engine**: message dispatch, delivery counters and history
//! - **Insight**: classification of stats into risk levels
//! - **Service**: a tokio actor that owns the engine and runs delivery timers
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use guardiangrid_core::MeshSettings;
//! use guardiangrid_mesh::{ChannelTransport, MeshService, MessagePayload, NodeHandle};
//!
//! # async fn demo() -> Result<(), guardiangrid_mesh::MeshError> {
//! let transport = ChannelTransport::new(1024);
//! let service = MeshService::spawn(MeshSettings::default(), transport.clone())?;
//! let mesh = service.handle();
//!
//! let a = mesh.register("Alpha", NodeHandle::new("client-a")).await?;
//! let b = mesh.register("Bravo", NodeHandle::new("client-b")).await?;
//! mesh.send(&a.id, b.id.as_str(), MessagePayload::direct("status?")).await?;
//!
//! println!("{:?}", mesh.stats().await?);
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod clock;
pub mod engine;
pub mod error;
pub mod history;
pub mod insight;
pub mod message;
pub mod metrics;
pub mod node;
pub mod routing;
pub mod selection;
pub mod service;
pub mod topology;
pub mod transport;

// Re-export main types
pub use clock::{
    Clock, DeliveryScheduler, DeliveryTicket, ManualClock, ManualScheduler, SystemClock,
};
pub use engine::{MeshEngine, SendOutcome};
pub use error::{MeshError, MeshResult};
pub use history::MessageHistory;
pub use insight::{Insight, InsightEngine, RiskLevel};
pub use message::{
    DeliveryStatus, LocationContent, MessagePacket, MessagePayload, MessageType, Recipient,
    ResourceContent, ResourceType, SafetyStatus, StatusContent, TextContent, Urgency, BROADCAST,
};
pub use metrics::{MeshCounters, MeshStats, MetricsAggregator};
pub use node::{GeoLocation, MeshNode, NodeHandle, NodeId, NodeStatus};
pub use routing::{Adjacency, RoutePath, RoutingEngine, PER_HOP_LATENCY_MS};
pub use selection::{FirstCandidatesSelector, NeighborSelector, RandomSelector};
pub use service::{MeshHandle, MeshService, MeshServiceBuilder};
pub use topology::{TopologyStore, AUTO_CONNECT_FANOUT};
pub use transport::{
    Audience, ChannelTransport, Envelope, MeshEvent, MeshTransport, ProofReport,
    RecordingTransport, StatsReport,
};
