//! Outbound events and the transport seam.
//!
//! The engine never knows how clients are reached. It hands events to a
//! [`MeshTransport`], either for every connected client or for the single
//! client behind a [`NodeHandle`].

use crate::error::MeshResult;
use crate::insight::Insight;
use crate::message::MessagePacket;
use crate::metrics::MeshStats;
use crate::node::{MeshNode, NodeHandle};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::trace;

/// Reason sent with a failure notice when no path exists
pub const REASON_NO_ROUTE: &str = "No route";
/// Reason sent when the in-flight delivery bound is reached
pub const REASON_QUEUE_FULL: &str = "Delivery queue full";
/// Reason sent when a send names an unknown message type
pub const REASON_UNSUPPORTED_TYPE: &str = "Unsupported message type";
/// Reason sent when a payload does not fit its message type
pub const REASON_INVALID_PAYLOAD: &str = "Invalid payload";

/// Stats with their assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Health ratios
    pub stats: MeshStats,
    /// Rule-table assessment of `stats`
    #[serde(rename = "insights")]
    pub insight: Insight,
}

/// Topology and stats read together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofReport {
    /// Live nodes
    pub topology: Vec<MeshNode>,
    /// Stats and assessment at the same instant
    #[serde(flatten)]
    pub report: StatsReport,
}

/// Event published by the mesh core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum MeshEvent {
    /// Full node list after a topology change
    #[serde(rename = "topology-update")]
    TopologyChanged(Vec<MeshNode>),
    /// Fresh stats and assessment
    #[serde(rename = "stats-update")]
    StatsChanged(StatsReport),
    /// A broadcast, or a direct packet reaching its recipient
    #[serde(rename = "message-received")]
    MessageDelivered(MessagePacket),
    /// Sent to the originator of a message that could not be delivered
    #[serde(rename = "message-failed")]
    MessageFailed {
        /// Intended recipient
        to: String,
        /// Why delivery failed
        reason: String,
    },
}

/// Who an event is for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "handle", rename_all = "lowercase")]
pub enum Audience {
    /// Every connected client
    All,
    /// One client
    Node(NodeHandle),
}

/// An event with its audience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Recipients
    pub audience: Audience,
    /// Payload
    pub event: MeshEvent,
}

impl Envelope {
    /// Encode as one line of JSON
    pub fn to_json_line(&self) -> MeshResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Capability to reach clients, supplied by the transport collaborator
pub trait MeshTransport: Send + Sync {
    /// Fan an event out to every connected client, in no particular order
    fn broadcast(&self, event: MeshEvent);
    /// Send an event to one client
    fn deliver(&self, handle: &NodeHandle, event: MeshEvent);
}

/// Publishes envelopes on a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: broadcast::Sender<Envelope>,
}

impl ChannelTransport {
    /// Create a transport whose channel buffers `capacity` envelopes per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every envelope published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    fn publish(&self, envelope: Envelope) {
        if self.tx.send(envelope).is_err() {
            trace!("No transport subscribers; event discarded");
        }
    }
}

impl MeshTransport for ChannelTransport {
    fn broadcast(&self, event: MeshEvent) {
        self.publish(Envelope {
            audience: Audience::All,
            event,
        });
    }

    fn deliver(&self, handle: &NodeHandle, event: MeshEvent) {
        self.publish(Envelope {
            audience: Audience::Node(handle.clone()),
            event,
        });
    }
}

/// Keeps every envelope in memory. Clones share the log.
#[derive(Debug, Default, Clone)]
pub struct RecordingTransport {
    log: Arc<Mutex<Vec<Envelope>>>,
}

impl RecordingTransport {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in publish order
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.lock().clone()
    }

    /// Events only, in publish order
    pub fn events(&self) -> Vec<MeshEvent> {
        self.lock().iter().map(|e| e.event.clone()).collect()
    }

    /// Events addressed to one client
    pub fn delivered_to(&self, handle: &NodeHandle) -> Vec<MeshEvent> {
        self.lock()
            .iter()
            .filter(|e| e.audience == Audience::Node(handle.clone()))
            .map(|e| e.event.clone())
            .collect()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Envelope>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MeshTransport for RecordingTransport {
    fn broadcast(&self, event: MeshEvent) {
        self.lock().push(Envelope {
            audience: Audience::All,
            event,
        });
    }

    fn deliver(&self, handle: &NodeHandle, event: MeshEvent) {
        self.lock().push(Envelope {
            audience: Audience::Node(handle.clone()),
            event,
        });
    }
}
