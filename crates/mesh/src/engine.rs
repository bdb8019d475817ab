//! Mesh engine - owner of all mesh state
//!
//! Combines the topology store, message dispatch, counters and the
//! recent-message log behind one synchronous interface. Exactly one owner
//! drives an engine; `MeshService` wraps it in an actor so commands and
//! delivery timers are applied one at a time.
//!
//! Direct messages count toward `total` when sent but toward `delivered` or
//! `dropped` only when their timer fires, so `total == delivered + dropped`
//! holds only once nothing is in flight.

use crate::clock::{Clock, DeliveryScheduler, DeliveryTicket, SystemClock};
use crate::error::{MeshError, MeshResult};
use crate::history::MessageHistory;
use crate::insight::InsightEngine;
use crate::message::{DeliveryStatus, MessagePacket, MessagePayload, Recipient};
use crate::metrics::{MeshCounters, MetricsAggregator};
use crate::node::{MeshNode, NodeHandle};
use crate::routing::{RoutePath, RoutingEngine};
use crate::selection::{NeighborSelector, RandomSelector};
use crate::topology::TopologyStore;
use crate::transport::{
    MeshEvent, MeshTransport, ProofReport, StatsReport, REASON_INVALID_PAYLOAD, REASON_NO_ROUTE,
    REASON_QUEUE_FULL, REASON_UNSUPPORTED_TYPE,
};
use guardiangrid_core::MeshSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What happened to a send request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SendOutcome {
    /// Flooded to every connected node and counted as delivered
    Broadcast {
        /// Published packet
        packet: MessagePacket,
    },
    /// Routed; delivery resolves after the route latency
    Scheduled {
        /// Pending packet
        packet: MessagePacket,
        /// Route the packet follows
        route: RoutePath,
    },
    /// No path to the recipient; counted as dropped
    NoRoute {
        /// Intended recipient
        to: String,
    },
    /// In-flight bound reached; counted as dropped
    QueueFull {
        /// Intended recipient
        to: String,
    },
}

impl SendOutcome {
    /// Whether the send was dropped at once
    pub fn is_dropped(&self) -> bool {
        matches!(self, SendOutcome::NoRoute { .. } | SendOutcome::QueueFull { .. })
    }
}

#[derive(Debug)]
struct InFlight {
    packet: MessagePacket,
    latency_ms: u64,
}

/// Single owner of registry, counters and scheduled deliveries
pub struct MeshEngine {
    topology: TopologyStore,
    counters: MeshCounters,
    history: MessageHistory,
    in_flight: HashMap<String, InFlight>,
    max_pending: Option<usize>,
    selector: Box<dyn NeighborSelector>,
    scheduler: Box<dyn DeliveryScheduler>,
    clock: Box<dyn Clock>,
    transport: Box<dyn MeshTransport>,
}

impl MeshEngine {
    /// Create an engine using the host clock and the configured neighbor sampling
    pub fn new(
        settings: &MeshSettings,
        transport: Box<dyn MeshTransport>,
        scheduler: Box<dyn DeliveryScheduler>,
    ) -> Self {
        Self {
            topology: TopologyStore::new(),
            counters: MeshCounters::default(),
            history: MessageHistory::new(settings.history_capacity),
            in_flight: HashMap::new(),
            max_pending: settings.max_pending_deliveries,
            selector: Box::new(RandomSelector::from_seed_option(settings.neighbor_seed)),
            scheduler,
            clock: Box::new(SystemClock),
            transport,
        }
    }

    /// Replace the neighbor selection strategy
    pub fn with_selector(mut self, selector: Box<dyn NeighborSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ------------------------------------------------------------------
    // Topology commands
    // ------------------------------------------------------------------

    /// Register a node, link it into the mesh and publish the new topology.
    pub fn register(&mut self, name: &str, handle: NodeHandle) -> MeshNode {
        let node = self.topology.register(name, handle, self.clock.now_ms());
        self.admit(node)
    }

    /// Register under a caller-chosen id. Fails if the id is live or retired.
    pub fn register_as(
        &mut self,
        id: &str,
        name: &str,
        handle: NodeHandle,
    ) -> MeshResult<MeshNode> {
        let node = self
            .topology
            .register_with_id(id, name, handle, self.clock.now_ms())?;
        Ok(self.admit(node))
    }

    fn admit(&mut self, node: MeshNode) -> MeshNode {
        let linked = self.topology.auto_connect(&node.id, self.selector.as_mut());
        debug!(node_id = %node.id, links = linked.len(), "Auto-connect complete");
        self.publish_topology();
        self.topology.get(&node.id).cloned().unwrap_or(node)
    }

    /// Refresh a node's heartbeat. Unknown ids are ignored.
    pub fn heartbeat(&mut self, node_id: &str) -> bool {
        self.topology.heartbeat(node_id, self.clock.now_ms())
    }

    /// Link two nodes and publish the topology.
    ///
    /// Self-links and unknown ids are rejected without publishing.
    pub fn connect(&mut self, a: &str, b: &str) -> MeshResult<bool> {
        match self.topology.connect(a, b) {
            Ok(added) => {
                self.publish_topology();
                Ok(added)
            }
            Err(e) => {
                debug!(from = a, to = b, error = %e, "Connect rejected");
                Err(e)
            }
        }
    }

    /// Remove a node and its edges, then publish the topology.
    ///
    /// Packets already scheduled for it stay scheduled and are dropped when
    /// their timer fires.
    pub fn disconnect(&mut self, node_id: &str) -> Option<MeshNode> {
        let removed = self.topology.disconnect(node_id)?;
        self.publish_topology();
        Some(removed)
    }

    // ------------------------------------------------------------------
    // Message dispatch
    // ------------------------------------------------------------------

    /// Send a typed message.
    ///
    /// Broadcast-class payloads are flooded to every client and counted as
    /// delivered at once; the recipient is ignored. DIRECT payloads are
    /// routed and scheduled, or dropped if no route exists.
    pub fn send(&mut self, from: &str, to: Recipient, payload: MessagePayload) -> SendOutcome {
        self.counters.total_messages += 1;
        let outcome = if payload.message_type().is_broadcast_class() {
            self.flood(from, payload)
        } else {
            self.route_direct(from, to, payload)
        };
        self.publish_stats();
        outcome
    }

    /// Send a message given as a wire type name and untyped body.
    ///
    /// Bodies that cannot be decoded are refused before anything is counted,
    /// and the sender is told why.
    pub fn send_wire(
        &mut self,
        from: &str,
        to: &str,
        type_name: &str,
        content: serde_json::Value,
    ) -> MeshResult<SendOutcome> {
        match MessagePayload::from_wire(type_name, content) {
            Ok(payload) => Ok(self.send(from, Recipient::from(to), payload)),
            Err(e) => {
                warn!(from, message_type = type_name, error = %e, "Send refused");
                let reason = match e {
                    MeshError::UnsupportedMessageType(_) => REASON_UNSUPPORTED_TYPE,
                    _ => REASON_INVALID_PAYLOAD,
                };
                self.notify_failure(from, to, reason);
                Err(e)
            }
        }
    }

    fn flood(&mut self, from: &str, payload: MessagePayload) -> SendOutcome {
        if let Some(location) = payload.location() {
            if self.topology.set_location(from, location) {
                self.publish_topology();
            }
        }

        let packet = MessagePacket {
            id: Uuid::new_v4().to_string(),
            from: from.to_string(),
            to: Recipient::Broadcast,
            payload,
            path: Vec::new(),
            timestamp: self.clock.now_ms(),
            status: DeliveryStatus::Delivered,
        };
        self.transport.broadcast(MeshEvent::MessageDelivered(packet.clone()));
        self.counters.delivered_messages += 1;
        debug!(from, message_type = %packet.message_type(), "Broadcast delivered");
        SendOutcome::Broadcast { packet }
    }

    fn route_direct(&mut self, from: &str, to: Recipient, payload: MessagePayload) -> SendOutcome {
        let target = to.to_string();
        let route = match to.node_id() {
            Some(id) => RoutingEngine::require_path(&self.topology, from, id),
            None => Err(MeshError::NoRoute {
                from: from.to_string(),
                to: target.clone(),
            }),
        };
        let route = match route {
            Ok(route) => route,
            Err(e) => {
                self.counters.dropped_messages += 1;
                warn!(from, to = %target, error = %e, "Direct packet dropped");
                self.notify_failure(from, &target, REASON_NO_ROUTE);
                return SendOutcome::NoRoute { to: target };
            }
        };

        if let Some(limit) = self.max_pending {
            if self.in_flight.len() >= limit {
                self.counters.dropped_messages += 1;
                warn!(from, to = %target, limit, "Pending delivery bound reached");
                self.notify_failure(from, &target, REASON_QUEUE_FULL);
                return SendOutcome::QueueFull { to: target };
            }
        }

        let packet = MessagePacket {
            id: Uuid::new_v4().to_string(),
            from: from.to_string(),
            to,
            payload,
            path: route.path.clone(),
            timestamp: self.clock.now_ms(),
            status: DeliveryStatus::Pending,
        };
        debug!(
            from,
            to = %target,
            hops = route.hops,
            latency_ms = route.estimated_latency,
            "Direct packet scheduled"
        );

        self.history.record(packet.clone());
        self.in_flight.insert(
            packet.id.clone(),
            InFlight {
                packet: packet.clone(),
                latency_ms: route.estimated_latency,
            },
        );
        self.scheduler.schedule(
            Duration::from_millis(route.estimated_latency),
            DeliveryTicket {
                packet_id: packet.id.clone(),
            },
        );
        SendOutcome::Scheduled { packet, route }
    }

    /// Resolve a scheduled delivery.
    ///
    /// Delivers to the recipient if it is still registered, otherwise counts
    /// a drop. Returns `None` for tickets that are unknown or already resolved.
    pub fn complete_delivery(&mut self, ticket: &DeliveryTicket) -> Option<DeliveryStatus> {
        let InFlight {
            mut packet,
            latency_ms,
        } = self.in_flight.remove(&ticket.packet_id)?;

        let handle = packet
            .to
            .node_id()
            .and_then(|id| self.topology.get(id))
            .map(|node| node.handle.clone());

        let status = match handle {
            Some(handle) => {
                packet.status = DeliveryStatus::Delivered;
                self.transport
                    .deliver(&handle, MeshEvent::MessageDelivered(packet.clone()));
                self.counters.delivered_messages += 1;
                self.counters.accumulated_latency_ms += latency_ms;
                debug!(packet_id = %packet.id, latency_ms, "Direct packet delivered");
                DeliveryStatus::Delivered
            }
            None => {
                self.counters.dropped_messages += 1;
                info!(packet_id = %packet.id, to = %packet.to, "Recipient left before delivery");
                DeliveryStatus::Failed
            }
        };
        self.history.mark(&packet.id, status);
        self.publish_stats();
        Some(status)
    }

    fn notify_failure(&self, sender: &str, to: &str, reason: &str) {
        if let Some(node) = self.topology.get(sender) {
            self.transport.deliver(
                &node.handle,
                MeshEvent::MessageFailed {
                    to: to.to_string(),
                    reason: reason.to_string(),
                },
            );
        }
    }

    // ------------------------------------------------------------------
    // Publishing and queries
    // ------------------------------------------------------------------

    fn publish_topology(&self) {
        self.transport
            .broadcast(MeshEvent::TopologyChanged(self.topology.snapshot()));
        self.publish_stats();
    }

    fn publish_stats(&self) {
        self.transport.broadcast(MeshEvent::StatsChanged(self.stats()));
    }

    /// Copy of every live node
    pub fn topology(&self) -> Vec<MeshNode> {
        self.topology.snapshot()
    }

    /// Current stats and their assessment
    pub fn stats(&self) -> StatsReport {
        let stats = MetricsAggregator::compute(&self.counters, self.topology.len());
        StatsReport {
            insight: InsightEngine::assess(&stats),
            stats,
        }
    }

    /// Topology and stats read together
    pub fn proof(&self) -> ProofReport {
        ProofReport {
            topology: self.topology(),
            report: self.stats(),
        }
    }

    /// Recent direct packets, newest last
    pub fn recent_messages(&self) -> Vec<MessagePacket> {
        self.history.recent()
    }

    /// Raw counters
    pub fn counters(&self) -> MeshCounters {
        self.counters
    }

    /// Scheduled deliveries not yet resolved
    pub fn pending_deliveries(&self) -> usize {
        self.in_flight.len()
    }

    /// Read access to the topology store
    pub fn store(&self) -> &TopologyStore {
        &self.topology
    }
}

impl std::fmt::Debug for MeshEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshEngine")
            .field("nodes", &self.topology.len())
            .field("counters", &self.counters)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
