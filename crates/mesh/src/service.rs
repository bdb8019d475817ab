//! Mesh service - single-owner actor around [`MeshEngine`]
//!
//! One tokio task owns the engine and drains an ordered command queue.
//! Delivery timers post their completion back onto the same queue, so
//! commands that arrive while a packet is in flight interleave with its
//! resolution but never race it.

use crate::clock::{Clock, DeliveryScheduler, DeliveryTicket};
use crate::engine::{MeshEngine, SendOutcome};
use crate::error::{MeshError, MeshResult};
use crate::message::{MessagePacket, MessagePayload, Recipient};
use crate::metrics::MeshCounters;
use crate::node::{MeshNode, NodeHandle};
use crate::selection::NeighborSelector;
use crate::transport::{MeshTransport, ProofReport, StatsReport};
use guardiangrid_core::MeshSettings;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

enum Command {
    Register {
        name: String,
        handle: NodeHandle,
        reply: oneshot::Sender<MeshNode>,
    },
    RegisterAs {
        id: String,
        name: String,
        handle: NodeHandle,
        reply: oneshot::Sender<MeshResult<MeshNode>>,
    },
    Heartbeat {
        node_id: String,
        reply: oneshot::Sender<bool>,
    },
    Connect {
        node_id: String,
        target_id: String,
        reply: oneshot::Sender<MeshResult<bool>>,
    },
    Disconnect {
        node_id: String,
        reply: oneshot::Sender<Option<MeshNode>>,
    },
    Send {
        from: String,
        to: Recipient,
        payload: MessagePayload,
        reply: oneshot::Sender<SendOutcome>,
    },
    SendWire {
        from: String,
        to: String,
        type_name: String,
        content: serde_json::Value,
        reply: oneshot::Sender<MeshResult<SendOutcome>>,
    },
    CompleteDelivery(DeliveryTicket),
    GetTopology(oneshot::Sender<Vec<MeshNode>>),
    GetStats(oneshot::Sender<StatsReport>),
    GetProof(oneshot::Sender<ProofReport>),
    GetHistory(oneshot::Sender<Vec<MessagePacket>>),
    GetCounters(oneshot::Sender<(MeshCounters, usize)>),
    Shutdown,
}

/// Schedules deliveries on tokio timers that report back to the actor.
///
/// Holds only a weak sender so pending timers do not keep a service alive
/// once every [`MeshHandle`] is gone.
struct TokioScheduler {
    cmd_tx: mpsc::WeakSender<Command>,
}

impl DeliveryScheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, ticket: DeliveryTicket) {
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match cmd_tx.upgrade() {
                Some(tx) => {
                    if tx.send(Command::CompleteDelivery(ticket)).await.is_err() {
                        debug!("Mesh service stopped before delivery fired");
                    }
                }
                None => debug!("Mesh service dropped before delivery fired"),
            }
        });
    }
}

/// Builder for a [`MeshService`]
pub struct MeshServiceBuilder {
    settings: MeshSettings,
    selector: Option<Box<dyn NeighborSelector>>,
    clock: Option<Box<dyn Clock>>,
}

impl MeshServiceBuilder {
    /// Override the neighbor selection strategy
    pub fn selector(mut self, selector: Box<dyn NeighborSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Override the timestamp source
    pub fn clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the settings and start the actor on the current tokio runtime
    pub fn spawn<T: MeshTransport + 'static>(self, transport: T) -> MeshResult<MeshService> {
        self.settings.validate()?;
        let (cmd_tx, cmd_rx) = mpsc::channel(self.settings.command_buffer);
        let scheduler = TokioScheduler {
            cmd_tx: cmd_tx.downgrade(),
        };

        let mut engine = MeshEngine::new(&self.settings, Box::new(transport), Box::new(scheduler));
        if let Some(selector) = self.selector {
            engine = engine.with_selector(selector);
        }
        if let Some(clock) = self.clock {
            engine = engine.with_clock(clock);
        }

        let task = tokio::spawn(run(engine, cmd_rx));
        info!("Mesh service started");
        Ok(MeshService {
            handle: MeshHandle { cmd_tx },
            task,
        })
    }
}

/// A running mesh actor
pub struct MeshService {
    handle: MeshHandle,
    task: JoinHandle<()>,
}

impl MeshService {
    /// Start configuring a service
    pub fn builder(settings: MeshSettings) -> MeshServiceBuilder {
        MeshServiceBuilder {
            settings,
            selector: None,
            clock: None,
        }
    }

    /// Start a service with default strategies
    pub fn spawn<T: MeshTransport + 'static>(
        settings: MeshSettings,
        transport: T,
    ) -> MeshResult<Self> {
        Self::builder(settings).spawn(transport)
    }

    /// A handle for issuing commands
    pub fn handle(&self) -> MeshHandle {
        self.handle.clone()
    }

    /// Stop the actor and wait for it to exit.
    ///
    /// Deliveries still scheduled at this point are abandoned.
    pub async fn shutdown(self) {
        let _ = self.handle.cmd_tx.send(Command::Shutdown).await;
        let _ = self.task.await;
    }
}

async fn run(mut engine: MeshEngine, mut cmd_rx: mpsc::Receiver<Command>) {
    while let Some(command) = cmd_rx.recv().await {
        match command {
            Command::Register {
                name,
                handle,
                reply,
            } => {
                let _ = reply.send(engine.register(&name, handle));
            }
            Command::RegisterAs {
                id,
                name,
                handle,
                reply,
            } => {
                let _ = reply.send(engine.register_as(&id, &name, handle));
            }
            Command::Heartbeat { node_id, reply } => {
                let _ = reply.send(engine.heartbeat(&node_id));
            }
            Command::Connect {
                node_id,
                target_id,
                reply,
            } => {
                let _ = reply.send(engine.connect(&node_id, &target_id));
            }
            Command::Disconnect { node_id, reply } => {
                let _ = reply.send(engine.disconnect(&node_id));
            }
            Command::Send {
                from,
                to,
                payload,
                reply,
            } => {
                let _ = reply.send(engine.send(&from, to, payload));
            }
            Command::SendWire {
                from,
                to,
                type_name,
                content,
                reply,
            } => {
                let _ = reply.send(engine.send_wire(&from, &to, &type_name, content));
            }
            Command::CompleteDelivery(ticket) => {
                engine.complete_delivery(&ticket);
            }
            Command::GetTopology(reply) => {
                let _ = reply.send(engine.topology());
            }
            Command::GetStats(reply) => {
                let _ = reply.send(engine.stats());
            }
            Command::GetProof(reply) => {
                let _ = reply.send(engine.proof());
            }
            Command::GetHistory(reply) => {
                let _ = reply.send(engine.recent_messages());
            }
            Command::GetCounters(reply) => {
                let _ = reply.send((engine.counters(), engine.pending_deliveries()));
            }
            Command::Shutdown => break,
        }
    }
    let counters = engine.counters();
    info!(
        nodes = engine.store().len(),
        total = counters.total_messages,
        unresolved = counters.in_flight(),
        "Mesh service stopped"
    );
}

/// Cloneable command interface to a running [`MeshService`]
#[derive(Clone)]
pub struct MeshHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl MeshHandle {
    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> MeshResult<R> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| MeshError::ServiceUnavailable)?;
        rx.await.map_err(|_| MeshError::ServiceUnavailable)
    }

    /// Register a node reachable through `handle`
    pub async fn register(&self, name: &str, handle: NodeHandle) -> MeshResult<MeshNode> {
        self.request(|reply| Command::Register {
            name: name.to_string(),
            handle,
            reply,
        })
        .await
    }

    /// Register under a caller-chosen id
    pub async fn register_as(
        &self,
        id: &str,
        name: &str,
        handle: NodeHandle,
    ) -> MeshResult<MeshNode> {
        self.request(|reply| Command::RegisterAs {
            id: id.to_string(),
            name: name.to_string(),
            handle,
            reply,
        })
        .await?
    }

    /// Refresh a node's heartbeat; `false` if the node is unknown
    pub async fn heartbeat(&self, node_id: &str) -> MeshResult<bool> {
        self.request(|reply| Command::Heartbeat {
            node_id: node_id.to_string(),
            reply,
        })
        .await
    }

    /// Link two nodes
    pub async fn connect(&self, node_id: &str, target_id: &str) -> MeshResult<bool> {
        self.request(|reply| Command::Connect {
            node_id: node_id.to_string(),
            target_id: target_id.to_string(),
            reply,
        })
        .await?
    }

    /// Remove a node; `None` if it was not registered
    pub async fn disconnect(&self, node_id: &str) -> MeshResult<Option<MeshNode>> {
        self.request(|reply| Command::Disconnect {
            node_id: node_id.to_string(),
            reply,
        })
        .await
    }

    /// Send a typed message
    pub async fn send(
        &self,
        from: &str,
        to: impl Into<Recipient>,
        payload: MessagePayload,
    ) -> MeshResult<SendOutcome> {
        let to = to.into();
        self.request(|reply| Command::Send {
            from: from.to_string(),
            to,
            payload,
            reply,
        })
        .await
    }

    /// Send a message given as wire type name and untyped body
    pub async fn send_wire(
        &self,
        from: &str,
        to: &str,
        type_name: &str,
        content: serde_json::Value,
    ) -> MeshResult<SendOutcome> {
        self.request(|reply| Command::SendWire {
            from: from.to_string(),
            to: to.to_string(),
            type_name: type_name.to_string(),
            content,
            reply,
        })
        .await?
    }

    /// Snapshot of every live node
    pub async fn topology(&self) -> MeshResult<Vec<MeshNode>> {
        self.request(Command::GetTopology).await
    }

    /// Current stats and assessment
    pub async fn stats(&self) -> MeshResult<StatsReport> {
        self.request(Command::GetStats).await
    }

    /// Topology and stats read together
    pub async fn proof(&self) -> MeshResult<ProofReport> {
        self.request(Command::GetProof).await
    }

    /// Recent direct packets, newest last
    pub async fn recent_messages(&self) -> MeshResult<Vec<MessagePacket>> {
        self.request(Command::GetHistory).await
    }

    /// Raw counters and the number of deliveries still in flight
    pub async fn counters(&self) -> MeshResult<(MeshCounters, usize)> {
        self.request(Command::GetCounters).await
    }
}
