//! Time sources and delivery scheduling.
//!
//! The engine never sleeps. It asks a [`DeliveryScheduler`] to hand a
//! [`DeliveryTicket`] back after the simulated route latency, and whoever
//! owns the engine feeds the ticket to `MeshEngine::complete_delivery`.
//! The actor service uses a tokio timer for this; synchronous tests use
//! [`ManualScheduler`] and advance virtual time explicitly.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of wall-clock timestamps
pub trait Clock: Send {
    /// Current time in Unix epoch milliseconds
    fn now_ms(&self) -> u64;
}

/// Reads the host clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Virtual clock advanced by hand. Clones share the same time.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Handle for one scheduled direct delivery
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeliveryTicket {
    /// Id of the packet awaiting delivery
    pub packet_id: String,
}

/// Arranges for a ticket to come back after a delay.
///
/// There is no cancellation: every scheduled ticket fires exactly once.
pub trait DeliveryScheduler: Send {
    /// Fire `ticket` once `delay` has elapsed
    fn schedule(&mut self, delay: Duration, ticket: DeliveryTicket);
}

#[derive(Debug, Default)]
struct ManualQueue {
    elapsed_ms: u64,
    seq: u64,
    // (due, insertion order, ticket); insertion order keeps equal deadlines FIFO
    due: BinaryHeap<Reverse<(u64, u64, DeliveryTicket)>>,
}

/// Virtual-time scheduler for deterministic tests.
///
/// Clones share one queue, so a test can keep a handle while the engine owns
/// another. When built with [`ManualScheduler::with_clock`], advancing also
/// moves the attached [`ManualClock`].
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    queue: Arc<Mutex<ManualQueue>>,
    clock: Option<ManualClock>,
}

impl ManualScheduler {
    /// Scheduler with its own virtual time
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler that drives `clock` as it advances
    pub fn with_clock(clock: ManualClock) -> Self {
        Self {
            queue: Arc::default(),
            clock: Some(clock),
        }
    }

    /// Number of tickets not yet due
    pub fn pending(&self) -> usize {
        self.lock().due.len()
    }

    /// Advance virtual time and return the tickets that fell due, earliest first
    pub fn advance(&self, by: Duration) -> Vec<DeliveryTicket> {
        if let Some(clock) = &self.clock {
            clock.advance(by);
        }
        let mut queue = self.lock();
        queue.elapsed_ms += by.as_millis() as u64;
        let now = queue.elapsed_ms;

        let mut fired = Vec::new();
        while let Some(Reverse((due_at, _, _))) = queue.due.peek() {
            if *due_at > now {
                break;
            }
            if let Some(Reverse((_, _, ticket))) = queue.due.pop() {
                fired.push(ticket);
            }
        }
        fired
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeliveryScheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, ticket: DeliveryTicket) {
        let mut queue = self.lock();
        let due_at = queue.elapsed_ms + delay.as_millis() as u64;
        let seq = queue.seq;
        queue.seq += 1;
        queue.due.push(Reverse((due_at, seq, ticket)));
    }
}
