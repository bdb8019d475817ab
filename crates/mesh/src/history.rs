//! Bounded log of recent packets, kept for display only.

use crate::message::{DeliveryStatus, MessagePacket};
use std::collections::VecDeque;

/// Recent packets, oldest evicted first
#[derive(Debug)]
pub struct MessageHistory {
    entries: VecDeque<MessagePacket>,
    capacity: usize,
}

impl MessageHistory {
    /// Create a log holding at most `capacity` packets (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a packet, evicting the oldest when full
    pub fn record(&mut self, packet: MessagePacket) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(packet);
    }

    /// Update a logged packet's status. Returns false if it was already evicted.
    pub fn mark(&mut self, packet_id: &str, status: DeliveryStatus) -> bool {
        match self.entries.iter_mut().rev().find(|p| p.id == packet_id) {
            Some(packet) => {
                packet.status = status;
                true
            }
            None => false,
        }
    }

    /// Copy of the log, newest last
    pub fn recent(&self) -> Vec<MessagePacket> {
        self.entries.iter().cloned().collect()
    }

    /// Number of logged packets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is logged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of packets kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
