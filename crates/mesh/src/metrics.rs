//! Delivery counters and the health ratios derived from them.

use serde::{Deserialize, Serialize};

/// Process-lifetime message counters. Never reset or decayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshCounters {
    /// Every accepted send
    pub total_messages: u64,
    /// Broadcasts plus direct packets that reached their recipient
    pub delivered_messages: u64,
    /// Direct packets with no route or whose recipient left
    pub dropped_messages: u64,
    /// Sum of route latencies of delivered direct packets (milliseconds)
    pub accumulated_latency_ms: u64,
}

impl MeshCounters {
    /// Sends not yet resolved as delivered or dropped
    pub fn in_flight(&self) -> u64 {
        self.total_messages
            .saturating_sub(self.delivered_messages + self.dropped_messages)
    }
}

/// Point-in-time network health figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshStats {
    /// Live nodes
    pub node_count: usize,
    /// delivered / total, 1 when nothing was sent
    pub delivery_success_rate: f64,
    /// Mean route latency of delivered messages (milliseconds)
    pub average_latency: f64,
    /// dropped / total, 0 when nothing was sent
    pub packet_drop_rate: f64,
}

/// Turns counters into [`MeshStats`]
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Derive health ratios from the counters and the current node count
    pub fn compute(counters: &MeshCounters, node_count: usize) -> MeshStats {
        let total = counters.total_messages as f64;
        let delivered = counters.delivered_messages as f64;

        let delivery_success_rate = if counters.total_messages > 0 {
            (delivered / total).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let average_latency = if counters.delivered_messages > 0 {
            counters.accumulated_latency_ms as f64 / delivered
        } else {
            0.0
        };
        let packet_drop_rate = if counters.total_messages > 0 {
            counters.dropped_messages as f64 / total
        } else {
            0.0
        };

        MeshStats {
            node_count,
            delivery_success_rate,
            average_latency,
            packet_drop_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_counters() {
        let stats = MetricsAggregator::compute(&MeshCounters::default(), 0);
        assert_eq!(stats.delivery_success_rate, 1.0);
        assert_eq!(stats.average_latency, 0.0);
        assert_eq!(stats.packet_drop_rate, 0.0);
        assert_eq!(stats.node_count, 0);
    }

    #[test]
    fn test_ratios() {
        let counters = MeshCounters {
            total_messages: 10,
            delivered_messages: 8,
            dropped_messages: 2,
            accumulated_latency_ms: 400,
        };
        let stats = MetricsAggregator::compute(&counters, 4);
        assert_eq!(stats.node_count, 4);
        assert!((stats.delivery_success_rate - 0.8).abs() < f64::EPSILON);
        assert!((stats.packet_drop_rate - 0.2).abs() < f64::EPSILON);
        assert!((stats.average_latency - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_in_flight_window() {
        let counters = MeshCounters {
            total_messages: 3,
            delivered_messages: 1,
            dropped_messages: 0,
            accumulated_latency_ms: 0,
        };
        assert_eq!(counters.in_flight(), 2);
        let stats = MetricsAggregator::compute(&counters, 2);
        assert!(stats.delivery_success_rate >= 0.0 && stats.delivery_success_rate <= 1.0);
    }

    #[test]
    fn test_stats_wire_format() {
        let stats = MetricsAggregator::compute(&MeshCounters::default(), 3);
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["nodeCount"], 3);
        assert_eq!(value["deliverySuccessRate"], 1.0);
        assert_eq!(value["packetDropRate"], 0.0);
    }
}
