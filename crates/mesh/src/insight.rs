//! Rule-based classification of mesh health.
//!
//! Rules are checked in order and the first match wins:
//! loss first, then latency, otherwise normal.

use crate::metrics::MeshStats;
use serde::{Deserialize, Serialize};

/// Drop rate above which the mesh is critical
pub const CRITICAL_DROP_RATE: f64 = 0.10;
/// Success rate below which the mesh is critical
pub const CRITICAL_SUCCESS_RATE: f64 = 0.90;
/// Average latency (ms) above which the mesh is degraded
pub const DEGRADED_LATENCY_MS: f64 = 200.0;

/// Heuristic risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Operating normally
    Low,
    /// Degraded performance
    Medium,
    /// Unstable
    Critical,
}

/// Assessment of a stats snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    /// One-line description
    pub summary: String,
    /// Classification
    pub risk_level: RiskLevel,
    /// Operator actions, most important first
    pub suggestions: Vec<String>,
}

/// Applies the fixed rule table
#[derive(Debug, Default, Clone, Copy)]
pub struct InsightEngine;

impl InsightEngine {
    /// Classify a stats snapshot
    pub fn assess(stats: &MeshStats) -> Insight {
        if stats.packet_drop_rate > CRITICAL_DROP_RATE
            || stats.delivery_success_rate < CRITICAL_SUCCESS_RATE
        {
            return Insight {
                summary: "Critical network instability detected. High packet loss indicates potential node failures or congestion.".to_string(),
                risk_level: RiskLevel::Critical,
                suggestions: vec![
                    "Deploy additional relay nodes to bridge gaps.".to_string(),
                    "Investigate nodes with high drop rates.".to_string(),
                ],
            };
        }

        if stats.average_latency > DEGRADED_LATENCY_MS {
            return Insight {
                summary: "Network performance is degraded. High latency detected.".to_string(),
                risk_level: RiskLevel::Medium,
                suggestions: vec![
                    "Optimize route paths.".to_string(),
                    "Check for interference in the mesh frequency.".to_string(),
                ],
            };
        }

        Insight {
            summary: "Network is operating within normal parameters.".to_string(),
            risk_level: RiskLevel::Low,
            suggestions: vec!["Maintain current topology.".to_string()],
        }
    }
}
