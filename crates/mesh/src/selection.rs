//! Neighbor selection strategies for auto-connect.

use crate::node::NodeId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Picks which existing nodes a newcomer links to.
pub trait NeighborSelector: Send {
    /// Return up to `count` distinct entries of `candidates`.
    fn select(&mut self, candidates: &[NodeId], count: usize) -> Vec<NodeId>;
}

/// Uniform sampling without replacement.
#[derive(Debug)]
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    /// Seed from OS randomness
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sampling for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_else(Self::from_entropy)
    }
}

impl NeighborSelector for RandomSelector {
    fn select(&mut self, candidates: &[NodeId], count: usize) -> Vec<NodeId> {
        candidates
            .choose_multiple(&mut self.rng, count)
            .cloned()
            .collect()
    }
}

/// Always takes the earliest candidates, in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstCandidatesSelector;

impl NeighborSelector for FirstCandidatesSelector {
    fn select(&mut self, candidates: &[NodeId], count: usize) -> Vec<NodeId> {
        candidates.iter().take(count).cloned().collect()
    }
}
