//! Per-node search state.
//!
//! Dual-structure traversal keeps two pieces of state per query-structure
//! node: the worst distance any point below the node still needs (its pruning
//! bound) and the number of reference samples already credited to the whole
//! subtree. The state lives in this overlay, indexed by node id and owned by
//! the traversal session, not in the structure itself; a fresh overlay per
//! search is what makes repeated searches over the same structure sound
//! without an explicit reset walk.

/// Mutable per-node statistics for one traversal session.
#[derive(Debug, Clone)]
pub struct TraversalStats {
    bound: Vec<f32>,
    samples_made: Vec<usize>,
    worst: f32,
}

impl TraversalStats {
    /// Fresh overlay for a structure with `num_nodes` nodes; every bound
    /// starts at the ordering's worst distance and every sample count at 0.
    pub fn new(num_nodes: usize, worst_distance: f32) -> Self {
        Self {
            bound: vec![worst_distance; num_nodes],
            samples_made: vec![0; num_nodes],
            worst: worst_distance,
        }
    }

    /// Clear all per-node state back to its initial values.
    pub fn reset(&mut self) {
        self.bound.fill(self.worst);
        self.samples_made.fill(0);
    }

    #[inline]
    pub fn bound(&self, node: usize) -> f32 {
        self.bound[node]
    }

    #[inline]
    pub fn set_bound(&mut self, node: usize, bound: f32) {
        self.bound[node] = bound;
    }

    #[inline]
    pub fn samples_made(&self, node: usize) -> usize {
        self.samples_made[node]
    }

    #[inline]
    pub fn set_samples_made(&mut self, node: usize, samples: usize) {
        self.samples_made[node] = samples;
    }

    #[inline]
    pub fn add_samples_made(&mut self, node: usize, samples: usize) {
        self.samples_made[node] += samples;
    }
}
