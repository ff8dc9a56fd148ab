//! Per-query bounded candidate list.
//!
//! Every traversal strategy mutates results exclusively through
//! [`CandidateSet::insert`], so the sortedness and capacity invariants live in
//! one place.

use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::ordering::SortPolicy;

/// Sentinel index reported for unfilled result slots.
pub const INVALID_INDEX: usize = usize::MAX;

/// The best-so-far `(reference index, distance)` pairs for one query point,
/// capped at `k` entries and kept sorted best-first under the policy `P`.
#[derive(Debug, Clone)]
pub struct CandidateSet<P: SortPolicy> {
    entries: SmallVec<[(usize, f32); 8]>,
    k: usize,
    _policy: PhantomData<P>,
}

impl<P: SortPolicy> CandidateSet<P> {
    /// Create an empty set with capacity `k`.
    pub fn new(k: usize) -> Self {
        Self {
            entries: SmallVec::with_capacity(k.min(64)),
            k,
            _policy: PhantomData,
        }
    }

    /// Number of stored candidates.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no candidate has been accepted yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The current pruning threshold: the k-th best distance, or the policy's
    /// worst distance while fewer than `k` candidates are stored.
    #[inline]
    pub fn threshold(&self) -> f32 {
        if self.entries.len() < self.k {
            P::worst_distance()
        } else {
            self.entries[self.k - 1].1
        }
    }

    /// Try to insert a candidate. Returns true if it was accepted.
    ///
    /// A pair no better than the current threshold is rejected when the set is
    /// full; otherwise it is placed in sorted position and the worst entry is
    /// dropped to stay within `k`.
    pub fn insert(&mut self, index: usize, distance: f32) -> bool {
        if self.k == 0 {
            return false;
        }
        if self.entries.len() == self.k && !P::is_better(distance, self.threshold()) {
            return false;
        }
        let pos = self
            .entries
            .partition_point(|&(_, d)| !P::is_better(distance, d));
        self.entries.insert(pos, (index, distance));
        self.entries.truncate(self.k);
        true
    }

    /// Stored candidates, best first.
    #[inline]
    pub fn entries(&self) -> &[(usize, f32)] {
        &self.entries
    }

    /// Consume the set into exactly `k` slots, padding unfilled positions with
    /// `(INVALID_INDEX, worst distance)`.
    pub fn into_filled(self) -> (Vec<usize>, Vec<f32>) {
        let mut indices = Vec::with_capacity(self.k);
        let mut distances = Vec::with_capacity(self.k);
        for (i, d) in self.entries {
            indices.push(i);
            distances.push(d);
        }
        while indices.len() < self.k {
            indices.push(INVALID_INDEX);
            distances.push(P::worst_distance());
        }
        (indices, distances)
    }
}
