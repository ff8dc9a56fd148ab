//! Shared search policy for all traversal strategies.
//!
//! `SearchRules` owns the per-query candidate sets and the sampling budget
//! bookkeeping. The three traversal strategies only decide iteration order;
//! every point evaluation goes through [`SearchRules::base_case`] and every
//! prune/recurse decision through one of the `score` methods.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::candidate::CandidateSet;
use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use crate::ordering::SortPolicy;
use crate::sampling::{minimum_samples_reqd, obtain_distinct_samples};
use crate::search::stats::TraversalStats;
use crate::search::RaSearchConfig;
use crate::tree::{NodeId, SpatialIndex};

pub struct SearchRules<'a, P: SortPolicy> {
    reference_set: &'a Dataset,
    query_set: &'a Dataset,
    candidates: Vec<CandidateSet<P>>,
    metric: DistanceMetric,
    /// Reference and query sets are the same set; self-matches are skipped.
    same_set: bool,

    sample_at_leaves: bool,
    first_leaf_exact: bool,
    single_sample_limit: usize,

    /// Total samples each query owes under the rank guarantee.
    num_samples_reqd: usize,
    /// `num_samples_reqd / |reference set|`; a node's proportional share of
    /// the budget is this ratio times its descendant count.
    sampling_ratio: f64,
    /// Samples made so far, per query point.
    num_samples_made: Vec<usize>,

    num_dist_computations: u64,
    /// Last (query, reference) pair evaluated, with its distance, so a
    /// repeated base case neither recomputes nor double-counts.
    last_pair: Option<(usize, usize, f32)>,

    rng: StdRng,
}

impl<'a, P: SortPolicy> SearchRules<'a, P> {
    pub fn new(
        reference_set: &'a Dataset,
        query_set: &'a Dataset,
        k: usize,
        config: &RaSearchConfig,
        metric: DistanceMetric,
        same_set: bool,
    ) -> Self {
        let n = reference_set.len();
        let num_samples_reqd = minimum_samples_reqd(n, k, config.tau, config.alpha);
        let sampling_ratio = num_samples_reqd as f64 / n as f64;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        Self {
            reference_set,
            query_set,
            candidates: (0..query_set.len()).map(|_| CandidateSet::new(k)).collect(),
            metric,
            same_set,
            sample_at_leaves: config.sample_at_leaves,
            first_leaf_exact: config.first_leaf_exact,
            single_sample_limit: config.single_sample_limit,
            num_samples_reqd,
            sampling_ratio,
            num_samples_made: vec![0; query_set.len()],
            num_dist_computations: 0,
            last_pair: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[inline]
    pub fn query_set(&self) -> &'a Dataset {
        self.query_set
    }

    #[inline]
    pub fn num_samples_reqd(&self) -> usize {
        self.num_samples_reqd
    }

    /// Running count of metric evaluations. Exact and monotone.
    #[inline]
    pub fn num_dist_computations(&self) -> u64 {
        self.num_dist_computations
    }

    /// Draw `m` distinct indices from `[0, n)` with this search's RNG.
    pub fn draw_distinct_samples(&mut self, m: usize, n: usize) -> Vec<usize> {
        obtain_distinct_samples(&mut self.rng, m, n)
    }

    /// Consume the rules into the per-query candidate sets.
    pub fn into_candidates(self) -> (Vec<CandidateSet<P>>, u64) {
        (self.candidates, self.num_dist_computations)
    }

    /// Evaluate one (query, reference) pair: compute the distance, offer it
    /// to the query's candidate set, and credit one sample to the query.
    ///
    /// Idempotent for back-to-back repeats of the same pair, and a no-op for
    /// self-matches when reference and query sets are the same set.
    pub fn base_case(&mut self, query_index: usize, reference_index: usize) -> f32 {
        if self.same_set && query_index == reference_index {
            return 0.0;
        }
        if let Some((qi, ri, d)) = self.last_pair {
            if qi == query_index && ri == reference_index {
                return d;
            }
        }

        let distance = self.metric.distance(
            self.query_set.point(query_index),
            self.reference_set.point(reference_index),
        );
        self.num_dist_computations += 1;

        self.candidates[query_index].insert(reference_index, distance);
        self.num_samples_made[query_index] += 1;
        self.last_pair = Some((query_index, reference_index, distance));

        distance
    }

    /// Point-to-node prune/recurse decision for single-structure traversal.
    ///
    /// `Some(score)` means the traversal should descend (the score orders
    /// children); `None` means the node is finished: either it was pruned
    /// outright or its sampling share was drawn right here.
    pub fn score<T: SpatialIndex>(
        &mut self,
        tree: &T,
        query_index: usize,
        node: NodeId,
    ) -> Option<f32> {
        let distance = P::best_point_to_node(tree, node, self.query_set.point(query_index));
        let threshold = self.candidates[query_index].threshold();
        let num_descendants = tree.point_range(node).len();

        if P::is_better(distance, threshold)
            && self.num_samples_made[query_index] < self.num_samples_reqd
        {
            // The node could still improve this query and the budget is not
            // yet met.
            if self.first_leaf_exact && self.num_samples_made[query_index] == 0 {
                // Visit the first leaf exactly before any approximation.
                return Some(distance);
            }

            let owed = self.samples_owed(num_descendants, self.num_samples_made[query_index]);
            if !tree.is_leaf(node) {
                if owed > self.single_sample_limit {
                    // Too many samples owed to approximate from here; descend
                    // and let the children take their shares.
                    Some(distance)
                } else {
                    self.sample_from_node(tree, query_index, node, owed);
                    None
                }
            } else if self.sample_at_leaves {
                self.sample_from_node(tree, query_index, node, owed);
                None
            } else {
                // Leaf points are evaluated exhaustively by the traversal.
                Some(distance)
            }
        } else {
            // Provably incapable of improving the query, or budget already
            // met: prune, crediting the node's share of the budget without
            // computing any distances.
            self.num_samples_made[query_index] += self.fake_samples(num_descendants);
            None
        }
    }

    /// Node-to-node prune/recurse decision for dual-structure traversal.
    ///
    /// Refreshes the query node's aggregated statistics (worst bound across
    /// its subtree, samples credited below it) and then applies the same
    /// sampling protocol as the point-to-node case, drawing any owed samples
    /// once per query point under the node.
    pub fn score_nodes<T: SpatialIndex>(
        &mut self,
        query_tree: &T,
        qnode: NodeId,
        reference_tree: &T,
        rnode: NodeId,
        stats: &mut TraversalStats,
    ) -> Option<f32> {
        let distance = P::best_node_to_node(query_tree, qnode, reference_tree, rnode);
        self.refresh_query_stats(query_tree, qnode, stats);

        let bound = stats.bound(qnode);
        let samples_made = stats.samples_made(qnode);
        let num_descendants = reference_tree.point_range(rnode).len();

        if P::is_better(distance, bound) && samples_made < self.num_samples_reqd {
            if self.first_leaf_exact && samples_made == 0 {
                return Some(distance);
            }

            let owed = self.samples_owed(num_descendants, samples_made);
            if !reference_tree.is_leaf(rnode) {
                if owed > self.single_sample_limit {
                    Some(distance)
                } else {
                    self.sample_for_subtree(query_tree, qnode, reference_tree, rnode, owed);
                    stats.add_samples_made(qnode, owed);
                    None
                }
            } else if self.sample_at_leaves {
                self.sample_for_subtree(query_tree, qnode, reference_tree, rnode, owed);
                stats.add_samples_made(qnode, owed);
                None
            } else {
                Some(distance)
            }
        } else {
            stats.add_samples_made(qnode, self.fake_samples(num_descendants));
            None
        }
    }

    /// Samples still owed to a node of `num_descendants` points: its
    /// proportional share of the total budget, capped by what the query (or
    /// query subtree) has left.
    fn samples_owed(&self, num_descendants: usize, samples_made: usize) -> usize {
        let share = (self.sampling_ratio * num_descendants as f64).ceil() as usize;
        share.min(self.num_samples_reqd - samples_made)
    }

    /// Budget credit for a node pruned by distance: its proportional share,
    /// rounded down, with no distances computed.
    fn fake_samples(&self, num_descendants: usize) -> usize {
        (self.sampling_ratio * num_descendants as f64).floor() as usize
    }

    fn sample_from_node<T: SpatialIndex>(
        &mut self,
        tree: &T,
        query_index: usize,
        node: NodeId,
        owed: usize,
    ) {
        let range = tree.point_range(node);
        let picks = obtain_distinct_samples(&mut self.rng, owed, range.len());
        for pick in picks {
            self.base_case(query_index, range.start + pick);
        }
    }

    /// Draw an independent sample of `owed` reference points from `rnode`
    /// for every query point below `qnode`.
    fn sample_for_subtree<T: SpatialIndex>(
        &mut self,
        query_tree: &T,
        qnode: NodeId,
        reference_tree: &T,
        rnode: NodeId,
        owed: usize,
    ) {
        for query_index in query_tree.point_range(qnode) {
            self.sample_from_node(reference_tree, query_index, rnode, owed);
        }
    }

    /// Pull the query node's statistics up to date from below: samples from
    /// the minimum over children (or over its points when a leaf), the bound
    /// from the worst threshold anywhere in its subtree.
    ///
    /// Both aggregations are conservative: a node never claims more samples
    /// or a tighter bound than every point below it can justify.
    fn refresh_query_stats<T: SpatialIndex>(
        &self,
        query_tree: &T,
        qnode: NodeId,
        stats: &mut TraversalStats,
    ) {
        let (min_samples_below, bound_below) = if query_tree.is_leaf(qnode) {
            let mut min_samples = usize::MAX;
            let mut bound = P::best_distance();
            for i in query_tree.point_range(qnode) {
                min_samples = min_samples.min(self.num_samples_made[i]);
                bound = P::worse_of(bound, self.candidates[i].threshold());
            }
            (min_samples, bound)
        } else {
            let mut min_samples = usize::MAX;
            let mut bound = P::best_distance();
            for &child in query_tree.children(qnode) {
                min_samples = min_samples.min(stats.samples_made(child));
                bound = P::worse_of(bound, stats.bound(child));
            }
            (min_samples, bound)
        };

        if min_samples_below != usize::MAX {
            stats.set_samples_made(qnode, stats.samples_made(qnode).max(min_samples_below));
        }
        stats.set_bound(qnode, bound_below);
    }
}
