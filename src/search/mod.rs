//! The rank-approximate search engine.
//!
//! [`RaSearch`] owns the search configuration, owns or borrows the reference
//! structure (or, in naive mode, just the reference dataset), dispatches one
//! of the three traversal strategies per search call, and restores original
//! point ordering in the results when the structure reordered points.

pub mod remap;
pub mod rules;
pub mod stats;
pub mod traversal;

pub use stats::TraversalStats;

use std::fmt;
use std::marker::PhantomData;

use crate::candidate::CandidateSet;
use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use crate::error::{Result, SearchError};
use crate::ordering::{NearestNeighbor, SortPolicy};
use crate::sampling::top_rank_count;
use crate::search::remap::remap_results;
use crate::search::rules::SearchRules;
use crate::search::traversal::{exhaustive_search, DualTreeTraverser, SingleTreeTraverser};
use crate::tree::{BallTree, SpatialIndex};

/// Search configuration.
///
/// `tau` is the rank percentile defining "top rank" and `alpha` the required
/// confidence: each returned candidate is, with probability at least `alpha`,
/// within the top `tau` percent of reference points by distance. `alpha = 1`
/// together with `tau = 100` degenerates to exact search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RaSearchConfig {
    /// Brute-force-with-sampling: no structure is built or traversed.
    pub naive: bool,
    /// Single-structure traversal instead of dual-structure. Ignored when
    /// `naive` is set.
    pub single_mode: bool,
    /// Rank percentile in `(0, 100]`.
    pub tau: f64,
    /// Required confidence in `(0, 1]`.
    pub alpha: f64,
    /// Sample inside leaves instead of evaluating them exhaustively.
    pub sample_at_leaves: bool,
    /// Search the first leaf visited per query exhaustively before any
    /// approximation.
    pub first_leaf_exact: bool,
    /// Largest per-node sample count that may be drawn in place of descending
    /// into the node.
    pub single_sample_limit: usize,
    /// RNG seed; searches are deterministic for a fixed seed.
    pub seed: Option<u64>,
}

impl Default for RaSearchConfig {
    fn default() -> Self {
        Self {
            naive: false,
            single_mode: false,
            tau: 5.0,
            alpha: 0.95,
            sample_at_leaves: false,
            first_leaf_exact: false,
            single_sample_limit: 20,
            seed: None,
        }
    }
}

impl RaSearchConfig {
    fn validate(&self) -> Result<()> {
        if !(self.tau > 0.0 && self.tau <= 100.0) {
            return Err(SearchError::InvalidParameter(format!(
                "tau must be in (0, 100], got {}",
                self.tau
            )));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(SearchError::InvalidParameter(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Per-query search output: exactly `k` slots per query, sorted under the
/// active ordering, padded with `(INVALID_INDEX, worst distance)` when fewer
/// than `k` valid candidates exist.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub k: usize,
    /// `neighbors[q][j]` is the reference index of query `q`'s j-th result.
    pub neighbors: Vec<Vec<usize>>,
    /// `distances[q][j]` is the matching distance.
    pub distances: Vec<Vec<f32>>,
    /// Exact count of metric evaluations performed by this search.
    pub num_dist_computations: u64,
    /// Node visits that ended in a prune (0 in exhaustive mode).
    pub num_prunes: u64,
}

impl SearchResults {
    fn from_candidates<P: SortPolicy>(
        k: usize,
        candidates: Vec<CandidateSet<P>>,
        num_dist_computations: u64,
        num_prunes: u64,
    ) -> Self {
        let mut neighbors = Vec::with_capacity(candidates.len());
        let mut distances = Vec::with_capacity(candidates.len());
        for set in candidates {
            let (n, d) = set.into_filled();
            neighbors.push(n);
            distances.push(d);
        }
        Self {
            k,
            neighbors,
            distances,
            num_dist_computations,
            num_prunes,
        }
    }
}

/// Owned-or-borrowed handle; teardown drops owned resources and leaves
/// borrowed ones alone by construction.
#[derive(Debug)]
enum Handle<'a, T> {
    Owned(T),
    Borrowed(&'a T),
}

impl<T> Handle<'_, T> {
    #[inline]
    fn get(&self) -> &T {
        match self {
            Handle::Owned(v) => v,
            Handle::Borrowed(v) => v,
        }
    }
}

/// Rank-approximate nearest (or furthest) neighbor search engine.
///
/// Generic over the spatial index type `T` and the result ordering `P`.
pub struct RaSearch<'a, T: SpatialIndex = BallTree, P: SortPolicy = NearestNeighbor> {
    /// The reference structure; absent in naive mode.
    tree: Option<Handle<'a, T>>,
    /// The reference dataset; kept only in naive mode (otherwise the
    /// structure's own reordered copy is the reference set).
    dataset: Option<Handle<'a, Dataset>>,
    /// Old-from-new permutation recorded when this engine built its own
    /// structure over a rearranging index type.
    old_from_new: Option<Vec<usize>>,
    config: RaSearchConfig,
    metric: DistanceMetric,
    _policy: PhantomData<P>,
}

// Manual impl: a derive would demand T: Debug through the handle.
impl<T: SpatialIndex, P: SortPolicy> fmt::Debug for RaSearch<'_, T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaSearch")
            .field("config", &self.config)
            .field("metric", &self.metric)
            .field("num_reference_points", &self.reference_set().len())
            .finish_non_exhaustive()
    }
}

impl<'a, T: SpatialIndex, P: SortPolicy> RaSearch<'a, T, P> {
    /// Build an engine over a borrowed reference dataset.
    ///
    /// Unless `config.naive` is set, this builds (and owns) an index
    /// structure over a copy of the dataset, recording the old-from-new remap
    /// when the structure type reorders points.
    pub fn new(
        reference_set: &'a Dataset,
        metric: DistanceMetric,
        config: RaSearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        if reference_set.is_empty() {
            return Err(SearchError::EmptyDataset);
        }
        if config.naive {
            return Ok(Self {
                tree: None,
                dataset: Some(Handle::Borrowed(reference_set)),
                old_from_new: None,
                config,
                metric,
                _policy: PhantomData,
            });
        }
        let (tree, old_from_new) = T::build(reference_set.clone(), metric)?;
        Ok(Self {
            tree: Some(Handle::Owned(tree)),
            dataset: None,
            old_from_new: T::REARRANGES_DATASET.then_some(old_from_new),
            config,
            metric,
            _policy: PhantomData,
        })
    }

    /// Build an engine that owns its reference dataset outright.
    pub fn new_owned(
        reference_set: Dataset,
        metric: DistanceMetric,
        config: RaSearchConfig,
    ) -> Result<RaSearch<'static, T, P>> {
        config.validate()?;
        if reference_set.is_empty() {
            return Err(SearchError::EmptyDataset);
        }
        if config.naive {
            return Ok(RaSearch {
                tree: None,
                dataset: Some(Handle::Owned(reference_set)),
                old_from_new: None,
                config,
                metric,
                _policy: PhantomData,
            });
        }
        let (tree, old_from_new) = T::build(reference_set, metric)?;
        Ok(RaSearch {
            tree: Some(Handle::Owned(tree)),
            dataset: None,
            old_from_new: T::REARRANGES_DATASET.then_some(old_from_new),
            config,
            metric,
            _policy: PhantomData,
        })
    }

    /// Use a caller-supplied, caller-owned reference structure. The engine
    /// never frees it, and performs no reference-axis remapping (the caller
    /// holds whatever permutation its build produced).
    pub fn with_tree(reference_tree: &'a T, config: RaSearchConfig) -> Result<Self> {
        config.validate()?;
        if config.naive {
            return Err(SearchError::IncompatibleMode(
                "an external reference structure cannot be used in naive mode".to_string(),
            ));
        }
        let metric = reference_tree.metric();
        Ok(Self {
            tree: Some(Handle::Borrowed(reference_tree)),
            dataset: None,
            old_from_new: None,
            config,
            metric,
            _policy: PhantomData,
        })
    }

    /// The reference set searches run against (structure order when the
    /// structure reordered points).
    pub fn reference_set(&self) -> &Dataset {
        match (&self.tree, &self.dataset) {
            (Some(tree), _) => tree.get().dataset(),
            (None, Some(dataset)) => dataset.get(),
            (None, None) => unreachable!("engine holds a structure or a dataset"),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &RaSearchConfig {
        &self.config
    }

    /// Active metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// The engine's own structure and its remap, if it owns one.
    #[cfg(feature = "serde")]
    pub(crate) fn owned_tree(&self) -> Option<(&T, Option<&[usize]>)> {
        match &self.tree {
            Some(Handle::Owned(tree)) => Some((tree, self.old_from_new.as_deref())),
            _ => None,
        }
    }

    /// Reassemble an engine around an already-built structure.
    #[cfg(feature = "serde")]
    pub(crate) fn from_parts(
        tree: T,
        old_from_new: Option<Vec<usize>>,
        metric: DistanceMetric,
        config: RaSearchConfig,
    ) -> RaSearch<'static, T, P> {
        RaSearch {
            tree: Some(Handle::Owned(tree)),
            dataset: None,
            old_from_new,
            config,
            metric,
            _policy: PhantomData,
        }
    }

    fn validate_search(&self, query_set: &Dataset, k: usize) -> Result<()> {
        let reference = self.reference_set();
        if k == 0 || k > reference.len() {
            return Err(SearchError::InvalidParameter(format!(
                "k must be in 1..={}, got {k}",
                reference.len()
            )));
        }
        if query_set.is_empty() {
            return Err(SearchError::EmptyDataset);
        }
        if query_set.dim() != reference.dim() {
            return Err(SearchError::DimensionMismatch {
                query_dim: query_set.dim(),
                reference_dim: reference.dim(),
            });
        }
        // The rank guarantee is only meaningful when the top-tau slice can
        // hold k candidates.
        if top_rank_count(reference.len(), self.config.tau) < k {
            return Err(SearchError::InvalidParameter(format!(
                "tau = {} keeps fewer than k = {k} of {} reference points",
                self.config.tau,
                reference.len()
            )));
        }
        Ok(())
    }

    #[inline]
    fn single_mode(&self) -> bool {
        // Naive mode never traverses a structure.
        !self.config.naive && self.config.single_mode
    }

    /// Search for the `k` best reference neighbors of every point in
    /// `query_set`, under the configured mode and rank guarantee.
    pub fn search(&self, query_set: &Dataset, k: usize) -> Result<SearchResults> {
        self.validate_search(query_set, k)?;
        let reference = self.reference_set();

        let mut results = if self.config.naive {
            let mut rules =
                SearchRules::<P>::new(reference, query_set, k, &self.config, self.metric, false);
            exhaustive_search(&mut rules, reference.len());
            let (candidates, dist_count) = rules.into_candidates();
            SearchResults::from_candidates(k, candidates, dist_count, 0)
        } else if self.single_mode() {
            let tree = self.tree.as_ref().expect("non-naive engine has a structure");
            let mut rules =
                SearchRules::<P>::new(reference, query_set, k, &self.config, self.metric, false);
            let mut traverser = SingleTreeTraverser::new(&mut rules);
            for query_index in 0..query_set.len() {
                traverser.traverse(tree.get(), query_index);
            }
            let num_prunes = traverser.num_prunes();
            let (candidates, dist_count) = rules.into_candidates();
            SearchResults::from_candidates(k, candidates, dist_count, num_prunes)
        } else {
            // Dual mode: build a temporary query structure for this call.
            let tree = self.tree.as_ref().expect("non-naive engine has a structure");
            let (query_tree, old_from_new_queries) = T::build(query_set.clone(), self.metric)?;
            let mut rules = SearchRules::<P>::new(
                reference,
                query_tree.dataset(),
                k,
                &self.config,
                self.metric,
                false,
            );
            let mut traverser = DualTreeTraverser::new(&mut rules, &query_tree);
            traverser.traverse(&query_tree, tree.get());
            let num_prunes = traverser.num_prunes();
            let (candidates, dist_count) = rules.into_candidates();
            let mut results = SearchResults::from_candidates(k, candidates, dist_count, num_prunes);
            // The temporary query structure reordered the query axis; undo
            // that here while the reference axis is handled below.
            if T::REARRANGES_DATASET {
                remap_results(&mut results, None, Some(&old_from_new_queries));
            }
            results
        };

        remap_results(&mut results, self.old_from_new.as_deref(), None);
        Ok(results)
    }

    /// Dual-structure search over a caller-supplied, caller-owned query
    /// structure. Query-axis ordering is the structure's own; only the
    /// reference axis is remapped.
    ///
    /// Fails with [`SearchError::IncompatibleMode`] when the engine is
    /// configured for naive or single-structure search; neither traverses a
    /// query structure.
    pub fn search_with_tree(&self, query_tree: &T, k: usize) -> Result<SearchResults> {
        if self.config.naive || self.config.single_mode {
            return Err(SearchError::IncompatibleMode(
                "a query structure requires dual-structure mode".to_string(),
            ));
        }
        let query_set = query_tree.dataset();
        self.validate_search(query_set, k)?;
        let reference = self.reference_set();
        let tree = self.tree.as_ref().expect("non-naive engine has a structure");

        let mut rules =
            SearchRules::<P>::new(reference, query_set, k, &self.config, self.metric, false);
        let mut traverser = DualTreeTraverser::new(&mut rules, query_tree);
        traverser.traverse(query_tree, tree.get());
        let num_prunes = traverser.num_prunes();
        let (candidates, dist_count) = rules.into_candidates();

        let mut results = SearchResults::from_candidates(k, candidates, dist_count, num_prunes);
        remap_results(&mut results, self.old_from_new.as_deref(), None);
        Ok(results)
    }

    /// Self-search: the query set is the reference set, self-matches are
    /// excluded, and results are reported in original reference order on
    /// both axes.
    pub fn search_self(&self, k: usize) -> Result<SearchResults> {
        let reference = self.reference_set();
        // Self-matches are excluded, so at most len - 1 neighbors exist.
        if k == 0 || k >= reference.len() {
            return Err(SearchError::InvalidParameter(format!(
                "k must be in 1..{} for self-search, got {k}",
                reference.len()
            )));
        }
        if top_rank_count(reference.len(), self.config.tau) < k {
            return Err(SearchError::InvalidParameter(format!(
                "tau = {} keeps fewer than k = {k} of {} reference points",
                self.config.tau,
                reference.len()
            )));
        }

        let mut rules =
            SearchRules::<P>::new(reference, reference, k, &self.config, self.metric, true);

        let mut num_prunes = 0;
        if self.config.naive {
            exhaustive_search(&mut rules, reference.len());
        } else if self.single_mode() {
            let tree = self.tree.as_ref().expect("non-naive engine has a structure");
            let mut traverser = SingleTreeTraverser::new(&mut rules);
            for query_index in 0..reference.len() {
                traverser.traverse(tree.get(), query_index);
            }
            num_prunes = traverser.num_prunes();
        } else {
            let tree = self.tree.as_ref().expect("non-naive engine has a structure");
            let mut traverser = DualTreeTraverser::new(&mut rules, tree.get());
            traverser.traverse(tree.get(), tree.get());
            num_prunes = traverser.num_prunes();
        }

        let (candidates, dist_count) = rules.into_candidates();
        let mut results = SearchResults::from_candidates(k, candidates, dist_count, num_prunes);
        // One permutation serves both axes here: the query rows and the
        // stored reference indices live in the same reordered set.
        remap_results(
            &mut results,
            self.old_from_new.as_deref(),
            self.old_from_new.as_deref(),
        );
        Ok(results)
    }
}
