//! The three traversal strategies.
//!
//! All three drive the same [`SearchRules`] and differ only in iteration
//! order: exhaustive sampling needs no structure at all, single-structure
//! traversal descends the reference structure once per query point, and
//! dual-structure traversal descends a query structure and the reference
//! structure simultaneously so groups of nearby queries share pruning and
//! sampling decisions.

use smallvec::SmallVec;

use crate::ordering::SortPolicy;
use crate::search::rules::SearchRules;
use crate::search::stats::TraversalStats;
use crate::tree::{NodeId, SpatialIndex};

/// Exhaustive sampling: one distinct-sample draw from the reference set,
/// computed once and reused for every query point.
pub fn exhaustive_search<P: SortPolicy>(rules: &mut SearchRules<'_, P>, reference_len: usize) {
    let samples = rules.draw_distinct_samples(rules.num_samples_reqd(), reference_len);
    for query_index in 0..rules.query_set().len() {
        for &reference_index in &samples {
            rules.base_case(query_index, reference_index);
        }
    }
}

/// Depth-first descent of the reference structure for one query point at a
/// time.
pub struct SingleTreeTraverser<'r, 'a, P: SortPolicy> {
    rules: &'r mut SearchRules<'a, P>,
    num_prunes: u64,
}

impl<'r, 'a, P: SortPolicy> SingleTreeTraverser<'r, 'a, P> {
    pub fn new(rules: &'r mut SearchRules<'a, P>) -> Self {
        Self {
            rules,
            num_prunes: 0,
        }
    }

    /// Number of node visits that ended in a prune (including those satisfied
    /// by sampling).
    pub fn num_prunes(&self) -> u64 {
        self.num_prunes
    }

    /// Search the structure for one query point.
    pub fn traverse<T: SpatialIndex>(&mut self, tree: &T, query_index: usize) {
        self.recurse(tree, query_index, tree.root());
    }

    fn recurse<T: SpatialIndex>(&mut self, tree: &T, query_index: usize, node: NodeId) {
        if self.rules.score(tree, query_index, node).is_none() {
            self.num_prunes += 1;
            return;
        }

        if tree.is_leaf(node) {
            for reference_index in tree.point_range(node) {
                self.rules.base_case(query_index, reference_index);
            }
            return;
        }

        // Visit the child with the more favorable bound first so the query's
        // threshold tightens before the sibling is scored.
        let point = self.rules.query_set().point(query_index);
        let mut order: SmallVec<[(f32, NodeId); 2]> = tree
            .children(node)
            .iter()
            .map(|&child| (P::best_point_to_node(tree, child, point), child))
            .collect();
        order.sort_by(|a, b| {
            if P::is_better(a.0, b.0) {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            }
        });

        for (_, child) in order {
            self.recurse(tree, query_index, child);
        }
    }
}

/// Simultaneous depth-first descent of a query structure and the reference
/// structure.
///
/// The traverser owns a fresh [`TraversalStats`] overlay for the query
/// structure, so repeated searches over the same (caller-owned) structure
/// start from clean per-node state by construction.
pub struct DualTreeTraverser<'r, 'a, P: SortPolicy> {
    rules: &'r mut SearchRules<'a, P>,
    stats: TraversalStats,
    num_prunes: u64,
}

impl<'r, 'a, P: SortPolicy> DualTreeTraverser<'r, 'a, P> {
    pub fn new<T: SpatialIndex>(rules: &'r mut SearchRules<'a, P>, query_tree: &T) -> Self {
        let stats = TraversalStats::new(query_tree.num_nodes(), P::worst_distance());
        Self {
            rules,
            stats,
            num_prunes: 0,
        }
    }

    pub fn num_prunes(&self) -> u64 {
        self.num_prunes
    }

    /// Run the dual traversal from both roots.
    pub fn traverse<T: SpatialIndex>(&mut self, query_tree: &T, reference_tree: &T) {
        self.recurse(
            query_tree,
            query_tree.root(),
            reference_tree,
            reference_tree.root(),
        );
    }

    fn recurse<T: SpatialIndex>(
        &mut self,
        query_tree: &T,
        qnode: NodeId,
        reference_tree: &T,
        rnode: NodeId,
    ) {
        if self
            .rules
            .score_nodes(query_tree, qnode, reference_tree, rnode, &mut self.stats)
            .is_none()
        {
            self.num_prunes += 1;
            return;
        }

        match (query_tree.is_leaf(qnode), reference_tree.is_leaf(rnode)) {
            (true, true) => {
                // Base case each (query, reference) pair in the leaf pair.
                for query_index in query_tree.point_range(qnode) {
                    for reference_index in reference_tree.point_range(rnode) {
                        self.rules.base_case(query_index, reference_index);
                    }
                }
            }
            (true, false) => {
                // Recurse the reference side, more favorable child first.
                for child in self.reference_order(query_tree, qnode, reference_tree, rnode) {
                    self.recurse(query_tree, qnode, reference_tree, child);
                }
            }
            (false, true) => {
                for &child in query_tree.children(qnode) {
                    self.recurse(query_tree, child, reference_tree, rnode);
                }
            }
            (false, false) => {
                for &qchild in query_tree.children(qnode) {
                    for rchild in self.reference_order(query_tree, qchild, reference_tree, rnode) {
                        self.recurse(query_tree, qchild, reference_tree, rchild);
                    }
                }
            }
        }
    }

    /// Reference children of `rnode` ordered by how favorable their bound is
    /// for `qnode`.
    fn reference_order<T: SpatialIndex>(
        &self,
        query_tree: &T,
        qnode: NodeId,
        reference_tree: &T,
        rnode: NodeId,
    ) -> SmallVec<[NodeId; 2]> {
        let mut order: SmallVec<[(f32, NodeId); 2]> = reference_tree
            .children(rnode)
            .iter()
            .map(|&child| {
                (
                    P::best_node_to_node(query_tree, qnode, reference_tree, child),
                    child,
                )
            })
            .collect();
        order.sort_by(|a, b| {
            if P::is_better(a.0, b.0) {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            }
        });
        order.into_iter().map(|(_, child)| child).collect()
    }
}
