//! Pluggable result ordering.
//!
//! The engine runs the same traversal machinery for nearest-neighbor and
//! furthest-neighbor search; the direction of "better" and the node bound
//! geometry are the only differences, captured by [`SortPolicy`].

use crate::tree::{NodeId, SpatialIndex};

/// Ordering policy for candidate distances and node bounds.
///
/// Implementations are zero-sized; all methods are associated functions so a
/// policy can be selected at compile time as a type parameter.
pub trait SortPolicy: Copy + Clone + Default + Send + Sync + 'static {
    /// True if distance `a` ranks strictly better than `b` under this policy.
    fn is_better(a: f32, b: f32) -> bool;

    /// The worst representable distance; the sentinel for unfilled result
    /// slots and the initial pruning threshold.
    fn worst_distance() -> f32;

    /// The best representable distance.
    fn best_distance() -> f32;

    /// The worse of two distances.
    #[inline]
    fn worse_of(a: f32, b: f32) -> f32 {
        if Self::is_better(a, b) {
            b
        } else {
            a
        }
    }

    /// Best achievable distance from `point` to any point below `node`.
    fn best_point_to_node<T: SpatialIndex>(tree: &T, node: NodeId, point: &[f32]) -> f32;

    /// Best achievable distance between any point below `qnode` and any point
    /// below `rnode`.
    fn best_node_to_node<T: SpatialIndex>(
        query_tree: &T,
        qnode: NodeId,
        reference_tree: &T,
        rnode: NodeId,
    ) -> f32;
}

/// Nearest-neighbor ordering: smaller distances are better.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighbor;

impl SortPolicy for NearestNeighbor {
    #[inline]
    fn is_better(a: f32, b: f32) -> bool {
        a < b
    }

    #[inline]
    fn worst_distance() -> f32 {
        f32::INFINITY
    }

    #[inline]
    fn best_distance() -> f32 {
        0.0
    }

    #[inline]
    fn best_point_to_node<T: SpatialIndex>(tree: &T, node: NodeId, point: &[f32]) -> f32 {
        tree.min_distance_to_point(node, point)
    }

    #[inline]
    fn best_node_to_node<T: SpatialIndex>(
        query_tree: &T,
        qnode: NodeId,
        reference_tree: &T,
        rnode: NodeId,
    ) -> f32 {
        query_tree.min_distance_to_node(qnode, reference_tree, rnode)
    }
}

/// Furthest-neighbor ordering: larger distances are better.
#[derive(Debug, Clone, Copy, Default)]
pub struct FurthestNeighbor;

impl SortPolicy for FurthestNeighbor {
    #[inline]
    fn is_better(a: f32, b: f32) -> bool {
        a > b
    }

    #[inline]
    fn worst_distance() -> f32 {
        0.0
    }

    #[inline]
    fn best_distance() -> f32 {
        f32::INFINITY
    }

    #[inline]
    fn best_point_to_node<T: SpatialIndex>(tree: &T, node: NodeId, point: &[f32]) -> f32 {
        tree.max_distance_to_point(node, point)
    }

    #[inline]
    fn best_node_to_node<T: SpatialIndex>(
        query_tree: &T,
        qnode: NodeId,
        reference_tree: &T,
        rnode: NodeId,
    ) -> f32 {
        query_tree.max_distance_to_node(qnode, reference_tree, rnode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_prefers_small() {
        assert!(NearestNeighbor::is_better(1.0, 2.0));
        assert!(!NearestNeighbor::is_better(2.0, 1.0));
        assert_eq!(NearestNeighbor::worst_distance(), f32::INFINITY);
        assert_eq!(NearestNeighbor::worse_of(1.0, 2.0), 2.0);
    }

    #[test]
    fn furthest_prefers_large() {
        assert!(FurthestNeighbor::is_better(2.0, 1.0));
        assert!(!FurthestNeighbor::is_better(1.0, 2.0));
        assert_eq!(FurthestNeighbor::worst_distance(), 0.0);
        assert_eq!(FurthestNeighbor::worse_of(1.0, 2.0), 1.0);
    }
}
