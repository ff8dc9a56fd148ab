//! Spatial index structures.
//!
//! The search engine treats the partitioning structure as an external
//! collaborator behind the narrow [`SpatialIndex`] interface: child nodes, a
//! contiguous point range per node, region-to-point and region-to-region
//! distance bounds, and a leaf test. Per-node mutable search state lives in a
//! [`crate::search::TraversalStats`] overlay, never in the structure itself,
//! so a built structure is immutable and freely shareable across searches.

pub mod balltree;

pub use balltree::{BallTree, BallTreeParams};

use std::ops::Range;

use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use crate::error::Result;

/// Identifier of a node within a [`SpatialIndex`]; nodes are arena-allocated
/// and the root is always node 0.
pub type NodeId = usize;

/// A recursive spatial partition over one dataset.
///
/// Implementations may physically reorder the dataset during construction for
/// locality; they then report `REARRANGES_DATASET = true` and return an
/// old-from-new permutation from [`SpatialIndex::build`], which the engine
/// uses to restore original point ordering in results.
pub trait SpatialIndex: Sized {
    /// Whether building physically reorders the dataset.
    const REARRANGES_DATASET: bool;

    /// Build a structure over `dataset`, consuming it.
    ///
    /// Returns the structure and the old-from-new index permutation:
    /// `map[new] == old`. Implementations that do not rearrange return the
    /// identity permutation.
    fn build(dataset: Dataset, metric: DistanceMetric) -> Result<(Self, Vec<usize>)>;

    /// The (possibly reordered) dataset this structure was built over.
    fn dataset(&self) -> &Dataset;

    /// The metric the structure's bounds are valid for.
    fn metric(&self) -> DistanceMetric;

    /// Total number of nodes; node ids are dense in `0..num_nodes()`.
    fn num_nodes(&self) -> usize;

    /// The root node.
    fn root(&self) -> NodeId;

    /// Child nodes of `node`; empty for leaves.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// True iff `node` has no children.
    #[inline]
    fn is_leaf(&self, node: NodeId) -> bool {
        self.children(node).is_empty()
    }

    /// The contiguous range of dataset indices covered by `node`.
    fn point_range(&self, node: NodeId) -> Range<usize>;

    /// Lower bound on the distance from `point` to any point below `node`.
    fn min_distance_to_point(&self, node: NodeId, point: &[f32]) -> f32;

    /// Upper bound on the distance from `point` to any point below `node`.
    fn max_distance_to_point(&self, node: NodeId, point: &[f32]) -> f32;

    /// Lower bound on the distance between any point below `node` and any
    /// point below `other_node` of `other`.
    fn min_distance_to_node(&self, node: NodeId, other: &Self, other_node: NodeId) -> f32;

    /// Upper bound on the distance between any point below `node` and any
    /// point below `other_node` of `other`.
    fn max_distance_to_node(&self, node: NodeId, other: &Self, other_node: NodeId) -> f32;
}
