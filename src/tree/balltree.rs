//! Ball tree.
//!
//! Space-partitioning tree using hyperspheres: each node stores a center and
//! a radius covering all of its points. Splitting picks two poles (the point
//! farthest from the centroid, then the point farthest from that pole) and
//! assigns each point to the closer pole.
//!
//! Construction physically reorders the tree's copy of the dataset depth-
//! first, so every node covers a contiguous index range and is described by
//! just an offset and a length. The old-from-new permutation is returned to
//! the caller for mapping results back to original point order.
//!
//! Ball geometry is only valid for the L2 metric; building with another
//! metric is rejected.

use smallvec::SmallVec;

use crate::dataset::Dataset;
use crate::distance::{l2_distance, DistanceMetric};
use crate::error::{Result, SearchError};
use crate::tree::{NodeId, SpatialIndex};

/// Ball tree construction parameters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BallTreeParams {
    /// Stop splitting when a node covers at most this many points.
    pub max_leaf_size: usize,
}

impl Default for BallTreeParams {
    fn default() -> Self {
        Self { max_leaf_size: 20 }
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct BallNode {
    center: Vec<f32>,
    radius: f32,
    /// Start of this node's contiguous point range in the reordered dataset.
    start: usize,
    /// Length of the point range.
    count: usize,
    children: SmallVec<[NodeId; 2]>,
}

/// A ball tree over its own, depth-first-reordered copy of a dataset.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BallTree {
    dataset: Dataset,
    nodes: Vec<BallNode>,
    params: BallTreeParams,
}

impl BallTree {
    /// Build with explicit parameters. See [`SpatialIndex::build`] for the
    /// meaning of the returned permutation.
    pub fn with_params(
        dataset: Dataset,
        metric: DistanceMetric,
        params: BallTreeParams,
    ) -> Result<(Self, Vec<usize>)> {
        if metric != DistanceMetric::L2 {
            return Err(SearchError::InvalidParameter(
                "ball tree bounds require the L2 metric".to_string(),
            ));
        }
        if dataset.is_empty() {
            return Err(SearchError::EmptyDataset);
        }
        if params.max_leaf_size == 0 {
            return Err(SearchError::InvalidParameter(
                "max_leaf_size must be greater than 0".to_string(),
            ));
        }

        let n = dataset.len();
        let mut perm: Vec<usize> = (0..n).collect();
        let mut nodes = Vec::new();
        build_node(&dataset, &mut perm, 0, n, &params, &mut nodes);

        let reordered = dataset.permuted(&perm);
        let tree = Self {
            dataset: reordered,
            nodes,
            params,
        };
        Ok((tree, perm))
    }

    /// Construction parameters this tree was built with.
    pub fn params(&self) -> &BallTreeParams {
        &self.params
    }

    #[inline]
    fn node(&self, id: NodeId) -> &BallNode {
        &self.nodes[id]
    }
}

/// Recursively partition `perm[start..end]`, appending nodes depth-first.
/// Returns the new node's id.
fn build_node(
    dataset: &Dataset,
    perm: &mut [usize],
    start: usize,
    end: usize,
    params: &BallTreeParams,
    nodes: &mut Vec<BallNode>,
) -> NodeId {
    let count = end - start;
    let center = centroid(dataset, &perm[start..end]);

    // Radius and the first pole (farthest point from the centroid) come from
    // the same scan.
    let mut radius = 0.0f32;
    let mut left_pole = start;
    for i in start..end {
        let d = l2_distance(&center, dataset.point(perm[i]));
        if d > radius {
            radius = d;
            left_pole = i;
        }
    }

    let node_id = nodes.len();
    nodes.push(BallNode {
        center,
        radius,
        start,
        count,
        children: SmallVec::new(),
    });

    if count <= params.max_leaf_size {
        return node_id;
    }

    // Second pole: farthest from the first.
    let left_point = dataset.point(perm[left_pole]).to_vec();
    let mut right_pole = start;
    let mut right_dist = 0.0f32;
    for i in start..end {
        let d = l2_distance(&left_point, dataset.point(perm[i]));
        if d > right_dist {
            right_dist = d;
            right_pole = i;
        }
    }
    let right_point = dataset.point(perm[right_pole]).to_vec();

    // Partition in place: points closer to the left pole move to the front.
    let mut split = start;
    for i in start..end {
        let dl = l2_distance(&left_point, dataset.point(perm[i]));
        let dr = l2_distance(&right_point, dataset.point(perm[i]));
        if dl <= dr {
            perm.swap(split, i);
            split += 1;
        }
    }

    // Degenerate split (duplicate points): keep the node as a leaf.
    if split == start || split == end {
        return node_id;
    }

    let left = build_node(dataset, perm, start, split, params, nodes);
    let right = build_node(dataset, perm, split, end, params, nodes);
    nodes[node_id].children.push(left);
    nodes[node_id].children.push(right);
    node_id
}

fn centroid(dataset: &Dataset, indices: &[usize]) -> Vec<f32> {
    let mut center = vec![0.0f32; dataset.dim()];
    for &i in indices {
        for (c, v) in center.iter_mut().zip(dataset.point(i)) {
            *c += v;
        }
    }
    let n = indices.len() as f32;
    for c in center.iter_mut() {
        *c /= n;
    }
    center
}

impl SpatialIndex for BallTree {
    const REARRANGES_DATASET: bool = true;

    fn build(dataset: Dataset, metric: DistanceMetric) -> Result<(Self, Vec<usize>)> {
        Self::with_params(dataset, metric, BallTreeParams::default())
    }

    fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn metric(&self) -> DistanceMetric {
        DistanceMetric::L2
    }

    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn root(&self) -> NodeId {
        0
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    fn point_range(&self, node: NodeId) -> std::ops::Range<usize> {
        let n = self.node(node);
        n.start..n.start + n.count
    }

    fn min_distance_to_point(&self, node: NodeId, point: &[f32]) -> f32 {
        let n = self.node(node);
        (l2_distance(&n.center, point) - n.radius).max(0.0)
    }

    fn max_distance_to_point(&self, node: NodeId, point: &[f32]) -> f32 {
        let n = self.node(node);
        l2_distance(&n.center, point) + n.radius
    }

    fn min_distance_to_node(&self, node: NodeId, other: &Self, other_node: NodeId) -> f32 {
        let a = self.node(node);
        let b = other.node(other_node);
        (l2_distance(&a.center, &b.center) - a.radius - b.radius).max(0.0)
    }

    fn max_distance_to_node(&self, node: NodeId, other: &Self, other_node: NodeId) -> f32 {
        let a = self.node(node);
        let b = other.node(other_node);
        l2_distance(&a.center, &b.center) + a.radius + b.radius
    }
}
