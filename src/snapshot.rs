//! Serializable engine state (requires the `serde` feature).
//!
//! A [`SearchSnapshot`] captures everything a [`RaSearch`] engine needs to
//! resume searching: the configuration, the metric, and either the bare
//! reference dataset (naive mode) or the built structure with its
//! old-from-new permutation. Restoring never rebuilds the structure.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use crate::error::{Result, SearchError};
use crate::ordering::SortPolicy;
use crate::search::{RaSearch, RaSearchConfig};
use crate::tree::SpatialIndex;

/// Reference-side payload: what the engine traverses or scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SnapshotPayload<T> {
    /// Naive mode keeps only the dataset.
    Dataset(Dataset),
    /// Structured modes keep the built structure and the permutation that
    /// restores original point ordering in results.
    Tree {
        tree: T,
        old_from_new: Option<Vec<usize>>,
    },
}

/// Complete persisted engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSnapshot<T> {
    pub config: RaSearchConfig,
    pub metric: DistanceMetric,
    pub payload: SnapshotPayload<T>,
}

impl<'a, T, P> RaSearch<'a, T, P>
where
    T: SpatialIndex + Clone,
    P: SortPolicy,
{
    /// Capture this engine's state for persistence.
    ///
    /// Fails for engines holding a caller-owned structure by reference; the
    /// caller is the one who should persist it.
    pub fn to_snapshot(&self) -> Result<SearchSnapshot<T>> {
        let payload = if self.config().naive {
            SnapshotPayload::Dataset(self.reference_set().clone())
        } else {
            let (tree, old_from_new) = self
                .owned_tree()
                .ok_or_else(|| {
                    SearchError::IncompatibleMode(
                        "a borrowed reference structure cannot be snapshotted".to_string(),
                    )
                })?;
            SnapshotPayload::Tree {
                tree: tree.clone(),
                old_from_new: old_from_new.map(<[usize]>::to_vec),
            }
        };
        Ok(SearchSnapshot {
            config: self.config().clone(),
            metric: self.metric(),
            payload,
        })
    }

    /// Rebuild an engine from persisted state. The restored engine owns all
    /// of its resources.
    pub fn from_snapshot(snapshot: SearchSnapshot<T>) -> Result<RaSearch<'static, T, P>> {
        match snapshot.payload {
            SnapshotPayload::Dataset(dataset) => {
                if !snapshot.config.naive {
                    return Err(SearchError::IncompatibleMode(
                        "a dataset-only snapshot restores only into naive mode".to_string(),
                    ));
                }
                RaSearch::new_owned(dataset, snapshot.metric, snapshot.config)
            }
            SnapshotPayload::Tree { tree, old_from_new } => {
                if snapshot.config.naive {
                    return Err(SearchError::IncompatibleMode(
                        "a structure snapshot cannot restore into naive mode".to_string(),
                    ));
                }
                Ok(RaSearch::from_parts(
                    tree,
                    old_from_new,
                    snapshot.metric,
                    snapshot.config,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::NearestNeighbor;
    use crate::tree::BallTree;

    fn engine(naive: bool) -> RaSearch<'static, BallTree, NearestNeighbor> {
        let reference = Dataset::random(60, 3, 11);
        let config = RaSearchConfig {
            naive,
            tau: 100.0,
            alpha: 1.0,
            seed: Some(5),
            ..RaSearchConfig::default()
        };
        RaSearch::new_owned(reference, DistanceMetric::L2, config).unwrap()
    }

    #[test]
    fn snapshot_round_trip_preserves_results() {
        let original = engine(false);
        let queries = Dataset::random(7, 3, 99);
        let before = original.search(&queries, 4).unwrap();

        let bytes = serde_json::to_vec(&original.to_snapshot().unwrap()).unwrap();
        let snapshot: SearchSnapshot<BallTree> = serde_json::from_slice(&bytes).unwrap();
        let restored = RaSearch::<BallTree, NearestNeighbor>::from_snapshot(snapshot).unwrap();

        let after = restored.search(&queries, 4).unwrap();
        assert_eq!(before.neighbors, after.neighbors);
        assert_eq!(before.distances, after.distances);
    }

    #[test]
    fn naive_snapshot_round_trips() {
        let original = engine(true);
        let snapshot = original.to_snapshot().unwrap();
        assert!(matches!(snapshot.payload, SnapshotPayload::Dataset(_)));
        let restored = RaSearch::<BallTree, NearestNeighbor>::from_snapshot(snapshot).unwrap();
        let queries = Dataset::random(3, 3, 1);
        assert!(restored.search(&queries, 2).is_ok());
    }

    #[test]
    fn mismatched_payload_and_mode_is_rejected() {
        let mut snapshot = engine(true).to_snapshot().unwrap();
        snapshot.config.naive = false;
        assert!(RaSearch::<BallTree, NearestNeighbor>::from_snapshot(snapshot).is_err());
    }
}
