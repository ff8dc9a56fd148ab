//! Rank-approximate nearest and furthest neighbor search.
//!
//! Classic approximate-neighbor schemes bound the returned *distance*
//! relative to the true neighbor's. This crate bounds the returned *rank*
//! instead: each result is, with probability at least `alpha`, among the top
//! `tau` percent of reference points ordered by distance from the query. The
//! guarantee is met by sampling reference points without replacement; a
//! hypergeometric tail bound decides how many samples suffice, and tree
//! traversal concentrates those samples where they matter.
//!
//! # Quick start
//!
//! ```
//! use rann::{Dataset, DistanceMetric, RaSearch, RaSearchConfig};
//!
//! let reference = Dataset::random(500, 8, 42);
//! let queries = Dataset::random(10, 8, 7);
//!
//! let config = RaSearchConfig { tau: 10.0, alpha: 0.95, ..Default::default() };
//! let engine: RaSearch = RaSearch::new(&reference, DistanceMetric::L2, config).unwrap();
//! let results = engine.search(&queries, 5).unwrap();
//!
//! assert_eq!(results.neighbors.len(), 10);
//! assert_eq!(results.neighbors[0].len(), 5);
//! ```
//!
//! Three execution modes share one sampling protocol: exhaustive sampling
//! (`naive`), single-structure traversal (`single_mode`), and the default
//! dual-structure traversal, which builds a second structure over the query
//! set and prunes whole query subtrees at once. With `tau = 100` and
//! `alpha = 1` every mode degenerates to exact search, which the test suite
//! uses as an oracle.

pub mod candidate;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod ordering;
pub mod sampling;
pub mod search;
#[cfg(feature = "serde")]
pub mod snapshot;
pub mod tree;

pub use candidate::{CandidateSet, INVALID_INDEX};
pub use dataset::Dataset;
pub use distance::DistanceMetric;
pub use error::{Result, SearchError};
pub use ordering::{FurthestNeighbor, NearestNeighbor, SortPolicy};
pub use search::{RaSearch, RaSearchConfig, SearchResults};
#[cfg(feature = "serde")]
pub use snapshot::SearchSnapshot;
pub use tree::{BallTree, BallTreeParams, NodeId, SpatialIndex};
