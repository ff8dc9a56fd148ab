//! Error types for rann.

use thiserror::Error;

/// Errors that can occur while configuring or running a search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// Invalid parameter value (tau, alpha, k, leaf size, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between query and reference points.
    #[error("dimension mismatch: query has {query_dim} dimensions, reference has {reference_dim}")]
    DimensionMismatch {
        query_dim: usize,
        reference_dim: usize,
    },

    /// Empty dataset (no points to index or search).
    #[error("dataset is empty")]
    EmptyDataset,

    /// The requested entry point is incompatible with the configured search
    /// mode (e.g. a query-tree search while naive or single-tree mode is set).
    #[error("incompatible search mode: {0}")]
    IncompatibleMode(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
