//! Flat, structure-of-arrays point storage.
//!
//! Both the reference set and the query set are `Dataset`s: an ordered,
//! immutable-during-search collection of fixed-dimension `f32` points stored
//! row-major in a single allocation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, SearchError};

/// An ordered collection of `D`-dimensional points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dataset {
    data: Vec<f32>,
    dim: usize,
}

impl Dataset {
    /// Create a dataset from a flat row-major buffer.
    pub fn new(data: Vec<f32>, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(SearchError::InvalidParameter(
                "dimension must be greater than 0".to_string(),
            ));
        }
        if data.len() % dim != 0 {
            return Err(SearchError::InvalidParameter(format!(
                "buffer length {} is not a multiple of dimension {}",
                data.len(),
                dim
            )));
        }
        Ok(Self { data, dim })
    }

    /// Create a dataset from per-point rows. All rows must share a dimension.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        if dim == 0 {
            return Err(SearchError::EmptyDataset);
        }
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(SearchError::DimensionMismatch {
                    query_dim: row.len(),
                    reference_dim: dim,
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { data, dim })
    }

    /// Generate `n` points with coordinates uniform in `[0, 1)`.
    ///
    /// Deterministic for a fixed seed; used by tests and benches.
    pub fn random(n: usize, dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..n * dim).map(|_| rng.random::<f32>()).collect();
        Self { data, dim }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// True if the dataset holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Point dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Borrow point `i`.
    #[inline]
    pub fn point(&self, i: usize) -> &[f32] {
        let start = i * self.dim;
        &self.data[start..start + self.dim]
    }

    /// Build a new dataset whose point `i` is `self.point(perm[i])`.
    ///
    /// Used by index structures that physically reorder points for locality.
    pub fn permuted(&self, perm: &[usize]) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for &src in perm {
            data.extend_from_slice(self.point(src));
        }
        Self { data, dim: self.dim }
    }
}
