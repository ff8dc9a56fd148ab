//! Distance metrics for dense vectors.
//!
//! The search engine consumes a metric as a pure `distance(a, b) -> f32`
//! function: symmetric and non-negative. No triangle inequality is enforced
//! here, but tree-based pruning is only sound when the metric is compatible
//! with the bounding geometry of the index structure (the bundled ball tree
//! assumes L2).

/// Distance metric for dense vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceMetric {
    /// Euclidean (L2) distance.
    #[default]
    L2,
    /// Squared Euclidean distance.
    SquaredL2,
    /// Cosine distance $1 - \cos(a,b)$. Computes norms; inputs need not be
    /// normalized.
    Cosine,
}

impl DistanceMetric {
    /// Compute distance between two vectors.
    ///
    /// If dimensions mismatch, this returns `f32::INFINITY` (so the pair is
    /// never selected as a nearest neighbor).
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => l2_distance(a, b),
            DistanceMetric::SquaredL2 => squared_l2_distance(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
        }
    }
}

/// L2 (Euclidean) distance.
#[inline]
#[must_use]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    squared_l2_distance(a, b).sqrt()
}

/// Squared L2 distance.
#[inline]
#[must_use]
pub fn squared_l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Cosine distance $1 - \cos(a,b)$.
#[inline]
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_matches_hand_computation() {
        let a = [0.0, 3.0];
        let b = [4.0, 0.0];
        assert!((l2_distance(&a, &b) - 5.0).abs() < 1e-6);
        assert!((squared_l2_distance(&a, &b) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = [1.0, -2.0, 0.5];
        let b = [0.25, 7.0, -1.0];
        for metric in [
            DistanceMetric::L2,
            DistanceMetric::SquaredL2,
            DistanceMetric::Cosine,
        ] {
            assert!((metric.distance(&a, &b) - metric.distance(&b, &a)).abs() < 1e-6);
            assert!(metric.distance(&a, &a) < 1e-6);
        }
    }

    #[test]
    fn mismatched_dimensions_are_infinitely_far() {
        assert_eq!(l2_distance(&[1.0], &[1.0, 2.0]), f32::INFINITY);
        assert_eq!(cosine_distance(&[1.0], &[1.0, 2.0]), f32::INFINITY);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_one() {
        let d = cosine_distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 1.0).abs() < 1e-6);
    }
}
