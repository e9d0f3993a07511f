//! Distance metric implementations for HNSW search.
//!
//! Three metrics are supported: squared Euclidean, cosine distance, and negated
//! inner product. All return a value where **lower is better**, so maximum
//! inner product maps to minimum distance. The metric is chosen once at
//! construction and dispatched through a plain `match`.

use serde::{Deserialize, Serialize};

/// Distance metric used for vector similarity computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Squared Euclidean distance (L2²). Range: \[0, ∞).
    L2,
    /// Cosine distance: `1 - cosine_similarity`. Range: \[0, 2\]; defined as 1
    /// when either vector has zero norm.
    Cosine,
    /// Negated inner product: `-dot(a, b)`. Lower = higher similarity.
    InnerProduct,
}

impl DistanceMetric {
    /// Computes the distance between two float vectors of equal dimension.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceMetric::L2 => euclidean_sq(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::InnerProduct => -dot_product(a, b),
        }
    }

    /// Wire code used by the snapshot format.
    pub(crate) fn to_code(self) -> i32 {
        match self {
            DistanceMetric::L2 => 0,
            DistanceMetric::Cosine => 1,
            DistanceMetric::InnerProduct => 2,
        }
    }

    /// Inverse of [`to_code`](Self::to_code); `None` for unknown codes.
    pub(crate) fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DistanceMetric::L2),
            1 => Some(DistanceMetric::Cosine),
            2 => Some(DistanceMetric::InnerProduct),
            _ => None,
        }
    }
}

fn euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = dot_product(a, a).sqrt();
    let norm_b = dot_product(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}
