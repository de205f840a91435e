// Vector-space helpers shared by the clusterer, analyzer and detector.
//
// Keyword embeddings are fixed-length f64 vectors produced elsewhere.
// Reported similarities (centrality, coherence, cross-cluster overlap) are
// cosine similarity clamped to 0.0..=1.0, so opposite vectors read as
// unrelated. The clusterer's distance is `1 - cos` on the raw value and runs
// 0.0..=2.0, the usual cosine metric for average linkage.

use crate::error::{Error, Result};

/// Cosine similarity between two vectors, clamped to 0.0..=1.0.
///
/// Mismatched lengths, empty vectors and zero vectors all score 0.0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    raw_cosine(a, b).clamp(0.0, 1.0)
}

/// Cosine distance on the unclamped similarity, in 0.0..=2.0.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    1.0 - raw_cosine(a, b)
}

/// Unclamped cosine in -1.0..=1.0; degenerate inputs are 0.0.
fn raw_cosine(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        0.0
    } else {
        // Rounding can push parallel vectors a hair past 1
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Mean vector of a non-empty set of equal-length vectors.
pub fn centroid(vectors: &[&[f64]]) -> Result<Vec<f64>> {
    let dim = common_dimension(vectors)?;
    let n = vectors.len() as f64;

    let mut mean = vec![0.0_f64; dim];
    for v in vectors {
        for (acc, &val) in mean.iter_mut().zip(v.iter()) {
            *acc += val;
        }
    }
    for val in &mut mean {
        *val /= n;
    }

    Ok(mean)
}

/// The shared dimension of a set of vectors.
///
/// Fails on an empty set, a zero-length vector, or any length disagreement.
pub fn common_dimension(vectors: &[&[f64]]) -> Result<usize> {
    let first = vectors
        .first()
        .ok_or_else(|| Error::InsufficientData("no vectors supplied".to_string()))?;
    let dim = first.len();
    if dim == 0 {
        return Err(Error::InvalidInput("embedding vectors are empty".to_string()));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(Error::DimensionMismatch {
            expected: dim,
            found: bad.len(),
        });
    }
    Ok(dim)
}
