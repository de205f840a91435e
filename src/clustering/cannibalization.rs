// Cannibalization detection between clusters.
//
// Two clusters cannibalize each other when most keywords in one have a
// near-duplicate in the other. For a pair (A, B) we take, for each member of
// A, its best cosine match anywhere in B, then average those maxima:
//
//   score(A, B) = mean over a in A of max over b in B of sim(a, b)
//
// This is deliberately directional. score(B, A) can differ when the clusters
// have different sizes or spreads; the detector reports score(A, B) with A the
// earlier cluster in the input order. Cost is O(k^2 * m^2) for k clusters of
// average size m, fine for the tens of clusters a keyword brief produces.

use tracing::debug;

use super::models::{CannibalizationPair, Cluster};
use super::vector::{common_dimension, cosine_similarity};
use crate::error::{Error, Result};

/// Default overlap threshold for flagging a pair.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.80;

/// Flags cluster pairs whose average-max cross similarity reaches a threshold.
#[derive(Debug, Clone)]
pub struct CannibalizationDetector {
    overlap_threshold: f64,
}

impl Default for CannibalizationDetector {
    fn default() -> Self {
        Self {
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
        }
    }
}

impl CannibalizationDetector {
    pub fn new(overlap_threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&overlap_threshold) {
            return Err(Error::InvalidParameter {
                name: "overlap_threshold",
                message: format!("must be in [0, 1], got {overlap_threshold}"),
            });
        }
        Ok(Self { overlap_threshold })
    }

    pub fn overlap_threshold(&self) -> f64 {
        self.overlap_threshold
    }

    /// Scan every unordered pair of distinct clusters.
    ///
    /// Pairs come back in scan order (A before B as given). Empty clusters
    /// never match anything. Every member embedding must share one dimension,
    /// otherwise the scan fails with `DimensionMismatch`.
    pub fn detect(&self, clusters: &[Cluster]) -> Result<Vec<CannibalizationPair>> {
        let vectors: Vec<&[f64]> = clusters
            .iter()
            .flat_map(|c| c.members.iter().map(|m| m.embedding.as_slice()))
            .collect();
        if !vectors.is_empty() {
            common_dimension(&vectors)?;
        }

        let mut pairs = Vec::new();

        for (i, a) in clusters.iter().enumerate() {
            for b in &clusters[i + 1..] {
                if a.id == b.id {
                    continue;
                }
                let similarity = cross_similarity(a, b);
                if similarity >= self.overlap_threshold {
                    debug!(
                        cluster_a = a.id,
                        cluster_b = b.id,
                        similarity = similarity,
                        "Cannibalization pair"
                    );
                    pairs.push(CannibalizationPair {
                        cluster_a_id: a.id,
                        cluster_b_id: b.id,
                        similarity,
                    });
                }
            }
        }

        Ok(pairs)
    }
}

/// Average over A's members of each member's maximum similarity to B.
///
/// Returns 0.0 when either cluster is empty. Always within 0.0..=1.0.
pub fn cross_similarity(a: &Cluster, b: &Cluster) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let total: f64 = a
        .members
        .iter()
        .map(|ma| {
            b.members
                .iter()
                .map(|mb| cosine_similarity(&ma.embedding, &mb.embedding))
                .fold(0.0_f64, f64::max)
        })
        .sum();

    (total / a.len() as f64).clamp(0.0, 1.0)
}
