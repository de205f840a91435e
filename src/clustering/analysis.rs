// Cluster analysis: coherence, hub keyword, and keyword tiers.
//
// Each member is scored by how central it is to the cluster's topic and how
// much search demand it carries:
//
//   combined = centrality * ln(volume + 1)
//
// where centrality is cosine similarity to the cluster centroid. The log keeps
// a single high-volume head term from dominating on traffic alone. Members are
// ranked by combined score, the top one becomes the hub, and the ranking is
// cut into primary (first 3), secondary (up to 10 cumulative) and tertiary.
//
// With zero volume everywhere every combined score is 0, so ties fall back to
// centrality and then input order.

use std::cmp::Ordering;

use super::models::{Cluster, ClusterAnalysis, RankedKeyword};
use super::vector::{centroid, common_dimension, cosine_similarity};
use crate::error::{Error, Result};

/// Tier sizes used for content planning.
#[derive(Debug, Clone, Copy)]
pub struct TierLimits {
    /// Maximum primary keywords (default 3)
    pub primary: usize,
    /// Maximum primary + secondary keywords (default 10)
    pub cumulative_secondary: usize,
}

impl Default for TierLimits {
    fn default() -> Self {
        Self {
            primary: 3,
            cumulative_secondary: 10,
        }
    }
}

/// Produces one `ClusterAnalysis` per cluster. Stateless apart from limits.
#[derive(Debug, Clone, Default)]
pub struct ClusterAnalyzer {
    pub limits: TierLimits,
}

impl ClusterAnalyzer {
    pub fn new(limits: TierLimits) -> Self {
        Self { limits }
    }

    /// Analyze a single cluster. Deterministic: the same cluster always
    /// yields the same analysis, bit for bit.
    pub fn analyze(&self, cluster: &Cluster) -> Result<ClusterAnalysis> {
        if cluster.is_empty() {
            return Err(Error::InvalidInput(format!(
                "cluster {} has no members",
                cluster.id
            )));
        }

        let vectors: Vec<&[f64]> = cluster
            .members
            .iter()
            .map(|m| m.embedding.as_slice())
            .collect();
        common_dimension(&vectors)?;

        if cluster.len() == 1 {
            let only = &cluster.members[0];
            return Ok(ClusterAnalysis {
                cluster_id: cluster.id,
                hub_keyword: only.text.clone(),
                primary: vec![only.text.clone()],
                secondary: Vec::new(),
                tertiary: Vec::new(),
                coherence: 1.0,
                total_keywords: 1,
                total_volume: only.volume,
                keywords_detail: vec![RankedKeyword {
                    keyword: only.text.clone(),
                    volume: only.volume,
                    centrality: 1.0,
                    combined_score: (only.volume + 1.0).ln(),
                }],
            });
        }

        let center = centroid(&vectors)?;

        let mut ranked: Vec<RankedKeyword> = cluster
            .members
            .iter()
            .map(|m| {
                let centrality = cosine_similarity(&m.embedding, &center);
                RankedKeyword {
                    keyword: m.text.clone(),
                    volume: m.volume,
                    centrality,
                    combined_score: centrality * (m.volume + 1.0).ln(),
                }
            })
            .collect();

        // Stable sort: equal scores keep input order
        ranked.sort_by(|a, b| rank_order(a, b));

        let (primary, secondary, tertiary) = split_tiers(&ranked, self.limits);

        Ok(ClusterAnalysis {
            cluster_id: cluster.id,
            hub_keyword: ranked[0].keyword.clone(),
            primary,
            secondary,
            tertiary,
            coherence: coherence(&vectors),
            total_keywords: cluster.len(),
            total_volume: cluster.total_volume(),
            keywords_detail: ranked,
        })
    }

    /// Analyze every cluster, in the order given.
    pub fn analyze_all(&self, clusters: &[Cluster]) -> Result<Vec<ClusterAnalysis>> {
        clusters.iter().map(|c| self.analyze(c)).collect()
    }
}

/// Mean of the off-diagonal pairwise similarities. 1.0 for fewer than two
/// vectors.
pub fn coherence(vectors: &[&[f64]]) -> f64 {
    let n = vectors.len();
    if n < 2 {
        return 1.0;
    }

    let mut sum = 0.0;
    for i in 0..n {
        for j in i + 1..n {
            sum += cosine_similarity(vectors[i], vectors[j]);
        }
    }

    let pairs = (n * (n - 1) / 2) as f64;
    (sum / pairs).clamp(0.0, 1.0)
}

fn rank_order(a: &RankedKeyword, b: &RankedKeyword) -> Ordering {
    b.combined_score
        .total_cmp(&a.combined_score)
        .then_with(|| b.centrality.total_cmp(&a.centrality))
}

fn split_tiers(
    ranked: &[RankedKeyword],
    limits: TierLimits,
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let n = ranked.len();
    let primary_end = limits.primary.min(n);
    let secondary_end = limits.cumulative_secondary.max(primary_end).min(n);

    let names = |range: std::ops::Range<usize>| -> Vec<String> {
        ranked[range].iter().map(|r| r.keyword.clone()).collect()
    };

    (
        names(0..primary_end),
        names(primary_end..secondary_end),
        names(secondary_end..n),
    )
}
