// Data types that flow through the clustering stages.
//
// Each stage takes these by reference and returns new values: the clusterer
// produces `Cluster`s, the analyzer turns one cluster into a `ClusterAnalysis`,
// and the detector emits `CannibalizationPair`s. Nothing is mutated in place.

use serde::{Deserialize, Serialize};

/// One normalized input keyword with its search volume and embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRecord {
    /// Lowercased, trimmed keyword text (unique within one input set)
    pub text: String,
    /// Monthly search volume; never negative
    pub volume: f64,
    pub embedding: Vec<f64>,
}

impl KeywordRecord {
    /// Build a record, normalizing the text and clamping a bad volume to 0.
    pub fn new(text: &str, volume: f64, embedding: Vec<f64>) -> Self {
        let volume = if volume.is_finite() && volume > 0.0 {
            volume
        } else {
            0.0
        };
        Self {
            text: text.trim().to_lowercase(),
            volume,
            embedding,
        }
    }
}

/// A group of keywords assigned the same id by the clusterer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: usize,
    /// Members in input order
    pub members: Vec<KeywordRecord>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sum of member search volumes.
    pub fn total_volume(&self) -> f64 {
        self.members.iter().map(|m| m.volume).sum()
    }
}

/// Per-keyword scores computed while ranking a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedKeyword {
    pub keyword: String,
    pub volume: f64,
    /// Cosine similarity to the cluster centroid
    pub centrality: f64,
    /// `centrality * ln(volume + 1)`
    pub combined_score: f64,
}

/// Content-planning summary of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAnalysis {
    pub cluster_id: usize,
    /// Best single representative of the cluster's intent
    pub hub_keyword: String,
    /// Must-target keywords (at most 3)
    pub primary: Vec<String>,
    /// Supporting keywords (primary + secondary never exceed 10)
    pub secondary: Vec<String>,
    /// Long-tail remainder
    pub tertiary: Vec<String>,
    /// Mean off-diagonal pairwise similarity, 1.0 for singletons
    pub coherence: f64,
    pub total_keywords: usize,
    pub total_volume: f64,
    /// Every member in descending combined-score order
    pub keywords_detail: Vec<RankedKeyword>,
}

impl ClusterAnalysis {
    /// All tier members in rank order.
    pub fn ranked_keywords(&self) -> impl Iterator<Item = &String> {
        self.primary
            .iter()
            .chain(self.secondary.iter())
            .chain(self.tertiary.iter())
    }
}

/// Two distinct clusters that compete for the same search intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CannibalizationPair {
    pub cluster_a_id: usize,
    pub cluster_b_id: usize,
    /// Average over A's members of their best match in B, 0.0..=1.0
    pub similarity: f64,
}
