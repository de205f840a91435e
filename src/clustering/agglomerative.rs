// Threshold-based agglomerative clustering over cosine distance.
//
// Keyword sets have no known natural topic count, so instead of asking for k
// we build the full average-linkage dendrogram and keep only the merges whose
// linkage distance stays below the threshold. Cluster count then grows with
// the topical spread of the input.
//
// The dendrogram comes from kodama. Its labels follow the SciPy convention:
// leaves are 0..n-1 and merge step i creates node n+i. Average linkage is
// monotone, so "every step below the threshold" is always a consistent cut.

use std::collections::HashMap;

use kodama::{linkage, Method};
use tracing::debug;

use super::models::{Cluster, KeywordRecord};
use super::vector::{common_dimension, cosine_distance};
use crate::error::{Error, Result};

/// Default cut height. 0.3-0.4 gives tight clusters, 0.5-0.7 loose ones.
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.5;

/// Partitions keywords into clusters by average-linkage cosine distance.
#[derive(Debug, Clone)]
pub struct Clusterer {
    distance_threshold: f64,
}

impl Default for Clusterer {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
        }
    }
}

impl Clusterer {
    /// Create a clusterer with a threshold strictly between 0 and 1.
    pub fn new(distance_threshold: f64) -> Result<Self> {
        if !(distance_threshold > 0.0 && distance_threshold < 1.0) {
            return Err(Error::InvalidParameter {
                name: "distance_threshold",
                message: format!("must be in (0, 1), got {distance_threshold}"),
            });
        }
        Ok(Self { distance_threshold })
    }

    pub fn distance_threshold(&self) -> f64 {
        self.distance_threshold
    }

    /// Assign a cluster id to every record, in input order.
    ///
    /// Ids are dense and numbered by first appearance, so the first record
    /// always lands in cluster 0. A single record is its own cluster; an empty
    /// input is `InsufficientData`.
    pub fn assign(&self, records: &[KeywordRecord]) -> Result<Vec<usize>> {
        if records.is_empty() {
            return Err(Error::InsufficientData(
                "clustering needs at least one keyword".to_string(),
            ));
        }

        let vectors: Vec<&[f64]> = records.iter().map(|r| r.embedding.as_slice()).collect();
        common_dimension(&vectors)?;

        let n = records.len();
        if n == 1 {
            return Ok(vec![0]);
        }

        // Condensed upper-triangle distance matrix, row-major, n choose 2 long
        let mut condensed = Vec::with_capacity(n * (n - 1) / 2);
        for row in 0..n - 1 {
            for col in row + 1..n {
                condensed.push(cosine_distance(vectors[row], vectors[col]));
            }
        }

        let dendrogram = linkage(&mut condensed, n, Method::Average);

        // Union-find over leaves; `node_leaf[label]` is some leaf inside the
        // dendrogram node with that label.
        let mut parent: Vec<usize> = (0..n).collect();
        let mut node_leaf: Vec<usize> = (0..n).collect();
        let mut merges = 0usize;

        for step in dendrogram.steps() {
            let a = node_leaf[step.cluster1];
            let b = node_leaf[step.cluster2];
            if step.dissimilarity < self.distance_threshold {
                union(&mut parent, a, b);
                merges += 1;
            }
            node_leaf.push(a);
        }

        let mut dense: HashMap<usize, usize> = HashMap::new();
        let labels: Vec<usize> = (0..n)
            .map(|i| {
                let root = find(&mut parent, i);
                let next = dense.len();
                *dense.entry(root).or_insert(next)
            })
            .collect();

        debug!(
            keywords = n,
            merges = merges,
            clusters = dense.len(),
            threshold = self.distance_threshold,
            "Agglomerative clustering complete"
        );

        Ok(labels)
    }

    /// Cluster the records and group them, preserving input order inside
    /// each cluster. Clusters are returned in id order.
    pub fn cluster(&self, records: &[KeywordRecord]) -> Result<Vec<Cluster>> {
        let labels = self.assign(records)?;
        Ok(group_by_label(records, &labels))
    }
}

/// Group records by an id per record. Ids need not be contiguous.
pub fn group_by_label(records: &[KeywordRecord], labels: &[usize]) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut index: HashMap<usize, usize> = HashMap::new();

    for (record, &label) in records.iter().zip(labels.iter()) {
        let slot = *index.entry(label).or_insert_with(|| {
            clusters.push(Cluster {
                id: label,
                members: Vec::new(),
            });
            clusters.len() - 1
        });
        clusters[slot].members.push(record.clone());
    }

    clusters.sort_by_key(|c| c.id);
    clusters
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        // Keep the lower leaf as root so roots are stable across runs
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[hi] = lo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(text: &str, embedding: Vec<f64>) -> KeywordRecord {
        KeywordRecord::new(text, 100.0, embedding)
    }

    #[test]
    fn test_threshold_must_be_open_unit_interval() {
        assert!(Clusterer::new(0.0).is_err());
        assert!(Clusterer::new(1.0).is_err());
        assert!(Clusterer::new(f64::NAN).is_err());
        assert!(Clusterer::new(0.35).is_ok());
    }

    #[test]
    fn test_empty_input_is_insufficient() {
        let err = Clusterer::default().assign(&[]).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_single_record_is_own_cluster() {
        let clusters = Clusterer::default()
            .cluster(&[rec("solo", vec![1.0, 0.0])])
            .unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].id, 0);
        assert_eq!(clusters[0].members[0].text, "solo");
    }

    #[test]
    fn test_two_separated_groups() {
        let records = vec![
            rec("cheap flights", vec![1.0, 0.05, 0.0]),
            rec("hiking boots", vec![0.0, 0.1, 1.0]),
            rec("budget flights", vec![0.98, 0.1, 0.0]),
            rec("trail shoes", vec![0.05, 0.0, 0.97]),
        ];
        let labels = Clusterer::default().assign(&records).unwrap();
        assert_eq!(labels, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let records = vec![rec("a", vec![1.0, 0.0]), rec("b", vec![1.0, 0.0, 0.0])];
        let err = Clusterer::default().assign(&records).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_group_by_label_keeps_sparse_ids() {
        let records = vec![
            rec("a", vec![1.0]),
            rec("b", vec![1.0]),
            rec("c", vec![1.0]),
        ];
        let clusters = group_by_label(&records, &[7, 2, 7]);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].id, 2);
        assert_eq!(clusters[1].id, 7);
        assert_eq!(clusters[1].members.len(), 2);
    }
}
