// Unit tests for the clustering engine.
//
// Exercises the clusterer, analyzer and cannibalization detector through the
// public API with small hand-built embeddings: threshold behavior, hub
// selection, tier partitioning, coherence and cross-cluster overlap.

use semflow::clustering::analysis::{coherence, TierLimits};
use semflow::clustering::cannibalization::cross_similarity;
use semflow::clustering::vector::{centroid, cosine_distance, cosine_similarity};
use semflow::clustering::{
    CannibalizationDetector, Cluster, ClusterAnalyzer, Clusterer, KeywordRecord,
};
use semflow::error::Error;

fn rec(text: &str, volume: f64, embedding: &[f64]) -> KeywordRecord {
    KeywordRecord::new(text, volume, embedding.to_vec())
}

fn cluster(id: usize, members: Vec<KeywordRecord>) -> Cluster {
    Cluster { id, members }
}

// ============================================================
// Clusterer: threshold behavior
// ============================================================

#[test]
fn near_duplicates_form_one_cluster_with_best_hub() {
    let records = vec![
        rec("cheap flights lisbon", 100.0, &[1.0, 0.0, 0.0]),
        rec("lisbon cheap flights", 1000.0, &[0.99, 0.05, 0.0]),
        rec("cheap flight to lisbon", 10.0, &[0.98, 0.0, 0.05]),
        rec("garden furniture", 500.0, &[0.0, 0.0, 1.0]),
    ];

    let clusters = Clusterer::new(0.5).unwrap().cluster(&records).unwrap();
    assert_eq!(clusters.len(), 2);

    let dupes = &clusters[0];
    assert_eq!(dupes.len(), 3);
    assert_eq!(clusters[1].len(), 1);

    // Hub is the member with the highest centrality * ln(volume + 1)
    let vectors: Vec<&[f64]> = dupes.members.iter().map(|m| m.embedding.as_slice()).collect();
    let center = centroid(&vectors).unwrap();
    let expected = dupes
        .members
        .iter()
        .max_by(|a, b| {
            let sa = cosine_similarity(&a.embedding, &center) * (a.volume + 1.0).ln();
            let sb = cosine_similarity(&b.embedding, &center) * (b.volume + 1.0).ln();
            sa.total_cmp(&sb)
        })
        .unwrap();

    let analysis = ClusterAnalyzer::default().analyze(dupes).unwrap();
    assert_eq!(analysis.hub_keyword, expected.text);
    assert_eq!(analysis.hub_keyword, "lisbon cheap flights");
}

#[test]
fn ids_are_dense_by_first_appearance() {
    let records = vec![
        rec("a", 1.0, &[0.0, 1.0]),
        rec("b", 1.0, &[1.0, 0.0]),
        rec("c", 1.0, &[0.0, 0.99]),
    ];
    let labels = Clusterer::new(0.3).unwrap().assign(&records).unwrap();
    assert_eq!(labels, vec![0, 1, 0]);
}

#[test]
fn lower_threshold_never_makes_fewer_clusters() {
    let records = vec![
        rec("a", 1.0, &[1.0, 0.0, 0.0]),
        rec("b", 1.0, &[0.8, 0.6, 0.0]),
        rec("c", 1.0, &[0.6, 0.8, 0.0]),
        rec("d", 1.0, &[0.0, 1.0, 0.0]),
        rec("e", 1.0, &[0.0, 0.6, 0.8]),
    ];
    let tight = Clusterer::new(0.1).unwrap().cluster(&records).unwrap();
    let loose = Clusterer::new(0.9).unwrap().cluster(&records).unwrap();
    assert!(tight.len() >= loose.len());
    // Only b and c are within 0.1 of each other
    assert_eq!(tight.len(), 4);
}

#[test]
fn anti_correlated_pairs_count_past_distance_one() {
    // c and d merge at ~0.33. Raw cosine puts a at (0.40 + 1.20) / 2 = 0.80
    // from {c, d}; flooring a-d at distance 1.0 would give 0.70 and merge all three.
    let records = vec![
        rec("a", 1.0, &[1.0, 0.0]),
        rec("c", 1.0, &[0.6, 0.8]),
        rec("d", 1.0, &[-0.2, 1.0]),
    ];
    assert!((cosine_distance(&records[0].embedding, &records[2].embedding) - 1.196).abs() < 1e-3);

    let labels = Clusterer::new(0.75).unwrap().assign(&records).unwrap();
    assert_eq!(labels, vec![0, 1, 1]);

    let labels = Clusterer::new(0.85).unwrap().assign(&records).unwrap();
    assert_eq!(labels, vec![0, 0, 0]);
}

#[test]
fn opposite_vectors_never_merge() {
    let records = vec![rec("up", 1.0, &[0.0, 1.0]), rec("down", 1.0, &[0.0, -1.0])];
    let labels = Clusterer::new(0.99).unwrap().assign(&records).unwrap();
    assert_eq!(labels, vec![0, 1]);
}

#[test]
fn single_record_is_singleton_cluster() {
    let clusters = Clusterer::default()
        .cluster(&[rec("only", 5.0, &[0.3, 0.4])])
        .unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].members[0].text, "only");
}

#[test]
fn empty_input_is_insufficient_data() {
    let err = Clusterer::default().cluster(&[]).unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)));
}

#[test]
fn threshold_outside_open_interval_rejected() {
    for bad in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
        assert!(
            matches!(Clusterer::new(bad), Err(Error::InvalidParameter { .. })),
            "threshold {bad} should be rejected"
        );
    }
}

#[test]
fn mixed_dimensions_rejected() {
    let err = Clusterer::default()
        .cluster(&[rec("a", 1.0, &[1.0, 0.0]), rec("b", 1.0, &[1.0])])
        .unwrap_err();
    assert_eq!(
        err,
        Error::DimensionMismatch {
            expected: 2,
            found: 1
        }
    );
}

// ============================================================
// ClusterAnalyzer: tiers, coherence, idempotence
// ============================================================

fn wide_cluster(n: usize) -> Cluster {
    let members = (0..n)
        .map(|i| {
            let angle = i as f64 * 0.02;
            rec(
                &format!("keyword {i}"),
                (i * 37 % 11) as f64 * 100.0,
                &[angle.cos(), angle.sin(), 0.1],
            )
        })
        .collect();
    cluster(3, members)
}

#[test]
fn tiers_partition_members_exactly() {
    let c = wide_cluster(14);
    let analysis = ClusterAnalyzer::default().analyze(&c).unwrap();

    assert_eq!(analysis.primary.len(), 3);
    assert_eq!(analysis.primary.len() + analysis.secondary.len(), 10);
    assert_eq!(analysis.tertiary.len(), 4);

    let mut tiered: Vec<&String> = analysis.ranked_keywords().collect();
    tiered.sort();
    let mut members: Vec<&String> = c.members.iter().map(|m| &m.text).collect();
    members.sort();
    assert_eq!(tiered, members);

    assert_eq!(analysis.total_keywords, 14);
    assert_eq!(analysis.primary[0], analysis.hub_keyword);
}

#[test]
fn tiers_ordered_by_combined_score() {
    let analysis = ClusterAnalyzer::default().analyze(&wide_cluster(12)).unwrap();
    let scores: Vec<f64> = analysis
        .keywords_detail
        .iter()
        .map(|k| k.combined_score)
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));

    let detail_order: Vec<&String> = analysis.keywords_detail.iter().map(|k| &k.keyword).collect();
    let tier_order: Vec<&String> = analysis.ranked_keywords().collect();
    assert_eq!(detail_order, tier_order);
}

#[test]
fn small_cluster_has_no_tertiary() {
    let analysis = ClusterAnalyzer::default().analyze(&wide_cluster(5)).unwrap();
    assert_eq!(analysis.primary.len(), 3);
    assert_eq!(analysis.secondary.len(), 2);
    assert!(analysis.tertiary.is_empty());
}

#[test]
fn custom_tier_limits() {
    let analyzer = ClusterAnalyzer::new(TierLimits {
        primary: 1,
        cumulative_secondary: 2,
    });
    let analysis = analyzer.analyze(&wide_cluster(4)).unwrap();
    assert_eq!(analysis.primary.len(), 1);
    assert_eq!(analysis.secondary.len(), 1);
    assert_eq!(analysis.tertiary.len(), 2);
}

#[test]
fn zero_volume_falls_back_to_centrality() {
    let c = cluster(
        0,
        vec![
            rec("edge", 0.0, &[1.0, 0.0]),
            rec("middle", 0.0, &[0.7, 0.7]),
            rec("other edge", 0.0, &[0.0, 1.0]),
        ],
    );
    let analysis = ClusterAnalyzer::default().analyze(&c).unwrap();
    assert!(analysis.keywords_detail.iter().all(|k| k.combined_score == 0.0));
    assert_eq!(analysis.hub_keyword, "middle");
}

#[test]
fn coherence_is_order_invariant() {
    let c = wide_cluster(9);
    let forward: Vec<&[f64]> = c.members.iter().map(|m| m.embedding.as_slice()).collect();
    let mut reversed = forward.clone();
    reversed.reverse();
    let mut rotated = forward.clone();
    rotated.rotate_left(4);

    let base = coherence(&forward);
    assert!((base - coherence(&reversed)).abs() < 1e-12);
    assert!((base - coherence(&rotated)).abs() < 1e-12);
    assert!((0.0..=1.0).contains(&base));
}

#[test]
fn coherence_of_identical_vectors_is_one() {
    let v = [0.5, 0.5, 0.5];
    let vectors: Vec<&[f64]> = vec![&v, &v, &v];
    assert!((coherence(&vectors) - 1.0).abs() < 1e-12);
}

#[test]
fn analysis_is_idempotent() {
    let c = wide_cluster(13);
    let analyzer = ClusterAnalyzer::default();
    let first = analyzer.analyze(&c).unwrap();
    let second = analyzer.analyze(&c).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.coherence.to_bits(), second.coherence.to_bits());
}

// ============================================================
// CannibalizationDetector
// ============================================================

#[test]
fn highly_similar_clusters_flagged() {
    let a = cluster(
        0,
        vec![
            rec("hotels lisbon", 10.0, &[1.0, 0.10, 0.0]),
            rec("lisbon hotels", 10.0, &[1.0, 0.15, 0.0]),
        ],
    );
    let b = cluster(
        1,
        vec![
            rec("lisbon hotel deals", 10.0, &[1.0, 0.20, 0.0]),
            rec("best hotels in lisbon", 10.0, &[1.0, 0.12, 0.05]),
        ],
    );
    let unrelated = cluster(2, vec![rec("garden chairs", 10.0, &[0.0, 0.0, 1.0])]);

    // Precondition: every cross pair is at least 0.9 similar
    for ma in &a.members {
        for mb in &b.members {
            assert!(cosine_similarity(&ma.embedding, &mb.embedding) >= 0.9);
        }
    }

    let pairs = CannibalizationDetector::new(0.80)
        .unwrap()
        .detect(&[a, b, unrelated])
        .unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].cluster_a_id, pairs[0].cluster_b_id), (0, 1));
    assert!(pairs[0].similarity >= 0.9);
}

#[test]
fn cross_similarity_is_directional_but_bounded() {
    let small = cluster(0, vec![rec("a", 1.0, &[1.0, 0.0])]);
    let big = cluster(
        1,
        vec![rec("b", 1.0, &[1.0, 0.0]), rec("c", 1.0, &[0.0, 1.0])],
    );

    let ab = cross_similarity(&small, &big);
    let ba = cross_similarity(&big, &small);
    assert!((ab - 1.0).abs() < 1e-12);
    assert!((ba - 0.5).abs() < 1e-12);
    assert!((0.0..=1.0).contains(&ab) && (0.0..=1.0).contains(&ba));
}

#[test]
fn no_pairs_for_single_cluster() {
    let only = cluster(0, vec![rec("a", 1.0, &[1.0, 0.0])]);
    assert!(CannibalizationDetector::default()
        .detect(&[only])
        .unwrap()
        .is_empty());
}

#[test]
fn overlap_scan_rejects_mixed_dimensions() {
    // Lengths that disagree would otherwise score 0.0 and hide any overlap
    let a = cluster(0, vec![rec("hotels lisbon", 10.0, &[1.0, 0.1, 0.0])]);
    let b = cluster(1, vec![rec("lisbon hotels", 10.0, &[1.0, 0.1])]);
    let err = CannibalizationDetector::default().detect(&[a, b]).unwrap_err();
    assert_eq!(
        err,
        Error::DimensionMismatch {
            expected: 3,
            found: 2
        }
    );
}

#[test]
fn overlap_threshold_validated() {
    assert!(CannibalizationDetector::new(1.2).is_err());
    assert!(CannibalizationDetector::new(0.0).is_ok());
}
