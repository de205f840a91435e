// Composition tests: verifying that the stages chain together correctly.
//
// These tests exercise the data flow between modules:
//   keyword rows -> embeddings -> clusters -> analyses -> brief -> validation
// with in-memory embedding and classifier mocks, so there are no network
// calls. The brief round trip writes to a temp directory.

use std::collections::HashMap;

use async_trait::async_trait;

use semflow::brief::{read_brief, write_brief};
use semflow::embeddings::EmbeddingProvider;
use semflow::error::Error;
use semflow::keywords::KeywordRow;
use semflow::nlp::{CategoryScore, Entity, Features, TextAnalysis, TextClassifier};
use semflow::pipeline::{
    run_discover, run_populate, validate_draft, ClusterSettings, ValidateOptions,
};

// ============================================================
// Mocks
// ============================================================

/// Embeds by topic word: hotel keywords along x, flight keywords along
/// `flight_axis`, with a tiny per-keyword wobble.
struct TopicEmbedder {
    flight_axis: [f64; 3],
}

impl TopicEmbedder {
    fn separated() -> Self {
        Self {
            flight_axis: [0.0, 1.0, 0.0],
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TopicEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Option<Vec<f64>>>> {
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let wobble = i as f64 * 0.001;
                if text.contains("broken") {
                    None
                } else if text.contains("hotel") {
                    Some(vec![1.0, wobble, 0.0])
                } else {
                    let [x, y, z] = self.flight_axis;
                    Some(vec![x + wobble, y, z])
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "topic-mock"
    }
}

/// Classifies joined cluster keywords by topic word.
struct KeywordClassifier;

#[async_trait]
impl TextClassifier for KeywordClassifier {
    async fn analyze(&self, text: &str, _features: Features) -> anyhow::Result<TextAnalysis> {
        if text.contains("cursed") {
            anyhow::bail!("backend unavailable");
        }
        let (name, confidence) = if text.contains("hotel") {
            ("/Travel/Hotels & Accommodations", 0.9)
        } else {
            ("/Travel/Air Travel", 0.8)
        };
        Ok(TextAnalysis {
            categories: vec![CategoryScore {
                name: name.to_string(),
                confidence,
            }],
            entities: vec![entity("Lisbon", 0.7)],
        })
    }
}

/// Classifies drafts: a casino mention pulls them toward gambling.
struct DraftClassifier {
    entities: Vec<&'static str>,
}

#[async_trait]
impl TextClassifier for DraftClassifier {
    async fn analyze(&self, text: &str, features: Features) -> anyhow::Result<TextAnalysis> {
        let has_casino = text.to_lowercase().contains("casino");
        let hotels = if has_casino { 0.45 } else { 0.75 };

        let mut analysis = TextAnalysis::default();
        if features.classify {
            analysis.categories = vec![
                CategoryScore {
                    name: "/Travel/Hotels & Accommodations".to_string(),
                    confidence: hotels,
                },
                CategoryScore {
                    name: "/Games/Gambling".to_string(),
                    confidence: 1.0 - hotels,
                },
            ];
        }
        if features.entities {
            analysis.entities = self
                .entities
                .iter()
                .enumerate()
                .map(|(i, name)| entity(name, 0.9 - i as f64 * 0.1))
                .collect();
        }
        Ok(analysis.sorted())
    }
}

fn entity(name: &str, salience: f64) -> Entity {
    Entity {
        name: name.to_string(),
        entity_type: "OTHER".to_string(),
        salience,
        wikipedia_url: None,
    }
}

fn rows(items: &[(&str, f64)]) -> Vec<KeywordRow> {
    items
        .iter()
        .map(|(k, v)| KeywordRow {
            keyword: k.to_string(),
            volume: *v,
        })
        .collect()
}

fn travel_keywords() -> Vec<KeywordRow> {
    rows(&[
        ("lisbon hotels", 100.0),
        ("flights to lisbon", 200.0),
        ("hotels in lisbon", 80.0),
        ("cheap flights lisbon", 90.0),
        ("cheap lisbon hotels", 50.0),
        ("lisbon flight deals", 30.0),
        ("lisbon tiny niche", 2.0),
    ])
}

// ============================================================
// Chain: keywords -> clusters -> brief (DISCOVER)
// ============================================================

#[tokio::test]
async fn discover_builds_one_row_per_topic() {
    let report = run_discover(
        &travel_keywords(),
        &TopicEmbedder::separated(),
        &KeywordClassifier,
        &ClusterSettings::default(),
    )
    .await
    .unwrap();

    // The volume-2 keyword is filtered before embedding
    assert_eq!(report.keywords_clustered, 6);
    assert_eq!(report.brief.len(), 2);
    assert!(report.cannibalization.is_empty());

    let hotels = report
        .brief
        .iter()
        .find(|r| r.hub_keyword.contains("hotel"))
        .unwrap();
    assert_eq!(hotels.total_keywords, 3);
    assert_eq!(
        hotels.detected_category.as_deref(),
        Some("/Travel/Hotels & Accommodations")
    );
    assert_eq!(hotels.confidence, 0.9);
    assert_eq!(hotels.top_entities, "Lisbon");
    assert_eq!(hotels.matches_target, None);
    assert_eq!(hotels.hub_keyword, "lisbon hotels");

    let flights = report
        .brief
        .iter()
        .find(|r| r.hub_keyword.contains("flight"))
        .unwrap();
    assert_eq!(flights.hub_keyword, "flights to lisbon");
    assert_eq!(flights.detected_category.as_deref(), Some("/Travel/Air Travel"));

    // Tiers in the brief cover every clustered keyword exactly once
    let total: usize = report.brief.iter().map(|r| r.total_keywords).sum();
    assert_eq!(total, report.keywords_clustered);
}

#[tokio::test]
async fn overlapping_clusters_reported_by_hub() {
    // Flights sit ~0.95 similar to hotels; a tight threshold keeps them apart
    let embedder = TopicEmbedder {
        flight_axis: [0.9, 0.3, 0.0],
    };
    let settings = ClusterSettings {
        distance_threshold: 0.02,
        ..Default::default()
    };
    let report = run_discover(&travel_keywords(), &embedder, &KeywordClassifier, &settings)
        .await
        .unwrap();

    assert_eq!(report.brief.len(), 2);
    assert_eq!(report.cannibalization.len(), 1);

    let pair = &report.cannibalization[0];
    assert!(pair.similarity >= 0.8);
    let hubs = [
        report.hub_keyword(pair.cluster_a_id).unwrap(),
        report.hub_keyword(pair.cluster_b_id).unwrap(),
    ];
    assert!(hubs.contains(&"lisbon hotels"));
    assert!(hubs.contains(&"flights to lisbon"));
}

#[tokio::test]
async fn classifier_failure_leaves_row_blank() {
    let keywords = rows(&[
        ("lisbon hotels", 100.0),
        ("cursed flight", 50.0),
        ("cursed flight deals", 40.0),
    ]);
    let report = run_discover(
        &keywords,
        &TopicEmbedder::separated(),
        &KeywordClassifier,
        &ClusterSettings::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.brief.len(), 2);
    let by_hub: HashMap<&str, _> = report
        .brief
        .iter()
        .map(|r| (r.hub_keyword.as_str(), r))
        .collect();
    assert!(by_hub["lisbon hotels"].detected_category.is_some());

    let failed = by_hub["cursed flight"];
    assert_eq!(failed.detected_category, None);
    assert_eq!(failed.confidence, 0.0);
    assert!(failed.top_entities.is_empty());
}

#[tokio::test]
async fn missing_embedding_fails_whole_batch() {
    let keywords = rows(&[("lisbon hotels", 100.0), ("broken keyword", 100.0)]);
    let err = run_discover(
        &keywords,
        &TopicEmbedder::separated(),
        &KeywordClassifier,
        &ClusterSettings::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.downcast_ref::<Error>(),
        Some(&Error::MissingEmbeddings(vec!["broken keyword".to_string()]))
    );
}

#[tokio::test]
async fn everything_below_min_volume_is_insufficient() {
    let keywords = rows(&[("lisbon hotels", 3.0)]);
    let err = run_discover(
        &keywords,
        &TopicEmbedder::separated(),
        &KeywordClassifier,
        &ClusterSettings::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::InsufficientData(_))
    ));
}

// ============================================================
// Chain: keywords -> clusters -> target test (POPULATE)
// ============================================================

#[tokio::test]
async fn populate_marks_matching_clusters() {
    let report = run_populate(
        &travel_keywords(),
        &TopicEmbedder::separated(),
        &KeywordClassifier,
        "/travel/air",
        &ClusterSettings::default(),
    )
    .await
    .unwrap();

    assert!(report.cannibalization.is_empty());
    for row in &report.brief {
        assert_eq!(row.target_category.as_deref(), Some("/travel/air"));
    }

    let flights = report
        .brief
        .iter()
        .find(|r| r.hub_keyword.contains("flight"))
        .unwrap();
    assert_eq!(flights.matches_target, Some(true));
    assert_eq!(flights.confidence, 0.8);

    let hotels = report
        .brief
        .iter()
        .find(|r| r.hub_keyword.contains("hotel"))
        .unwrap();
    assert_eq!(hotels.matches_target, Some(false));
}

#[tokio::test]
async fn populate_requires_target() {
    let err = run_populate(
        &travel_keywords(),
        &TopicEmbedder::separated(),
        &KeywordClassifier,
        "  ",
        &ClusterSettings::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::InvalidParameter { .. })
    ));
}

// ============================================================
// Chain: brief file -> draft validation -> drag search
// ============================================================

#[tokio::test]
async fn saved_brief_drives_validation_and_drag() {
    let report = run_discover(
        &travel_keywords(),
        &TopicEmbedder::separated(),
        &KeywordClassifier,
        &ClusterSettings::default(),
    )
    .await
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brief.csv");
    write_brief(&path, &report.brief).unwrap();
    let brief = read_brief(&path).unwrap();
    let hotel_row = brief
        .iter()
        .find(|r| r.hub_keyword == "lisbon hotels")
        .unwrap();

    let draft = "Our guide to lisbon hotels covers cheap lisbon hotels near the river. \
                 After dinner the Casino is a short walk from most rooms.";
    let classifier = DraftClassifier {
        entities: vec!["lisbon hotels", "Casino", "river"],
    };
    let options = ValidateOptions {
        run_drag: true,
        ..Default::default()
    };

    let result = validate_draft(&classifier, draft, "/Travel", Some(hotel_row), &options)
        .await
        .unwrap();

    // The draft leans gambling while the keywords predicted hotels
    assert!(result.category.matches_target);
    assert_eq!(result.category.detected_category.as_deref(), Some("/Games/Gambling"));
    assert!(result.performance_gap);

    let coverage = result.coverage.as_ref().unwrap();
    assert_eq!(coverage.primary.total, 3);
    assert_eq!(coverage.primary.found, 2);
    assert_eq!(coverage.primary.missing, vec!["hotels in lisbon"]);

    let drag = result.drag.as_ref().unwrap();
    assert_eq!(drag.official_count, 1);
    assert_eq!(drag.other_count, 2);
    assert_eq!(drag.removed_other, vec!["Casino"]);
    assert!(drag.removed_official.is_empty());
    assert!((drag.total_improvement() - 0.30).abs() < 1e-9);
    assert!(drag.final_confidence >= drag.baseline_confidence);
}

#[tokio::test]
async fn validation_without_brief_skips_coverage_and_drag() {
    let classifier = DraftClassifier {
        entities: vec!["river"],
    };
    let result = validate_draft(
        &classifier,
        "A quiet hotel by the river with views of the old town.",
        "/Travel/Hotels",
        None,
        &ValidateOptions::default(),
    )
    .await
    .unwrap();

    assert!(result.category.matches_target);
    assert!(!result.performance_gap);
    assert!(result.prediction.is_none());
    assert!(result.coverage.is_none());
    assert!(result.drag.is_none());
    assert_eq!(result.entities.len(), 1);
    assert_eq!(result.word_count, 12);
}
