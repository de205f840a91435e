// Keyword clustering pipelines: keywords -> clusters -> strategic brief.
//
// Both modes share the front half:
// 1. Volume filter over normalized keyword rows
// 2. Embed every surviving keyword (any missing vector aborts)
// 3. Agglomerative clustering at the distance threshold
// 4. Analyze each cluster (hub, tiers, coherence)
//
// DISCOVER then asks the classifier what each cluster is naturally about and
// checks every cluster pair for cannibalization. POPULATE tests each cluster
// against one target category instead. Classifier failures on a single
// cluster leave that row's category fields empty and the run continues.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use crate::brief::{BriefRow, ClusterClassification};
use crate::clustering::agglomerative::DEFAULT_DISTANCE_THRESHOLD;
use crate::clustering::cannibalization::DEFAULT_OVERLAP_THRESHOLD;
use crate::clustering::{
    CannibalizationDetector, CannibalizationPair, Cluster, ClusterAnalysis, ClusterAnalyzer,
    Clusterer, KeywordRecord,
};
use crate::embeddings::{attach_embeddings, EmbeddingProvider};
use crate::error::Error;
use crate::keywords::{filter_by_volume, KeywordRow};
use crate::nlp::{CategoryMatch, Features, TextClassifier};

/// Entities kept per brief row.
const TOP_ENTITIES: usize = 5;

#[derive(Debug, Clone)]
pub struct ClusterSettings {
    /// Keywords below this volume are dropped; 0 keeps everything
    pub min_volume: f64,
    pub distance_threshold: f64,
    pub overlap_threshold: f64,
    /// In-flight classifier calls
    pub concurrency: usize,
    pub show_progress: bool,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            min_volume: 10.0,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            concurrency: 4,
            show_progress: false,
        }
    }
}

/// Everything a clustering run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    /// Keywords that survived the volume filter
    pub keywords_clustered: usize,
    pub analyses: Vec<ClusterAnalysis>,
    pub brief: Vec<BriefRow>,
    /// Only filled by DISCOVER
    pub cannibalization: Vec<CannibalizationPair>,
}

impl ClusterReport {
    /// Hub keyword of a cluster, for reporting pairs by name.
    pub fn hub_keyword(&self, cluster_id: usize) -> Option<&str> {
        self.analyses
            .iter()
            .find(|a| a.cluster_id == cluster_id)
            .map(|a| a.hub_keyword.as_str())
    }
}

/// Filter by volume and attach embeddings.
pub async fn embed_keywords(
    rows: &[KeywordRow],
    min_volume: f64,
    embedder: &dyn EmbeddingProvider,
) -> Result<Vec<KeywordRecord>> {
    let rows = filter_by_volume(rows, min_volume);
    if rows.is_empty() {
        return Err(Error::InsufficientData(format!(
            "no keywords with volume >= {min_volume}"
        ))
        .into());
    }
    info!(keywords = rows.len(), min_volume, "Keywords after volume filter");

    let texts: Vec<String> = rows.iter().map(|r| r.keyword.clone()).collect();
    let vectors = embedder
        .embed_batch(&texts)
        .await
        .with_context(|| format!("Embedding provider {} failed", embedder.name()))?;

    Ok(attach_embeddings(&rows, vectors)?)
}

/// Cluster the records and analyze every cluster.
pub fn analyze_keywords(
    records: &[KeywordRecord],
    settings: &ClusterSettings,
) -> Result<(Vec<Cluster>, Vec<ClusterAnalysis>)> {
    let clusterer = Clusterer::new(settings.distance_threshold)?;
    let clusters = clusterer.cluster(records)?;
    let analyses = ClusterAnalyzer::default().analyze_all(&clusters)?;

    info!(
        keywords = records.len(),
        clusters = clusters.len(),
        threshold = settings.distance_threshold,
        "Clustered keywords"
    );
    Ok((clusters, analyses))
}

/// DISCOVER: find each cluster's natural category and flag cannibalization.
pub async fn run_discover(
    rows: &[KeywordRow],
    embedder: &dyn EmbeddingProvider,
    classifier: &dyn TextClassifier,
    settings: &ClusterSettings,
) -> Result<ClusterReport> {
    let detector = CannibalizationDetector::new(settings.overlap_threshold)?;
    let records = embed_keywords(rows, settings.min_volume, embedder).await?;
    let (clusters, analyses) = analyze_keywords(&records, settings)?;

    let classifications = classify_clusters(&analyses, classifier, None, settings).await;
    let brief = build_brief(&analyses, &classifications);

    let cannibalization = detector.detect(&clusters)?;
    if cannibalization.is_empty() {
        info!("No cannibalization detected");
    } else {
        warn!(
            pairs = cannibalization.len(),
            threshold = settings.overlap_threshold,
            "Potential cannibalization detected"
        );
    }

    Ok(ClusterReport {
        keywords_clustered: records.len(),
        analyses,
        brief,
        cannibalization,
    })
}

/// POPULATE: test every cluster against `target_category`.
pub async fn run_populate(
    rows: &[KeywordRow],
    embedder: &dyn EmbeddingProvider,
    classifier: &dyn TextClassifier,
    target_category: &str,
    settings: &ClusterSettings,
) -> Result<ClusterReport> {
    if target_category.trim().is_empty() {
        return Err(Error::InvalidParameter {
            name: "target_category",
            message: "must not be empty".to_string(),
        }
        .into());
    }

    let records = embed_keywords(rows, settings.min_volume, embedder).await?;
    let (_, analyses) = analyze_keywords(&records, settings)?;

    let classifications =
        classify_clusters(&analyses, classifier, Some(target_category), settings).await;
    let brief = build_brief(&analyses, &classifications);

    let matching = brief
        .iter()
        .filter(|r| r.matches_target == Some(true))
        .count();
    info!(
        category = target_category,
        matching,
        clusters = brief.len(),
        "Tested clusters against target"
    );

    Ok(ClusterReport {
        keywords_clustered: records.len(),
        analyses,
        brief,
        cannibalization: Vec::new(),
    })
}

/// One brief row per analysis, paired by position.
pub fn build_brief(
    analyses: &[ClusterAnalysis],
    classifications: &[ClusterClassification],
) -> Vec<BriefRow> {
    analyses
        .iter()
        .zip(classifications)
        .map(|(a, c)| BriefRow::new(a, c))
        .collect()
}

/// Classify each cluster's joined keywords, in cluster order.
async fn classify_clusters(
    analyses: &[ClusterAnalysis],
    classifier: &dyn TextClassifier,
    target: Option<&str>,
    settings: &ClusterSettings,
) -> Vec<ClusterClassification> {
    let pb = if settings.show_progress {
        let pb = ProgressBar::new(analyses.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("  Classifying [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    } else {
        ProgressBar::hidden()
    };

    let results: Vec<ClusterClassification> = stream::iter(analyses.iter().map(|analysis| {
        let pb = pb.clone();
        async move {
            let classification = classify_one(analysis, classifier, target).await;
            pb.set_message(analysis.hub_keyword.clone());
            pb.inc(1);
            classification
        }
    }))
    .buffered(settings.concurrency.max(1))
    .collect()
    .await;

    pb.finish_and_clear();
    results
}

async fn classify_one(
    analysis: &ClusterAnalysis,
    classifier: &dyn TextClassifier,
    target: Option<&str>,
) -> ClusterClassification {
    let text = analysis
        .ranked_keywords()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    let mut classification = ClusterClassification {
        target_category: target.map(str::to_string),
        ..Default::default()
    };

    match classifier.analyze(&text, Features::ALL).await {
        Ok(result) => {
            classification.top_entities = result.top_entities(TOP_ENTITIES);
            match target {
                Some(target) => {
                    let m = CategoryMatch::from_categories(target, &result.categories);
                    classification.matches_target = Some(m.matches_target);
                    classification.detected_category = m.detected_category;
                    classification.confidence = m.confidence;
                }
                None => {
                    if let Some(top) = result.categories.first() {
                        classification.detected_category = Some(top.name.clone());
                        classification.confidence = top.confidence;
                    }
                }
            }
        }
        Err(e) => {
            warn!(
                cluster = analysis.cluster_id,
                hub = %analysis.hub_keyword,
                error = %e,
                "Classification failed for cluster"
            );
        }
    }

    classification
}
