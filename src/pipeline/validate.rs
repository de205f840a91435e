// Draft validation: does a written draft land in the category its keyword
// cluster promised?
//
// 1. Classify the draft (categories + entities in one call)
// 2. Compare against the brief row's prediction (performance gap)
// 3. Keyword coverage for the cluster's primary and secondary tiers
// 4. Optionally run the drag search, seeded with the draft's entities and
//    the cluster's official keywords

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::brief::{keyword_coverage, BriefRow, KeywordCoverage};
use crate::drag::{word_count, DragOptimizer, DragResult, DragSettings};
use crate::error::Error;
use crate::nlp::{CategoryMatch, Entity, Features, TextClassifier};

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub run_drag: bool,
    pub drag: DragSettings,
    pub cancel: Option<Arc<AtomicBool>>,
}

/// What the brief predicted for the draft's cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BriefPrediction {
    pub cluster_id: usize,
    pub hub_keyword: String,
    pub detected_category: Option<String>,
    pub confidence: f64,
    pub top_entities: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub word_count: usize,
    pub category: CategoryMatch,
    pub prediction: Option<BriefPrediction>,
    /// The brief predicted a different top category than the draft shows
    pub performance_gap: bool,
    pub entities: Vec<Entity>,
    pub coverage: Option<KeywordCoverage>,
    pub drag: Option<DragResult>,
}

pub async fn validate_draft(
    classifier: &dyn TextClassifier,
    draft: &str,
    target_category: &str,
    brief_row: Option<&BriefRow>,
    options: &ValidateOptions,
) -> Result<ValidationReport> {
    if draft.trim().is_empty() {
        return Err(Error::EmptyText.into());
    }

    let analysis = classifier
        .analyze(draft, Features::ALL)
        .await
        .context("Failed to classify draft")?;
    let category = CategoryMatch::from_categories(target_category, &analysis.categories);

    info!(
        matches = category.matches_target,
        confidence = category.confidence,
        detected = ?category.detected_category,
        "Classified draft"
    );

    let prediction = brief_row.map(|row| BriefPrediction {
        cluster_id: row.cluster_id,
        hub_keyword: row.hub_keyword.clone(),
        detected_category: row.detected_category.clone(),
        confidence: row.confidence,
        top_entities: row.entities(),
    });
    let performance_gap = prediction.as_ref().is_some_and(|p| {
        p.detected_category.is_some() && p.detected_category != category.detected_category
    });

    let coverage =
        brief_row.map(|row| keyword_coverage(draft, &row.primary(), &row.secondary(), &[]));

    let drag = if options.run_drag {
        let official = brief_row.map(BriefRow::official_keywords).unwrap_or_default();
        let entity_names: Vec<String> = analysis.entities.iter().map(|e| e.name.clone()).collect();
        // No entities: let the optimizer derive its own candidates
        let candidates = (!entity_names.is_empty()).then_some(entity_names);

        let mut optimizer = DragOptimizer::new(classifier).with_settings(options.drag.clone())?;
        if let Some(flag) = &options.cancel {
            optimizer = optimizer.with_cancel_flag(flag.clone());
        }
        let result = optimizer
            .run(draft, target_category, candidates, &official)
            .await
            .context("Drag search failed")?;
        Some(result)
    } else {
        None
    };

    Ok(ValidationReport {
        word_count: word_count(draft),
        category,
        prediction,
        performance_gap,
        entities: analysis.entities,
        coverage,
        drag,
    })
}
