// Target-category matching.
//
// A target like "/Travel" or "hotels" matches any detected category whose path
// contains it, case-insensitively; the first (highest-confidence) such
// category wins. Two confidences come out of this:
//
// - `confidence`: the matched category's confidence, or the top detected
//   category's when nothing matches. This is what reports display.
// - `target_confidence`: the matched category's confidence, or 0.0 when the
//   target isn't detected. The drag search optimizes this one, so it can't be
//   rewarded for strengthening the wrong category.

use serde::{Deserialize, Serialize};

use super::traits::{CategoryScore, Features, TextClassifier};
use crate::error::{Error, Result};

/// How many detected categories to keep on a match result.
const TOP_CATEGORIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMatch {
    pub target_category: String,
    pub matches_target: bool,
    pub confidence: f64,
    pub target_confidence: f64,
    /// Highest-confidence detected category, if any
    pub detected_category: Option<String>,
    /// The category that satisfied the target, if any
    pub matched_category: Option<String>,
    pub top_categories: Vec<CategoryScore>,
}

impl CategoryMatch {
    /// Match an already-sorted category list against a target.
    pub fn from_categories(target: &str, categories: &[CategoryScore]) -> Self {
        let target_lower = target.trim().to_lowercase();
        let matched = if target_lower.is_empty() {
            None
        } else {
            categories
                .iter()
                .find(|c| c.name.to_lowercase().contains(&target_lower))
        };
        let top = categories.first();

        Self {
            target_category: target.to_string(),
            matches_target: matched.is_some(),
            confidence: matched.or(top).map(|c| c.confidence).unwrap_or(0.0),
            target_confidence: matched.map(|c| c.confidence).unwrap_or(0.0),
            detected_category: top.map(|c| c.name.clone()),
            matched_category: matched.map(|c| c.name.clone()),
            top_categories: categories.iter().take(TOP_CATEGORIES).cloned().collect(),
        }
    }
}

/// Classify `text` and match the result against `target`.
///
/// Empty text is `EmptyText`; a classifier failure is `Oracle`. A successful
/// call that detects no categories is a valid non-match with zero confidence.
pub async fn match_category(
    classifier: &dyn TextClassifier,
    text: &str,
    target: &str,
) -> Result<CategoryMatch> {
    if text.trim().is_empty() {
        return Err(Error::EmptyText);
    }

    let analysis = classifier
        .analyze(text, Features::CATEGORIES)
        .await
        .map_err(|e| match e.downcast_ref::<Error>() {
            Some(inner) => inner.clone(),
            None => Error::oracle(&e),
        })?;

    Ok(CategoryMatch::from_categories(target, &analysis.categories))
}
