// Greedy best-first drag search.
//
// Each round tries removing every remaining candidate from the current text,
// asks the classifier how confident it now is in the target category, and
// commits the single best removal if it beats the current confidence by more
// than the acceptance threshold. Deltas are measured against the current
// (already improved) text, so confidence never decreases across committed
// rounds and the search ends after at most one round per candidate.
//
// Trials within a round are independent and are issued concurrently; the
// commit decision waits for the whole round. Every classifier call is bounded
// by `call_timeout`, so one stalled request becomes a skipped trial instead
// of holding the round open.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::removal::{remove_term, word_count, RemovalMode};
use crate::error::{Error, Result};
use crate::nlp::local::LocalTermExtractor;
use crate::nlp::{match_category, CategoryMatch, Features, TextClassifier};

/// Minimum absolute confidence gain for a removal to be committed.
pub const DEFAULT_IMPROVEMENT_THRESHOLD: f64 = 0.01;

/// Trials that would leave fewer words than this are rejected.
pub const DEFAULT_MIN_WORDS: usize = 5;

/// Default number of in-flight oracle calls per round.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default upper bound on a single classifier call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct DragSettings {
    pub min_words: usize,
    pub improvement_threshold: f64,
    pub removal_mode: RemovalMode,
    pub concurrency: usize,
    /// Fall back to local TF-IDF terms when the classifier finds no entities
    pub local_fallback: bool,
    /// Per classifier call; `None` waits as long as the classifier does
    pub call_timeout: Option<Duration>,
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
            improvement_threshold: DEFAULT_IMPROVEMENT_THRESHOLD,
            removal_mode: RemovalMode::default(),
            concurrency: DEFAULT_CONCURRENCY,
            local_fallback: true,
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
        }
    }
}

/// One committed removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragIteration {
    /// Starts at 1, one per committed round
    pub sequence_number: usize,
    pub removed_term: String,
    pub is_official_keyword: bool,
    pub confidence_before: f64,
    pub confidence_after: f64,
    pub improvement: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No candidates were supplied and none could be derived from the text
    NoTermsToTest,
    /// A full round found nothing above the acceptance threshold
    NoImprovement,
    /// Every candidate was removed
    CandidatesExhausted,
    /// The cancel flag was raised between rounds
    Cancelled,
}

impl StopReason {
    pub fn describe(&self) -> &'static str {
        match self {
            StopReason::NoTermsToTest => "no terms to test",
            StopReason::NoImprovement => "no remaining removal improves confidence",
            StopReason::CandidatesExhausted => "all candidate terms removed",
            StopReason::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragResult {
    pub target_category: String,
    pub baseline_confidence: f64,
    /// Top detected category of the untouched text
    pub baseline_category: Option<String>,
    pub final_confidence: f64,
    pub iterations: Vec<DragIteration>,
    /// List A: removed terms that are official keywords
    pub removed_official: Vec<String>,
    /// List B: removed incidental terms
    pub removed_other: Vec<String>,
    /// Official keywords among the candidates
    pub official_count: usize,
    /// Other terms among the candidates
    pub other_count: usize,
    pub stop_reason: StopReason,
    pub optimized_text: String,
    /// Trials skipped because the classifier call failed
    pub oracle_failures: usize,
}

impl DragResult {
    pub fn total_improvement(&self) -> f64 {
        self.final_confidence - self.baseline_confidence
    }

    pub fn no_terms_to_test(&self) -> bool {
        self.stop_reason == StopReason::NoTermsToTest
    }

    /// Removed terms in commit order.
    pub fn removed_terms(&self) -> impl Iterator<Item = &str> {
        self.iterations.iter().map(|it| it.removed_term.as_str())
    }
}

struct Candidate {
    term: String,
    official: bool,
}

struct Trial {
    index: usize,
    text: String,
}

pub struct DragOptimizer<'a> {
    classifier: &'a dyn TextClassifier,
    settings: DragSettings,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> DragOptimizer<'a> {
    pub fn new(classifier: &'a dyn TextClassifier) -> Self {
        Self {
            classifier,
            settings: DragSettings::default(),
            cancel: None,
        }
    }

    pub fn with_settings(mut self, settings: DragSettings) -> Result<Self> {
        if !(0.0..1.0).contains(&settings.improvement_threshold) {
            return Err(Error::InvalidParameter {
                name: "improvement_threshold",
                message: format!(
                    "must be in [0, 1), got {}",
                    settings.improvement_threshold
                ),
            });
        }
        if settings.concurrency == 0 {
            return Err(Error::InvalidParameter {
                name: "concurrency",
                message: "must be at least 1".to_string(),
            });
        }
        if settings.call_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidParameter {
                name: "call_timeout",
                message: "must be greater than zero".to_string(),
            });
        }
        self.settings = settings;
        Ok(self)
    }

    /// Stop between rounds once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn settings(&self) -> &DragSettings {
        &self.settings
    }

    /// Run the search over `text` toward `target`.
    ///
    /// `candidates: None` derives terms from the classifier's entities (then
    /// the local extractor); `Some(vec![])` means there is nothing to test.
    /// `official_keywords` splits removed terms into List A and List B.
    ///
    /// Fails only when the text is empty or the baseline classification
    /// fails; individual trial failures are skipped.
    pub async fn run(
        &self,
        text: &str,
        target: &str,
        candidates: Option<Vec<String>>,
        official_keywords: &[String],
    ) -> Result<DragResult> {
        let baseline =
            match_within(self.classifier, text, target, self.settings.call_timeout).await?;
        let baseline_confidence = baseline.target_confidence;

        let terms = match candidates {
            Some(list) => list,
            None => self.derive_candidates(text).await,
        };
        let candidates = partition(dedupe(terms), official_keywords);
        let official_count = candidates.iter().filter(|c| c.official).count();
        let other_count = candidates.len() - official_count;

        info!(
            category = target,
            baseline = baseline_confidence,
            official = official_count,
            other = other_count,
            "Starting drag search"
        );

        let mut result = DragResult {
            target_category: target.to_string(),
            baseline_confidence,
            baseline_category: baseline.detected_category,
            final_confidence: baseline_confidence,
            iterations: Vec::new(),
            removed_official: Vec::new(),
            removed_other: Vec::new(),
            official_count,
            other_count,
            stop_reason: StopReason::NoTermsToTest,
            optimized_text: text.to_string(),
            oracle_failures: 0,
        };

        if candidates.is_empty() {
            info!("No terms to test");
            return Ok(result);
        }

        let mut remaining: Vec<Candidate> = candidates;
        let mut current_text = text.to_string();
        let mut current_confidence = baseline_confidence;

        result.stop_reason = loop {
            if self.is_cancelled() {
                break StopReason::Cancelled;
            }
            if remaining.is_empty() {
                break StopReason::CandidatesExhausted;
            }

            let trials = self.build_trials(&current_text, &remaining);
            let outcomes = self.evaluate(&trials, target).await;

            let mut best: Option<(usize, String, f64)> = None;
            for (trial, outcome) in trials.into_iter().zip(outcomes) {
                match outcome {
                    Ok(confidence) => {
                        let delta = confidence - current_confidence;
                        // Strict comparison keeps the earliest candidate on ties
                        let beats = match &best {
                            Some((_, _, best_conf)) => confidence > *best_conf,
                            None => delta > 0.0,
                        };
                        if beats {
                            best = Some((trial.index, trial.text, confidence));
                        }
                    }
                    Err(e) => {
                        warn!(
                            term = %remaining[trial.index].term,
                            error = %e,
                            "Classifier failed on trial, skipping candidate this round"
                        );
                        result.oracle_failures += 1;
                    }
                }
            }

            let Some((index, trial_text, confidence)) = best else {
                break StopReason::NoImprovement;
            };
            let improvement = confidence - current_confidence;
            if improvement <= self.settings.improvement_threshold {
                break StopReason::NoImprovement;
            }

            let committed = remaining.remove(index);
            let iteration = DragIteration {
                sequence_number: result.iterations.len() + 1,
                removed_term: committed.term.clone(),
                is_official_keyword: committed.official,
                confidence_before: current_confidence,
                confidence_after: confidence,
                improvement,
            };

            info!(
                round = iteration.sequence_number,
                term = %iteration.removed_term,
                official = iteration.is_official_keyword,
                before = iteration.confidence_before,
                after = iteration.confidence_after,
                "Committed removal"
            );

            if committed.official {
                result.removed_official.push(committed.term);
            } else {
                result.removed_other.push(committed.term);
            }
            result.iterations.push(iteration);
            current_text = trial_text;
            current_confidence = confidence;
        };

        result.final_confidence = current_confidence;
        result.optimized_text = current_text;

        info!(
            rounds = result.iterations.len(),
            improvement = result.total_improvement(),
            stop = result.stop_reason.describe(),
            "Drag search finished"
        );

        Ok(result)
    }

    /// Candidate trials for one round, in candidate order. Removals that
    /// change nothing or drop below the word floor are not worth an oracle
    /// call.
    fn build_trials(&self, current_text: &str, remaining: &[Candidate]) -> Vec<Trial> {
        remaining
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                let text = remove_term(current_text, &candidate.term, self.settings.removal_mode);
                if text == current_text {
                    debug!(term = %candidate.term, "Term not present in current text");
                    return None;
                }
                if word_count(&text) < self.settings.min_words {
                    debug!(term = %candidate.term, "Removal would drop below word floor");
                    return None;
                }
                Some(Trial { index, text })
            })
            .collect()
    }

    /// Target confidence for every trial, in trial order.
    async fn evaluate(&self, trials: &[Trial], target: &str) -> Vec<Result<f64>> {
        let classifier = self.classifier;
        let limit = self.settings.call_timeout;
        stream::iter(trials)
            .map(|trial| async move {
                match_within(classifier, &trial.text, target, limit)
                    .await
                    .map(|m| m.target_confidence)
            })
            .buffered(self.settings.concurrency)
            .collect()
            .await
    }

    /// Entities from the classifier, falling back to local TF-IDF terms.
    async fn derive_candidates(&self, text: &str) -> Vec<String> {
        let call = self.classifier.analyze(text, Features::ENTITIES);
        let outcome = match self.settings.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("timed out after {limit:?}"))),
            None => call.await,
        };
        let entities = match outcome {
            Ok(analysis) => analysis.entities.into_iter().map(|e| e.name).collect(),
            Err(e) => {
                warn!(error = %e, "Entity extraction failed");
                Vec::new()
            }
        };

        if entities.is_empty() && self.settings.local_fallback {
            debug!("No entities detected, using local term extraction");
            return LocalTermExtractor::default().extract(text);
        }
        entities
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// `match_category` bounded by `limit`; running out of time is an oracle error.
async fn match_within(
    classifier: &dyn TextClassifier,
    text: &str,
    target: &str,
    limit: Option<Duration>,
) -> Result<CategoryMatch> {
    let call = match_category(classifier, text, target);
    match limit {
        Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
            Error::Oracle(format!("classifier call timed out after {limit:?}"))
        })?,
        None => call.await,
    }
}

/// Trim, drop blanks, and drop case-insensitive repeats keeping first order.
fn dedupe(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

fn partition(terms: Vec<String>, official_keywords: &[String]) -> Vec<Candidate> {
    let official: HashSet<String> = official_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .collect();

    terms
        .into_iter()
        .map(|term| Candidate {
            official: official.contains(&term.to_lowercase()),
            term,
        })
        .collect()
}
