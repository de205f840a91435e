// Keyword coverage: how many of a cluster's tier keywords a draft actually
// mentions. Presence is a case-insensitive substring check.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    Good,
    Warning,
    Poor,
}

impl CoverageStatus {
    fn from_ratio(ratio: f64, good: f64, warning: f64) -> Self {
        if ratio >= good {
            CoverageStatus::Good
        } else if ratio >= warning {
            CoverageStatus::Warning
        } else {
            CoverageStatus::Poor
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierCoverage {
    pub found: usize,
    pub total: usize,
    /// found / total, 0.0 for an empty tier
    pub percentage: f64,
    pub missing: Vec<String>,
}

impl TierCoverage {
    fn measure(draft_lower: &str, keywords: &[String]) -> Self {
        let missing: Vec<String> = keywords
            .iter()
            .filter(|kw| !draft_lower.contains(&kw.to_lowercase()))
            .cloned()
            .collect();
        let total = keywords.len();
        let found = total - missing.len();
        let percentage = if total > 0 {
            found as f64 / total as f64
        } else {
            0.0
        };

        Self {
            found,
            total,
            percentage,
            missing,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordCoverage {
    pub primary: TierCoverage,
    pub secondary: TierCoverage,
    pub tertiary: TierCoverage,
}

impl KeywordCoverage {
    /// Good from 80%, warning from 60%.
    pub fn primary_status(&self) -> CoverageStatus {
        CoverageStatus::from_ratio(self.primary.percentage, 0.80, 0.60)
    }

    /// Good from 60%, warning from 40%.
    pub fn secondary_status(&self) -> CoverageStatus {
        CoverageStatus::from_ratio(self.secondary.percentage, 0.60, 0.40)
    }
}

pub fn keyword_coverage(
    draft: &str,
    primary: &[String],
    secondary: &[String],
    tertiary: &[String],
) -> KeywordCoverage {
    let draft_lower = draft.to_lowercase();
    KeywordCoverage {
        primary: TierCoverage::measure(&draft_lower, primary),
        secondary: TierCoverage::measure(&draft_lower, secondary),
        tertiary: TierCoverage::measure(&draft_lower, tertiary),
    }
}
