// Strategic brief: one row per cluster, saved as CSV and read back later by
// draft validation.
//
// Tier lists are stored comma-joined. Primary and secondary are written in
// full so validation can recover the official keywords; tertiary is stored
// as a count only ("12 additional"), so the long tail does not survive a
// round trip through the file.

pub mod coverage;

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clustering::ClusterAnalysis;

pub use coverage::{keyword_coverage, CoverageStatus, KeywordCoverage, TierCoverage};

/// Classifier results attached to one cluster while building the brief.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterClassification {
    /// Set when the cluster was tested against a target (POPULATE)
    pub target_category: Option<String>,
    pub matches_target: Option<bool>,
    pub detected_category: Option<String>,
    /// Top category confidence, or the target's confidence when one was given
    pub confidence: f64,
    pub top_entities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefRow {
    pub cluster_id: usize,
    pub cluster_name: String,
    pub hub_keyword: String,
    pub total_keywords: usize,
    pub total_volume: f64,
    pub coherence: f64,
    pub primary_keywords: String,
    pub secondary_keywords: String,
    pub tertiary_keywords: String,
    pub target_category: Option<String>,
    pub matches_target: Option<bool>,
    pub detected_category: Option<String>,
    pub confidence: f64,
    pub top_entities: String,
}

impl BriefRow {
    pub fn new(analysis: &ClusterAnalysis, classification: &ClusterClassification) -> Self {
        Self {
            cluster_id: analysis.cluster_id,
            cluster_name: analysis.hub_keyword.clone(),
            hub_keyword: analysis.hub_keyword.clone(),
            total_keywords: analysis.total_keywords,
            total_volume: analysis.total_volume,
            coherence: analysis.coherence,
            primary_keywords: analysis.primary.join(", "),
            secondary_keywords: analysis.secondary.join(", "),
            tertiary_keywords: format!("{} additional", analysis.tertiary.len()),
            target_category: classification.target_category.clone(),
            matches_target: classification.matches_target,
            detected_category: classification.detected_category.clone(),
            confidence: classification.confidence,
            top_entities: classification.top_entities.join(", "),
        }
    }

    pub fn primary(&self) -> Vec<String> {
        split_joined(&self.primary_keywords)
    }

    pub fn secondary(&self) -> Vec<String> {
        split_joined(&self.secondary_keywords)
    }

    /// Number of tertiary keywords, parsed from "N additional".
    pub fn tertiary_count(&self) -> usize {
        self.tertiary_keywords
            .split_whitespace()
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }

    /// Primary followed by secondary keywords.
    pub fn official_keywords(&self) -> Vec<String> {
        let mut keywords = self.primary();
        keywords.extend(self.secondary());
        keywords
    }

    pub fn entities(&self) -> Vec<String> {
        split_joined(&self.top_entities)
    }
}

/// Split a comma-joined cell back into trimmed, non-empty items.
pub fn split_joined(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Look up one cluster's row.
pub fn find_row(rows: &[BriefRow], cluster_id: usize) -> Option<&BriefRow> {
    rows.iter().find(|r| r.cluster_id == cluster_id)
}

pub fn write_brief(path: &Path, rows: &[BriefRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create brief {}", path.display()))?;
    write_rows(file, rows)?;

    info!(path = %path.display(), clusters = rows.len(), "Saved strategic brief");
    Ok(())
}

pub fn write_rows<W: Write>(writer: W, rows: &[BriefRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row).context("Failed to write brief row")?;
    }
    csv_writer.flush().context("Failed to flush brief")?;
    Ok(())
}

pub fn read_brief(path: &Path) -> Result<Vec<BriefRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open brief {}", path.display()))?;
    read_rows(file).with_context(|| format!("Failed to read brief {}", path.display()))
}

pub fn read_rows<R: Read>(reader: R) -> Result<Vec<BriefRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize()
        .map(|row| row.context("Malformed brief row"))
        .collect()
}
