// Keyword CSV loading and normalization.
//
// Keyword exports come from many SEO tools and none of them agree on column
// names. We find the keyword column ("Keyword", "Search Term", "KW", ...) and
// the volume column ("Volume", "MSV", "Avg Monthly Searches", ...) by exact
// match first, then by partial match, and ignore every other column.
//
// Normalized rows are lowercased, trimmed, non-empty and unique. Volume is
// parsed leniently: thousands separators are stripped and anything
// unparseable becomes 0.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Error;

const KEYWORD_PATTERNS: &[&str] = &[
    "keyword",
    "keywords",
    "query",
    "queries",
    "search query",
    "search queries",
    "search term",
    "search terms",
    "term",
    "terms",
    "kw",
    "search",
    "phrase",
    "phrases",
];

const KEYWORD_PARTIALS: &[&str] = &["keyword", "query", "term", "phrase"];

const VOLUME_PATTERNS: &[&str] = &[
    "volume",
    "search volume",
    "monthly search volume",
    "msv",
    "sv",
    "searches",
    "monthly searches",
    "avg monthly searches",
    "search vol",
    "monthly volume",
    "avg searches",
    "search count",
    "monthly search",
    "monthly search count",
];

const VOLUME_PARTIALS: &[&str] = &["volume", "search", "msv", "sv"];

/// A normalized keyword row, before embeddings are attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRow {
    pub keyword: String,
    pub volume: f64,
}

/// Load and normalize a keyword CSV file.
pub fn load_keywords_csv(path: &Path) -> Result<Vec<KeywordRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open keyword file {}", path.display()))?;
    let rows = read_keywords(file)
        .with_context(|| format!("Failed to read keyword file {}", path.display()))?;

    info!(
        path = %path.display(),
        keywords = rows.len(),
        "Loaded keyword CSV"
    );
    Ok(rows)
}

/// Read and normalize keyword rows from any CSV source.
pub fn read_keywords<R: Read>(reader: R) -> Result<Vec<KeywordRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("CSV has no header row")?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let keyword_col = find_keyword_column(&headers).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Could not find keyword column. Available columns: {}\n\
             Expected one of: {}, etc.",
            headers.join(", "),
            KEYWORD_PATTERNS[..5].join(", ")
        ))
    })?;
    let volume_col = find_volume_column(&headers, keyword_col);

    debug!(
        keyword_column = headers[keyword_col].as_str(),
        volume_column = ?volume_col.map(|c| headers[c].as_str()),
        "Mapped CSV columns"
    );

    let mut raw = Vec::new();
    for record in csv_reader.records() {
        let record = record.context("Malformed CSV row")?;
        let keyword = record.get(keyword_col).unwrap_or_default().to_string();
        let volume = volume_col
            .and_then(|c| record.get(c))
            .map(parse_volume)
            .unwrap_or(0.0);
        raw.push((keyword, volume));
    }

    Ok(normalize_rows(raw))
}

/// Lowercase, trim, drop empties and drop duplicates (first occurrence wins).
pub fn normalize_rows(raw: Vec<(String, f64)>) -> Vec<KeywordRow> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|(keyword, volume)| {
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() || !seen.insert(keyword.clone()) {
                return None;
            }
            let volume = if volume.is_finite() && volume > 0.0 {
                volume
            } else {
                0.0
            };
            Some(KeywordRow { keyword, volume })
        })
        .collect()
}

/// Keep rows at or above `min_volume`. A minimum of 0 keeps everything.
pub fn filter_by_volume(rows: &[KeywordRow], min_volume: f64) -> Vec<KeywordRow> {
    if min_volume <= 0.0 {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|r| r.volume >= min_volume)
        .cloned()
        .collect()
}

/// Index of the keyword column among lowercased headers.
pub fn find_keyword_column(headers: &[String]) -> Option<usize> {
    let cleaned: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();

    cleaned
        .iter()
        .position(|h| KEYWORD_PATTERNS.contains(&h.as_str()))
        .or_else(|| {
            cleaned
                .iter()
                .position(|h| KEYWORD_PARTIALS.iter().any(|p| h.contains(p)))
        })
}

/// Index of the volume column, never the keyword column.
pub fn find_volume_column(headers: &[String], keyword_col: usize) -> Option<usize> {
    let cleaned: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();

    cleaned
        .iter()
        .enumerate()
        .position(|(i, h)| i != keyword_col && VOLUME_PATTERNS.contains(&h.as_str()))
        .or_else(|| {
            cleaned.iter().enumerate().position(|(i, h)| {
                i != keyword_col && VOLUME_PARTIALS.iter().any(|p| h.contains(p))
            })
        })
}

/// Parse a volume cell. "1,200" → 1200, "n/a" → 0.
pub fn parse_volume(cell: &str) -> f64 {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0)
}

fn clean_header(header: &str) -> String {
    header
        .to_lowercase()
        .replace(['_', '-'], " ")
        .trim()
        .to_string()
}
