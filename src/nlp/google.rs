// Google Cloud Natural Language implementation.
//
// Uses the REST `documents:annotateText` method with an API key, asking for
// content classification, entity extraction, or both in one round-trip.
// Confidences and salience are rounded to 4 decimals so repeated runs compare
// cleanly in the brief.
//
// API docs: https://cloud.google.com/natural-language/docs/reference/rest/v1/documents/annotateText

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{CategoryScore, Entity, Features, TextAnalysis, TextClassifier};
use crate::error::Error;
use crate::output::truncate_chars;
use crate::rate_limiter::RateLimiter;

pub const DEFAULT_NLP_URL: &str = "https://language.googleapis.com/v1/documents:annotateText";

/// Whole-request timeout for one annotateText call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GoogleNlpClassifier {
    client: Client,
    api_key: String,
    endpoint: String,
    rate_limiter: RateLimiter,
}

impl GoogleNlpClassifier {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    /// A request that has not completed after `timeout` fails with an error.
    pub fn with_timeout(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("semflow/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            endpoint: DEFAULT_NLP_URL.to_string(),
            // The drag search issues one call per candidate per round
            rate_limiter: RateLimiter::per_second(20.0),
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl TextClassifier for GoogleNlpClassifier {
    async fn analyze(&self, text: &str, features: Features) -> Result<TextAnalysis> {
        if text.trim().is_empty() {
            return Err(Error::EmptyText.into());
        }

        self.rate_limiter.acquire().await;

        let request = AnnotateRequest {
            document: Document {
                doc_type: "PLAIN_TEXT",
                content: text,
            },
            features: RequestFeatures {
                extract_entities: features.entities,
                classify_text: features.classify,
            },
            encoding_type: "UTF8",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to call Google Natural Language API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Natural Language API returned {}: {}", status, body);
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .context("Failed to parse Natural Language API response")?;

        let analysis = into_analysis(parsed, features);

        debug!(
            categories = analysis.categories.len(),
            entities = analysis.entities.len(),
            top_category = ?analysis.categories.first().map(|c| c.name.as_str()),
            text_preview = %truncate_chars(text, 50),
            "Analyzed text"
        );

        Ok(analysis)
    }
}

fn into_analysis(response: AnnotateResponse, features: Features) -> TextAnalysis {
    let categories = if features.classify {
        response
            .categories
            .into_iter()
            .map(|c| CategoryScore {
                name: c.name,
                confidence: round4(c.confidence),
            })
            .collect()
    } else {
        Vec::new()
    };

    let entities = if features.entities {
        response
            .entities
            .into_iter()
            .map(|e| Entity {
                wikipedia_url: e.metadata.get("wikipedia_url").cloned(),
                name: e.name,
                entity_type: e.entity_type,
                salience: round4(e.salience),
            })
            .collect()
    } else {
        Vec::new()
    };

    TextAnalysis {
        categories,
        entities,
    }
    .sorted()
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

// --- Natural Language API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest<'a> {
    document: Document<'a>,
    features: RequestFeatures,
    encoding_type: &'static str,
}

#[derive(Serialize)]
struct Document<'a> {
    #[serde(rename = "type")]
    doc_type: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestFeatures {
    extract_entities: bool,
    classify_text: bool,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    categories: Vec<RawCategory>,
    #[serde(default)]
    entities: Vec<RawEntity>,
}

#[derive(Deserialize)]
struct RawCategory {
    name: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Deserialize)]
struct RawEntity {
    name: String,
    #[serde(rename = "type", default)]
    entity_type: String,
    #[serde(default)]
    salience: f64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}
