// OpenAI embeddings implementation.
//
// Keywords are sent in batches of up to 100 per request. A batch that fails
// (HTTP error, malformed body, wrong item count) is logged and every text in
// it is reported as `None`; the remaining batches still run. Whether a
// missing vector is fatal is decided later by `attach_embeddings`.
//
// API docs: https://platform.openai.com/docs/api-reference/embeddings

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::EmbeddingProvider;
use crate::rate_limiter::RateLimiter;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Texts per embeddings request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Whole-request timeout for one embeddings batch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    batch_size: usize,
    rate_limiter: RateLimiter,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_timeout(api_key, model, DEFAULT_TIMEOUT)
    }

    /// A batch that has not completed after `timeout` is treated as failed.
    pub fn with_timeout(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("semflow/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model,
            endpoint: DEFAULT_OPENAI_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            // Small pause between batches, like the original workflow's 0.1s sleep
            rate_limiter: RateLimiter::per_second(10.0),
        })
    }

    /// Point at a compatible endpoint (Azure, a local proxy, a test server).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn request_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f64>>> {
        self.rate_limiter.acquire().await;

        let request = EmbeddingRequest {
            input: inputs,
            model: &self.model,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call OpenAI embeddings API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI embeddings API returned {}: {}", status, body);
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI embeddings response")?;

        order_by_index(parsed.data, inputs.len())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f64>>>> {
        let mut results: Vec<Option<Vec<f64>>> = vec![None; texts.len()];

        // Only non-empty texts are sent; empty ones stay None
        let sendable: Vec<(usize, String)> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| (i, clean_text(t)))
            .filter(|(_, t)| !t.is_empty())
            .collect();

        let total_batches = sendable.len().div_ceil(self.batch_size);

        for (batch_num, chunk) in sendable.chunks(self.batch_size).enumerate() {
            let inputs: Vec<String> = chunk.iter().map(|(_, t)| t.clone()).collect();

            match self.request_batch(&inputs).await {
                Ok(vectors) => {
                    for ((idx, _), vector) in chunk.iter().zip(vectors) {
                        results[*idx] = Some(vector);
                    }
                    debug!(
                        batch = batch_num + 1,
                        total = total_batches,
                        size = chunk.len(),
                        "Embedded batch"
                    );
                }
                Err(e) => {
                    warn!(
                        batch = batch_num + 1,
                        total = total_batches,
                        error = %e,
                        "Embedding batch failed, marking its texts as missing"
                    );
                }
            }
        }

        Ok(results)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Newlines hurt embedding quality; collapse them and trim.
fn clean_text(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

/// Put response items back in request order. The API returns an `index` per
/// item; anything missing or out of range is an error for the whole batch.
fn order_by_index(data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f64>>> {
    if data.len() != expected {
        anyhow::bail!(
            "OpenAI returned {} embeddings for {} inputs",
            data.len(),
            expected
        );
    }

    let mut ordered: Vec<Option<Vec<f64>>> = vec![None; expected];
    for item in data {
        let slot = ordered
            .get_mut(item.index)
            .with_context(|| format!("Embedding index {} out of range", item.index))?;
        *slot = Some(item.embedding);
    }

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.with_context(|| format!("No embedding returned for input {i}")))
        .collect()
}

// --- OpenAI request/response types ---

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  cheap\nflights \n"), "cheap flights");
        assert_eq!(clean_text(" \n "), "");
    }

    #[test]
    fn test_order_by_index_reorders() {
        let data = vec![
            EmbeddingData {
                index: 1,
                embedding: vec![2.0],
            },
            EmbeddingData {
                index: 0,
                embedding: vec![1.0],
            },
        ];
        let ordered = order_by_index(data, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_order_by_index_rejects_count_mismatch() {
        let data = vec![EmbeddingData {
            index: 0,
            embedding: vec![1.0],
        }];
        assert!(order_by_index(data, 2).is_err());
    }

    #[test]
    fn test_order_by_index_rejects_duplicate_index() {
        let data = vec![
            EmbeddingData {
                index: 0,
                embedding: vec![1.0],
            },
            EmbeddingData {
                index: 0,
                embedding: vec![2.0],
            },
        ];
        assert!(order_by_index(data, 2).is_err());
    }

    #[tokio::test]
    async fn test_unanswered_batch_marks_texts_missing() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let embedder = OpenAiEmbedder::with_timeout(
            "unused".into(),
            DEFAULT_EMBEDDING_MODEL.into(),
            Duration::from_millis(200),
        )
        .unwrap()
        .with_endpoint(&format!("http://{addr}/v1/embeddings"));

        let texts = vec!["lisbon hotels".to_string(), "porto hotels".to_string()];
        let vectors = tokio::time::timeout(Duration::from_secs(10), embedder.embed_batch(&texts))
            .await
            .expect("batch should time out on its own")
            .unwrap();
        assert_eq!(vectors, vec![None, None]);
    }

    #[test]
    fn test_response_parses() {
        let body = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,-0.2]}],"model":"text-embedding-3-small"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.1, -0.2]);
    }
}
