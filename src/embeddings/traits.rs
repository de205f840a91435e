// Embedding provider trait over text-to-vector oracles.
//
// The default implementation calls OpenAI's embeddings endpoint. A local ONNX
// sentence transformer is available when no API key should be involved.
// Providers report per-text failures as `None` instead of failing the batch;
// `attach_embeddings` then decides what a missing vector means for clustering.

use anyhow::Result;
use async_trait::async_trait;

use crate::clustering::models::KeywordRecord;
use crate::error::Error;
use crate::keywords::KeywordRow;

/// Trait for turning texts into fixed-length vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts. The result has the same length and order as
    /// `texts`; `None` marks a text the provider could not embed.
    ///
    /// An `Err` means the provider itself is unusable (bad credentials, model
    /// failed to load), not that one text failed.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f64>>>>;

    /// Short provider label for logs.
    fn name(&self) -> &str;
}

/// Pair keyword rows with their vectors.
///
/// Clustering cannot proceed with partial vectors, so any `None` fails the
/// whole batch with `MissingEmbeddings` naming every affected keyword. A
/// length mismatch between rows and vectors is an oracle error.
pub fn attach_embeddings(
    rows: &[KeywordRow],
    vectors: Vec<Option<Vec<f64>>>,
) -> Result<Vec<KeywordRecord>, Error> {
    if rows.len() != vectors.len() {
        return Err(Error::Oracle(format!(
            "embedding provider returned {} vectors for {} keywords",
            vectors.len(),
            rows.len()
        )));
    }

    let missing: Vec<String> = rows
        .iter()
        .zip(vectors.iter())
        .filter(|(_, v)| v.as_ref().map_or(true, |v| v.is_empty()))
        .map(|(r, _)| r.keyword.clone())
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingEmbeddings(missing));
    }

    Ok(rows
        .iter()
        .zip(vectors)
        .filter_map(|(row, v)| v.map(|e| KeywordRecord::new(&row.keyword, row.volume, e)))
        .collect())
}
