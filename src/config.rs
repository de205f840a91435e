use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::clustering::agglomerative::DEFAULT_DISTANCE_THRESHOLD;
use crate::clustering::cannibalization::DEFAULT_OVERLAP_THRESHOLD;
use crate::embeddings::download::{default_model_dir, embedding_files_present};
use crate::embeddings::openai::DEFAULT_EMBEDDING_MODEL;

/// Which embedding backend to use.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedderBackend {
    /// OpenAI embeddings API (default), requires OPENAI_API_KEY
    OpenAi,
    /// Local ONNX sentence transformer, no API key needed
    Onnx,
}

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy. CLI flags override the
/// numeric settings per invocation.
pub struct Config {
    pub openai_api_key: String,
    pub embedding_model: String,
    /// Which embedder to use (default: OpenAi)
    pub embedder_backend: EmbedderBackend,
    /// Directory holding downloaded ONNX models
    pub model_dir: PathBuf,
    pub google_nlp_api_key: String,
    pub distance_threshold: f64,
    pub overlap_threshold: f64,
    pub min_volume: f64,
    /// Where briefs are written
    pub output_dir: PathBuf,
    /// Whole-request timeout for embedding and classifier HTTP calls
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the API keys, which are only checked
    /// by the commands that need them.
    pub fn load() -> Result<Self> {
        let embedder_backend = match env::var("SEMFLOW_EMBEDDER").as_deref() {
            Ok("onnx") => EmbedderBackend::Onnx,
            // "openai" or unset both default to OpenAI
            _ => EmbedderBackend::OpenAi,
        };

        let model_dir = env::var("SEMFLOW_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_model_dir());

        let timeout_secs = env_f64("SEMFLOW_REQUEST_TIMEOUT_SECS", 30.0)?;
        if !(timeout_secs.is_finite() && timeout_secs > 0.0) {
            anyhow::bail!("SEMFLOW_REQUEST_TIMEOUT_SECS must be positive, got {timeout_secs}");
        }

        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            embedding_model: env::var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedder_backend,
            model_dir,
            google_nlp_api_key: env::var("GOOGLE_NLP_API_KEY").unwrap_or_default(),
            distance_threshold: env_f64("SEMFLOW_DISTANCE_THRESHOLD", DEFAULT_DISTANCE_THRESHOLD)?,
            overlap_threshold: env_f64("SEMFLOW_OVERLAP_THRESHOLD", DEFAULT_OVERLAP_THRESHOLD)?,
            min_volume: env_f64("SEMFLOW_MIN_VOLUME", 10.0)?,
            output_dir: env::var("SEMFLOW_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output")),
            request_timeout: Duration::from_secs_f64(timeout_secs),
        })
    }

    /// Check that the Google Natural Language key is configured.
    /// Call this before any operation that classifies text.
    pub fn require_classifier(&self) -> Result<()> {
        if self.google_nlp_api_key.is_empty() {
            anyhow::bail!(
                "GOOGLE_NLP_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Validate that the chosen embedder backend has what it needs.
    /// For OpenAI: API key must be set.
    /// For ONNX: model files must exist (or user should run download-model).
    pub fn require_embedder(&self) -> Result<()> {
        match self.embedder_backend {
            EmbedderBackend::OpenAi => {
                if self.openai_api_key.is_empty() {
                    anyhow::bail!(
                        "OPENAI_API_KEY not set. Add it to your .env file.\n\
                         Or set SEMFLOW_EMBEDDER=onnx to embed locally."
                    );
                }
                Ok(())
            }
            EmbedderBackend::Onnx => {
                if !embedding_files_present(&self.model_dir) {
                    anyhow::bail!(
                        "ONNX model files not found in {}\n\
                         Run `semflow download-model` to download them.",
                        self.model_dir.display()
                    );
                }
                Ok(())
            }
        }
    }
}

fn env_f64(name: &str, default: f64) -> Result<f64> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got '{raw}'")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_f64_default_when_unset() {
        assert_eq!(env_f64("SEMFLOW_TEST_UNSET_VALUE", 0.5).unwrap(), 0.5);
    }

    #[test]
    fn test_env_f64_parses_and_rejects() {
        env::set_var("SEMFLOW_TEST_PARSE_OK", " 0.35 ");
        assert_eq!(env_f64("SEMFLOW_TEST_PARSE_OK", 0.5).unwrap(), 0.35);

        env::set_var("SEMFLOW_TEST_PARSE_BAD", "tight");
        assert!(env_f64("SEMFLOW_TEST_PARSE_BAD", 0.5).is_err());
    }

    #[test]
    fn test_require_classifier_needs_key() {
        let config = Config {
            openai_api_key: String::new(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedder_backend: EmbedderBackend::OpenAi,
            model_dir: PathBuf::from("/nonexistent"),
            google_nlp_api_key: String::new(),
            distance_threshold: 0.5,
            overlap_threshold: 0.8,
            min_volume: 10.0,
            output_dir: PathBuf::from("output"),
            request_timeout: Duration::from_secs(30),
        };
        assert!(config.require_classifier().is_err());
        assert!(config.require_embedder().is_err());
    }
}
