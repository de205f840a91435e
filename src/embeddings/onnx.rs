// Local sentence embeddings using all-MiniLM-L6-v2 via ONNX Runtime.
//
// An alternative to the OpenAI provider for keyword sets that shouldn't leave
// the machine. Keywords are tokenized, run through the BERT encoder in chunks,
// mean-pooled over the attention mask and L2-normalized, giving 384-dim
// vectors that compare well under cosine similarity.
//
// Inference is CPU-bound, so each call runs inside spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, warn};

use super::traits::EmbeddingProvider;

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Texts per inference call. Bounds the padded tensor size.
const INFERENCE_CHUNK: usize = 64;

pub struct SentenceEmbedder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl SentenceEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from the given directory.
    /// Run `semflow download-model` first if they don't exist.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        for path in [&model_path, &tokenizer_path] {
            if !path.exists() {
                anyhow::bail!(
                    "Embedding model file not found: {}\nRun `semflow download-model` to download it.",
                    path.display()
                );
            }
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {}", e))?;

        debug!(model_dir = %model_dir.display(), "Loaded sentence embedding model");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for SentenceEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f64>>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || embed_all(&session, &tokenizer, &texts))
            .await
            .context("spawn_blocking panicked")?
    }

    fn name(&self) -> &str {
        "onnx-minilm"
    }
}

/// Tokenize every text, then embed the tokenizable ones chunk by chunk.
/// Empty or untokenizable texts come back as `None`.
fn embed_all(
    session: &Mutex<Session>,
    tokenizer: &Tokenizer,
    texts: &[String],
) -> Result<Vec<Option<Vec<f64>>>> {
    let mut results: Vec<Option<Vec<f64>>> = vec![None; texts.len()];

    let mut encoded: Vec<(usize, tokenizers::Encoding)> = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match tokenizer.encode(text, true) {
            Ok(enc) if !enc.get_ids().is_empty() => encoded.push((i, enc)),
            Ok(_) => {}
            Err(e) => warn!(index = i, error = %e, "Tokenization failed, skipping text"),
        }
    }

    for chunk in encoded.chunks(INFERENCE_CHUNK) {
        let encodings: Vec<&tokenizers::Encoding> = chunk.iter().map(|(_, e)| e).collect();
        let vectors = run_encoder(session, &encodings)?;
        for ((idx, _), vector) in chunk.iter().zip(vectors) {
            results[*idx] = Some(vector);
        }
    }

    debug!(
        texts = texts.len(),
        embedded = encoded.len(),
        dim = EMBEDDING_DIM,
        "Computed sentence embeddings"
    );

    Ok(results)
}

/// Padded model inputs for one chunk, flattened row-major.
struct EncoderInputs {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
    batch: usize,
    seq_len: usize,
}

fn build_inputs(encodings: &[&tokenizers::Encoding]) -> EncoderInputs {
    let batch = encodings.len();
    let seq_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0);

    let mut inputs = EncoderInputs {
        input_ids: Vec::with_capacity(batch * seq_len),
        attention_mask: Vec::with_capacity(batch * seq_len),
        token_type_ids: vec![0; batch * seq_len],
        batch,
        seq_len,
    };

    // BERT pad token id and pad mask are both 0
    for enc in encodings {
        let pad = seq_len - enc.get_ids().len();
        inputs
            .input_ids
            .extend(enc.get_ids().iter().map(|&id| id as i64));
        inputs.input_ids.extend(std::iter::repeat_n(0i64, pad));
        inputs
            .attention_mask
            .extend(enc.get_attention_mask().iter().map(|&m| m as i64));
        inputs.attention_mask.extend(std::iter::repeat_n(0i64, pad));
    }

    inputs
}

fn run_encoder(
    session: &Mutex<Session>,
    encodings: &[&tokenizers::Encoding],
) -> Result<Vec<Vec<f64>>> {
    let inputs = build_inputs(encodings);
    let shape = [inputs.batch as i64, inputs.seq_len as i64];

    let input_ids = Tensor::from_array((shape, inputs.input_ids))
        .context("Failed to create input_ids tensor")?;
    let attention_mask = Tensor::from_array((shape, inputs.attention_mask.clone()))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids = Tensor::from_array((shape, inputs.token_type_ids))
        .context("Failed to create token_type_ids tensor")?;

    // Output 0 is last_hidden_state: [batch, seq_len, 384]
    let hidden = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids
            })
            .context("Embedding ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract embedding output tensor")?;

        data.to_vec()
    };

    Ok((0..inputs.batch)
        .map(|row| {
            let pooled = mean_pool(&hidden, &inputs.attention_mask, row, inputs.seq_len);
            l2_normalize(pooled)
        })
        .collect())
}

/// Average the token vectors of one row, weighted by its attention mask.
fn mean_pool(hidden: &[f32], mask: &[i64], row: usize, seq_len: usize) -> Vec<f64> {
    let mut sum = vec![0.0_f64; EMBEDDING_DIM];
    let mut weight = 0.0_f64;

    for tok in 0..seq_len {
        let m = mask[row * seq_len + tok] as f64;
        if m <= 0.0 {
            continue;
        }
        weight += m;
        let offset = (row * seq_len + tok) * EMBEDDING_DIM;
        for (k, acc) in sum.iter_mut().enumerate() {
            *acc += hidden[offset + k] as f64 * m;
        }
    }

    if weight > 0.0 {
        for v in &mut sum {
            *v /= weight;
        }
    }
    sum
}

fn l2_normalize(mut v: Vec<f64>) -> Vec<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
