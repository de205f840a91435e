// Model download helper for the local sentence embedding model.
//
// Fetches all-MiniLM-L6-v2 (ONNX export + tokenizer) from HuggingFace into a
// platform data directory (~/.local/share/semflow/models/ on Linux) so it
// persists across runs. Existing files are left alone.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

const EMBEDDING_HF_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main";

/// (remote path, local file name, show progress bar)
const MODEL_FILES: &[(&str, &str, bool)] = &[
    ("tokenizer.json", "tokenizer.json", false),
    ("onnx/model.onnx", "model.onnx", true),
];

/// Default directory for model files.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("semflow")
        .join("models")
}

/// Subdirectory holding the sentence embedding model.
pub fn embedding_model_dir(base: &Path) -> PathBuf {
    base.join("all-MiniLM-L6-v2")
}

/// True when both model files are on disk.
pub fn embedding_files_present(base: &Path) -> bool {
    let dir = embedding_model_dir(base);
    MODEL_FILES
        .iter()
        .all(|(_, local, _)| dir.join(local).exists())
}

/// Download the embedding model into `base`, skipping files that exist.
pub async fn download_model(base: &Path) -> Result<()> {
    let dir = embedding_model_dir(base);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nSentence embedding model (all-MiniLM-L6-v2):");

    for (remote, local, show_progress) in MODEL_FILES {
        let dest = dir.join(local);
        if dest.exists() {
            info!(file = local, "Model file already exists, skipping");
            println!("  {local} (already exists)");
            continue;
        }
        println!("  Downloading {local}...");
        download_file(&format!("{EMBEDDING_HF_URL}/{remote}"), &dest, *show_progress).await?;
    }

    Ok(())
}

async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        let pb = match response.content_length() {
            Some(size) => {
                let pb = ProgressBar::new(size);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
                        .progress_chars("=> "),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(ProgressStyle::default_spinner().template("    {spinner} {bytes}")?);
                pb
            }
        };
        Some(pb)
    } else {
        None
    };

    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;

    if let Some(pb) = &pb {
        pb.set_position(bytes.len() as u64);
    }

    std::fs::write(dest, &bytes).with_context(|| format!("Failed to write {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!(url = url, dest = %dest.display(), "Downloaded model file");
    Ok(())
}
