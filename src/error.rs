// Typed errors for the clustering and drag-search core.
//
// Boundary code (HTTP clients, ONNX, file I/O, the CLI) uses anyhow like the
// rest of the crate. The core algorithms return this enum so callers can tell
// degenerate input apart from oracle trouble.

use thiserror::Error;

/// Result alias for the core algorithms.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Not enough records to run the requested operation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Degenerate or malformed input (empty cluster, bad CSV header, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A tuning parameter outside its allowed range.
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Embeddings within one run must share a dimension.
    #[error("Embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// The embedding provider returned no vector for these keywords.
    #[error("Missing embeddings for {} keyword(s): {}", .0.len(), .0.join(", "))]
    MissingEmbeddings(Vec<String>),

    /// The classifier refuses empty documents.
    #[error("Input text was empty")]
    EmptyText,

    /// An embedding or classification call failed or returned malformed data.
    #[error("Oracle error: {0}")]
    Oracle(String),
}

impl Error {
    /// Wrap an oracle failure, keeping the full anyhow context chain.
    pub fn oracle(err: &anyhow::Error) -> Self {
        Error::Oracle(format!("{err:#}"))
    }
}
