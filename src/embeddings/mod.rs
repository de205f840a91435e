// Embedding providers: trait-based abstraction over text-to-vector oracles.
//
// EmbeddingProvider defines the batch interface. OpenAiEmbedder calls the
// OpenAI API; SentenceEmbedder runs all-MiniLM-L6-v2 locally through ONNX.

pub mod download;
pub mod onnx;
pub mod openai;
pub mod traits;

pub use traits::{attach_embeddings, EmbeddingProvider};
