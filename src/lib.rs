// Semflow: semantic keyword clustering and draft category analysis
//
// This is the library root. Each module corresponds to a stage of the
// keyword -> cluster -> brief -> draft validation workflow.

pub mod brief;
pub mod clustering;
pub mod config;
pub mod drag;
pub mod embeddings;
pub mod error;
pub mod keywords;
pub mod nlp;
pub mod output;
pub mod pipeline;
pub mod rate_limiter;
