// Pipelines that tie the keyword, embedding, clustering and classifier
// stages together for the CLI commands.

pub mod cluster;
pub mod validate;

pub use cluster::{run_discover, run_populate, ClusterReport, ClusterSettings};
pub use validate::{validate_draft, ValidateOptions, ValidationReport};
