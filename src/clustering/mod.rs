// Keyword clustering: agglomerative grouping, cluster analysis and
// cannibalization detection over keyword embeddings.

pub mod agglomerative;
pub mod analysis;
pub mod cannibalization;
pub mod models;
pub mod vector;

pub use agglomerative::Clusterer;
pub use analysis::ClusterAnalyzer;
pub use cannibalization::CannibalizationDetector;
pub use models::{CannibalizationPair, Cluster, ClusterAnalysis, KeywordRecord, RankedKeyword};
