// Text classification: category/entity oracle, target matching, the category
// taxonomy, and local term extraction.

pub mod google;
pub mod local;
pub mod matching;
pub mod taxonomy;
pub mod traits;

pub use matching::{match_category, CategoryMatch};
pub use traits::{CategoryScore, Entity, Features, TextAnalysis, TextClassifier};
