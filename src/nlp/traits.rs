// Text classifier trait: the category/entity oracle.
//
// The default implementation is Google Cloud Natural Language, whose content
// categories ("/Travel/Hotels & Accommodations") and salience-ranked entities
// drive both the strategic brief and the drag search. Everything downstream
// talks to this trait, so tests swap in an in-memory classifier.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One detected content category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Taxonomy path, e.g. "/Travel/Air Travel"
    pub name: String,
    /// 0.0 to 1.0
    pub confidence: f64,
}

/// One named entity detected in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    /// Provider entity type (PERSON, LOCATION, ORGANIZATION, ...)
    pub entity_type: String,
    /// 0.0 to 1.0 importance of the entity to the whole text
    pub salience: f64,
    pub wikipedia_url: Option<String>,
}

/// Which analyses to request in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub classify: bool,
    pub entities: bool,
}

impl Features {
    pub const ALL: Features = Features {
        classify: true,
        entities: true,
    };
    pub const CATEGORIES: Features = Features {
        classify: true,
        entities: false,
    };
    pub const ENTITIES: Features = Features {
        classify: false,
        entities: true,
    };
}

/// Result of one analysis call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    /// Sorted by confidence, highest first
    pub categories: Vec<CategoryScore>,
    /// Sorted by salience, highest first
    pub entities: Vec<Entity>,
}

impl TextAnalysis {
    /// Restore the ordering contract after building from a raw response.
    pub fn sorted(mut self) -> Self {
        self.categories
            .sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        self.entities.sort_by(|a, b| b.salience.total_cmp(&a.salience));
        self
    }

    /// Names of the `n` most salient entities.
    pub fn top_entities(&self, n: usize) -> Vec<String> {
        self.entities.iter().take(n).map(|e| e.name.clone()).collect()
    }
}

/// Trait for classifying text into content categories and extracting
/// entities. Implementations must be async because providers are HTTP APIs.
///
/// Empty or whitespace-only text must be rejected with an error rather than
/// answered with empty lists.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn analyze(&self, text: &str, features: Features) -> Result<TextAnalysis>;
}
