// Local candidate-term extraction for the drag search.
//
// When the classifier reports no entities for a draft (or the entity call
// fails), the drag search still needs something to try removing. This
// extractor treats each sentence of the draft as a document and ranks words
// by TF-IDF, so terms that dominate a few sentences rank above words spread
// evenly through the text. Zero API calls.

use keyword_extraction::tf_idf::{TfIdf, TfIdfParams};
use stop_words::{get, LANGUAGE};
use tracing::debug;

pub struct LocalTermExtractor {
    /// Maximum terms to return
    pub max_terms: usize,
    /// Shorter words are ignored
    pub min_term_chars: usize,
}

impl Default for LocalTermExtractor {
    fn default() -> Self {
        Self {
            max_terms: 25,
            min_term_chars: 3,
        }
    }
}

impl LocalTermExtractor {
    /// Ranked candidate terms for `text`, best first. Empty text yields none.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Vec::new();
        }

        let stop_words: Vec<String> = get(LANGUAGE::English);
        let params = TfIdfParams::UnprocessedDocuments(&sentences, &stop_words, None);
        let tfidf = TfIdf::new(params);

        // Over-fetch so filtering still leaves max_terms
        let ranked: Vec<(String, f32)> = tfidf.get_ranked_word_scores(self.max_terms * 2);

        let terms: Vec<String> = ranked
            .into_iter()
            .map(|(word, _)| word)
            .filter(|w| w.chars().count() >= self.min_term_chars)
            .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
            .take(self.max_terms)
            .collect();

        debug!(
            sentences = sentences.len(),
            terms = terms.len(),
            "Extracted local candidate terms"
        );

        terms
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
