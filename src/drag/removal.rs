// Term removal for drag trials.
//
// Plain substring removal silently cuts inside words: removing "art" from
// "smart art" leaves "sm ". The default mode only removes occurrences that
// stand as whole words, judged by the characters on either side of each
// match. Case folding is Unicode-aware ("école" matches "ÉCOLE"): matching
// runs on a lowercased copy whose offsets map back to the original text.
// `Substring` keeps the raw case-sensitive replace for callers that want it.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalMode {
    /// Remove every whole-word, case-insensitive occurrence
    #[default]
    WordBoundary,
    /// Remove every exact substring occurrence, even inside other words
    Substring,
}

/// Remove every occurrence of `term` from `text` according to `mode`, then
/// tidy the whitespace left behind.
pub fn remove_term(text: &str, term: &str, mode: RemovalMode) -> String {
    let term = term.trim();
    if term.is_empty() {
        return text.to_string();
    }

    let removed = match mode {
        RemovalMode::Substring => text.replace(term, ""),
        RemovalMode::WordBoundary => remove_whole_words(text, term),
    };

    tidy_whitespace(&removed)
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn remove_whole_words(text: &str, term: &str) -> String {
    let Ok(re) = Regex::new(&regex_lite::escape(&term.to_lowercase())) else {
        return text.to_string();
    };
    let folded = Folded::new(text);

    // Edges that are punctuation ("c++", "#1") don't need a boundary there
    let needs_left = term.chars().next().is_some_and(is_word_char);
    let needs_right = term.chars().next_back().is_some_and(is_word_char);

    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in re.find_iter(&folded.lower) {
        // Matches that start or end inside one char's lowercase expansion are skipped
        let (Some(start), Some(end)) = (folded.source(m.start()), folded.source(m.end())) else {
            continue;
        };
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        let left_ok = !needs_left || !before.is_some_and(is_word_char);
        let right_ok = !needs_right || !after.is_some_and(is_word_char);

        if left_ok && right_ok {
            out.push_str(&text[last..start]);
            last = end;
        }
    }
    out.push_str(&text[last..]);
    out
}

/// Lowercased copy of a text with a map from lowercased byte offsets back to
/// source byte offsets. Only offsets where a source char's expansion begins
/// (plus the end) map back.
struct Folded {
    lower: String,
    offsets: Vec<Option<usize>>,
}

impl Folded {
    fn new(text: &str) -> Self {
        let mut lower = String::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);

        for (i, c) in text.char_indices() {
            offsets.push(Some(i));
            lower.extend(c.to_lowercase());
            offsets.resize(lower.len(), None);
        }
        offsets.push(Some(text.len()));

        Self { lower, offsets }
    }

    fn source(&self, folded_offset: usize) -> Option<usize> {
        self.offsets.get(folded_offset).copied().flatten()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Collapse runs of spaces/tabs left by removals and trim the ends.
/// Newlines are kept so paragraph structure survives.
fn tidy_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_blank = false;

    for c in text.chars() {
        let blank = c == ' ' || c == '\t';
        if blank && prev_blank {
            continue;
        }
        out.push(if blank { ' ' } else { c });
        prev_blank = blank;
    }

    out.trim().to_string()
}
