//! Small text utilities shared by solvers and evaluators.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？'];

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "which", "with",
];

/// Split text into trimmed sentences on Unicode sentence boundaries,
/// keeping the terminator. Handles CJK terminators with no trailing space.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Lowercase the text and drop ASCII and CJK punctuation.
pub fn remove_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_punctuation() && !SENTENCE_TERMINATORS.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercase alphanumeric words, apostrophes kept.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Words of `text` without stopwords.
pub fn content_words(text: &str) -> HashSet<String> {
    words(text)
        .into_iter()
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Fraction of `claim`'s content words that also occur in `passage`.
///
/// Returns 0 when the claim has no content words.
pub fn coverage(claim: &str, passage: &str) -> f64 {
    let claim_words = content_words(claim);
    if claim_words.is_empty() {
        return 0.0;
    }
    let passage_words = content_words(passage);
    let shared = claim_words.intersection(&passage_words).count();
    shared as f64 / claim_words.len() as f64
}

/// Jaccard similarity of the word sets of two strings.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a: HashSet<String> = words(a).into_iter().collect();
    let b: HashSet<String> = words(b).into_iter().collect();
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    let union = a.union(&b).count();
    shared as f64 / union as f64
}

/// Sliding windows of `size` words over a sentence. A sentence of at most
/// `size` words yields itself.
pub fn word_windows(sentence: &str, size: usize) -> Vec<String> {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.is_empty() || size == 0 {
        return Vec::new();
    }
    if words.len() <= size {
        return vec![words.join(" ")];
    }
    words.windows(size).map(|w| w.join(" ")).collect()
}
