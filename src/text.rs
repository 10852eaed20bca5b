//! Tokenization, sentence splitting, and noise-token filtering.
//!
//! This module is the single source of truth for tokenization across BM25,
//! TF-IDF, heading-term extraction, and query expansion. Divergence between
//! those components causes silent retrieval regressions, so none of them
//! should roll their own token regex.

use std::sync::LazyLock;

use regex::Regex;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());
static SENTENCE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)([.!?])\s+([A-Z])").unwrap());
static HEX_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#?[0-9a-fA-F]{3,8}$").unwrap());

/// Stop words and filler skipped by the lexical tokenizer.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "in", "is", "it", "its", "of", "on", "or", "that", "the", "to", "was", "were", "will",
    "with", "this", "these", "those", "you", "your", "we", "our", "i", "they", "their", "not",
    "can", "could", "should", "would", "if", "then", "than", "so", "do", "does", "did", "also",
    "about", "into", "over", "under", "more", "most", "such", "no", "nor", "only", "own",
    "same", "too", "very", "just",
];

/// Additional free-standing tokens to exclude even though they are not
/// generic stop-words (boilerplate noise observed in markdown corpora).
const SKIP_LIST: &[&str] = &["todo", "fixme", "nbsp", "http", "https", "www"];

/// Estimated token count: `max(1, len(text) / 4)`, matching the chunker's
/// budget estimation.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() / 4).max(1)
}

/// Lowercase `\b\w+\b` tokenization used by BM25 and TF-IDF.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Tokenize and drop noise tokens, for BM25 and TF-IDF corpora.
pub fn tokenize_filtered(text: &str) -> Vec<String> {
    tokenize(text).into_iter().filter(|t| !is_noise_token(t)).collect()
}

/// A token is noise if it is a stop-word, a skip-listed boilerplate term, a
/// bare hex color, or too short/numeric-only to carry lexical signal.
pub fn is_noise_token(token: &str) -> bool {
    if token.len() <= 2 {
        return true;
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    let lower = token.to_lowercase();
    if STOP_WORDS.contains(&lower.as_str()) || SKIP_LIST.contains(&lower.as_str()) {
        return true;
    }
    if HEX_COLOR_RE.is_match(token) {
        return true;
    }
    false
}

/// Split text into sentences on `[.!?]` followed by whitespace and an
/// uppercase letter, matching the chunker's sentence-boundary regex.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last = 0;
    for cap in SENTENCE_SPLIT_RE.captures_iter(text) {
        let punctuation = cap.get(1).unwrap();
        let next_letter = cap.get(2).unwrap();
        let end = punctuation.start() + 1; // include the terminal punctuation
        let piece = text[last..end].trim();
        if !piece.is_empty() {
            sentences.push(piece.to_string());
        }
        last = next_letter.start(); // resume at the uppercase letter, not consuming it
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Lowercase, strip punctuation; used by the query expander's structural
/// stage, keeping tokens of length > 1.
pub fn tokenize_for_expansion(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.len() > 1 && t.chars().any(|c| c.is_alphanumeric()))
        .collect()
}

/// Levenshtein edit distance, used by the acronym expansion stage's fuzzy
/// match.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut cur = vec![0usize; m + 1];
    for i in 1..=n {
        cur[0] = i;
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[m]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_splits_on_word_boundaries() {
        assert_eq!(tokenize("Hello, World!"), vec!["hello", "world"]);
    }

    #[test]
    fn is_noise_token_filters_stop_words_and_short_tokens() {
        assert!(is_noise_token("the"));
        assert!(is_noise_token("to"));
        assert!(is_noise_token("123"));
        assert!(!is_noise_token("markdown"));
    }

    #[test]
    fn split_sentences_breaks_on_terminal_punctuation_before_uppercase() {
        let sentences = split_sentences("Hello world. This is Rust. Done!");
        assert_eq!(sentences, vec!["Hello world.", "This is Rust.", "Done!"]);
    }

    #[test]
    fn levenshtein_distance_of_one_edit() {
        assert_eq!(levenshtein("SIEM", "SEIM"), 2);
        assert_eq!(levenshtein("SIEM", "SIEM"), 0);
        assert_eq!(levenshtein("SIEM", "SIE"), 1);
    }

    #[test]
    fn estimate_tokens_is_at_least_one() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens(&"a".repeat(40)), 10);
    }
}
