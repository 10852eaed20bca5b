//! Cross-encoder reranking with a length penalty and score threshold.

use anyhow::Result;

use crate::text::tokenize;
use crate::types::Chunk;

/// A model that scores a `(query, passage)` pair jointly.
pub trait CrossEncoderModel: Send + Sync {
    fn score(&self, query: &str, text: &str) -> Result<f32>;

    fn score_batch(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        texts.iter().map(|t| self.score(query, t)).collect()
    }
}

/// Deterministic token-overlap scorer: fraction of query tokens present in
/// the passage, scaled into roughly the same range a learned cross-encoder
/// would produce (`[-10, 10]`-ish) so the length penalty and score
/// threshold below behave sensibly against it.
pub struct LexicalOverlapReranker;

impl Default for LexicalOverlapReranker {
    fn default() -> Self {
        Self
    }
}

impl CrossEncoderModel for LexicalOverlapReranker {
    fn score(&self, query: &str, text: &str) -> Result<f32> {
        let query_tokens: std::collections::HashSet<String> = tokenize(query).into_iter().collect();
        if query_tokens.is_empty() {
            return Ok(-10.0);
        }
        let text_tokens: std::collections::HashSet<String> = tokenize(text).into_iter().collect();
        let overlap = query_tokens.intersection(&text_tokens).count();
        let ratio = overlap as f32 / query_tokens.len() as f32;
        Ok(ratio * 20.0 - 10.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RerankConfig {
    pub min_length: usize,
    pub score_threshold: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            min_length: 100,
            score_threshold: -8.0,
        }
    }
}

/// Rerank `chunk_ids` by fetching their text (order preserved), scoring
/// `(query, text)` pairs, applying a length penalty for short passages, and
/// dropping anything below `score_threshold`.
pub fn rerank(
    model: &dyn CrossEncoderModel,
    query: &str,
    chunk_ids: &[String],
    chunks_by_id: impl Fn(&str) -> Option<Chunk>,
    top_k: usize,
    config: RerankConfig,
) -> Result<Vec<(String, f32)>> {
    let mut fetched: Vec<(String, Chunk)> = Vec::new();
    for id in chunk_ids {
        if let Some(chunk) = chunks_by_id(id) {
            fetched.push((id.clone(), chunk));
        }
    }

    if fetched.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<&str> = fetched.iter().map(|(_, c)| c.text.as_str()).collect();
    let scores = model.score_batch(query, &texts)?;

    let mut scored: Vec<(String, f32)> = fetched
        .iter()
        .zip(scores)
        .map(|((id, chunk), score)| {
            let len = chunk.text.chars().count();
            let adjusted = if len < config.min_length {
                score * (0.5 + 0.5 * (len as f32 / config.min_length as f32))
            } else {
                score
            };
            (id.clone(), adjusted)
        })
        .filter(|(_, score)| *score >= config.score_threshold)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    Ok(scored)
}
