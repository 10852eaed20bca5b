//! BM25-Okapi sparse lexical search engine.
//!
//! A pure-Rust scorer rather than a binding to a full inverted-index
//! library: the storage contract (§6) requires exact control over the
//! persisted shape — one file holding the corpus statistics plus a parallel
//! `chunk_ids` list — which a general-purpose search engine's own directory
//! format does not give us.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::text::tokenize_filtered;
use crate::types::Chunk;

const K1: f32 = 1.5;
const B: f32 = 0.75;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Bm25Index {
    chunk_ids: Vec<String>,
    doc_tokens: Vec<Vec<String>>,
    doc_lengths: Vec<usize>,
    avg_doc_length: f32,
    doc_freq: HashMap<String, usize>,
}

pub struct Bm25Engine {
    index: Option<Bm25Index>,
}

impl Default for Bm25Engine {
    fn default() -> Self {
        Self { index: None }
    }
}

impl Bm25Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize every chunk and build the corpus statistics.
    pub fn build_index(&mut self, chunks: &[Chunk]) {
        let doc_tokens: Vec<Vec<String>> = chunks.iter().map(|c| tokenize_filtered(&c.text)).collect();
        let doc_lengths: Vec<usize> = doc_tokens.iter().map(|t| t.len()).collect();
        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.iter().sum::<usize>() as f32 / doc_lengths.len() as f32
        };

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for tokens in &doc_tokens {
            let unique: std::collections::HashSet<&String> = tokens.iter().collect();
            for t in unique {
                *doc_freq.entry(t.clone()).or_insert(0) += 1;
            }
        }

        self.index = Some(Bm25Index {
            chunk_ids: chunks.iter().map(|c| c.chunk_id.clone()).collect(),
            doc_tokens,
            doc_lengths,
            avg_doc_length,
            doc_freq,
        });
    }

    pub fn save_index(&self, path: &Path) -> anyhow::Result<()> {
        let index = self.index.as_ref().ok_or_else(|| anyhow::anyhow!("no BM25 index built"))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(index)?)?;
        Ok(())
    }

    pub fn load_index(&mut self, path: &Path) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.index = Some(serde_json::from_str(&content)?);
        Ok(())
    }

    fn idf(&self, index: &Bm25Index, term: &str) -> f32 {
        let n = index.chunk_ids.len() as f32;
        let df = *index.doc_freq.get(term).unwrap_or(&0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score all documents against `query`, return descending `(chunk_id, score)`
    /// pairs for the top `top_k`, dropping non-positive scores.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        let Some(index) = &self.index else {
            return Vec::new();
        };
        let query_tokens = tokenize_filtered(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scores: Vec<(String, f32)> = index
            .chunk_ids
            .iter()
            .enumerate()
            .map(|(i, chunk_id)| {
                let doc_len = index.doc_lengths[i] as f32;
                let mut term_counts: HashMap<&str, usize> = HashMap::new();
                for t in &index.doc_tokens[i] {
                    *term_counts.entry(t.as_str()).or_insert(0) += 1;
                }

                let score: f32 = query_tokens
                    .iter()
                    .map(|qt| {
                        let f = *term_counts.get(qt.as_str()).unwrap_or(&0) as f32;
                        if f == 0.0 {
                            return 0.0;
                        }
                        let idf = self.idf(index, qt);
                        idf * (f * (K1 + 1.0)) / (f + K1 * (1.0 - B + B * doc_len / index.avg_doc_length.max(1.0)))
                    })
                    .sum();

                (chunk_id.clone(), score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(top_k);
        scores
    }

    pub fn is_built(&self) -> bool {
        self.index.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: id.into(),
            file_path: PathBuf::from("a.md"),
            heading_hierarchy: vec![],
            level: 0,
            text: text.to_string(),
            chunk_index: 0,
            char_offset: 0,
        }
    }

    #[test]
    fn search_for_hello_finds_matching_chunk_with_positive_score() {
        let mut engine = Bm25Engine::new();
        engine.build_index(&[chunk("c1", "Hello world, this is a test document.")]);
        let results = engine.search("hello", 10);
        assert_eq!(results.len(), 1);
        assert!(results[0].1 > 0.0);
    }

    #[test]
    fn empty_query_returns_no_results() {
        let mut engine = Bm25Engine::new();
        engine.build_index(&[chunk("c1", "some text")]);
        assert!(engine.search("   ", 10).is_empty());
    }

    #[test]
    fn query_with_no_matches_returns_empty() {
        let mut engine = Bm25Engine::new();
        engine.build_index(&[chunk("c1", "apples oranges bananas")]);
        assert!(engine.search("zyxwvutsrq", 10).is_empty());
    }

    #[test]
    fn index_round_trips_through_a_file() {
        let mut engine = Bm25Engine::new();
        engine.build_index(&[chunk("c1", "hello world")]);
        let path = std::env::temp_dir().join("mdkb_bm25_test.json");
        engine.save_index(&path).unwrap();

        let mut reloaded = Bm25Engine::new();
        reloaded.load_index(&path).unwrap();
        assert_eq!(reloaded.search("hello", 10), engine.search("hello", 10));
        let _ = std::fs::remove_file(&path);
    }
}
