//! Graph search engine: score nodes reachable from seed chunks.

use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::{GraphStore, MetadataStore};

pub struct GraphEngine {
    graph_store: Arc<dyn GraphStore>,
    metadata_store: Arc<dyn MetadataStore>,
}

impl GraphEngine {
    pub fn new(graph_store: Arc<dyn GraphStore>, metadata_store: Arc<dyn MetadataStore>) -> Self {
        Self {
            graph_store,
            metadata_store,
        }
    }

    /// `query` is unused; seed IDs are mandatory. Accumulates `score += weight`
    /// per reachable neighbor across all seeds, drops the seeds themselves,
    /// and keeps only neighbors that are valid chunk IDs.
    pub fn search(&self, _query: &str, top_k: usize, seed_chunk_ids: &[String], max_hops: usize) -> anyhow::Result<Vec<(String, f32)>> {
        if seed_chunk_ids.is_empty() {
            return Ok(Vec::new());
        }

        let seeds: std::collections::HashSet<&str> = seed_chunk_ids.iter().map(|s| s.as_str()).collect();
        let mut scores: HashMap<String, f32> = HashMap::new();

        for seed in seed_chunk_ids {
            for (node_id, _label, weight) in self.graph_store.get_neighbors(seed, max_hops)? {
                if seeds.contains(node_id.as_str()) {
                    continue;
                }
                *scores.entry(node_id).or_insert(0.0) += weight;
            }
        }

        let mut candidates: Vec<(String, f32)> = Vec::new();
        for (node_id, score) in scores {
            if self.metadata_store.get_chunk(&node_id)?.is_some() {
                candidates.push((node_id, score));
            }
        }

        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(top_k);
        Ok(candidates)
    }
}
