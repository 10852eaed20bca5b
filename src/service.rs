//! High-level service facade: wires engines together and exposes
//! `index` / `search` / `status` / `clear`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::embeddings::EmbeddingModel;
use crate::error::Result;
use crate::extraction::AcronymDictionary;
use crate::indexing::IndexingPipeline;
use crate::reranking::{rerank, CrossEncoderModel, RerankConfig};
use crate::search::fusion::build_search_results;
use crate::search::{fuse_results, Bm25Engine, GraphEngine, QueryExpander, SemanticEngine};
use crate::storage::{GraphStore, MetadataStore, VectorStore};
use crate::types::{IndexStats, SearchMode, SearchResult};

/// Single-writer, multi-reader facade over the retrieval core.
///
/// `index()` takes the write lock for its whole duration; `search()` and
/// `status()` take the read lock. Model instances are owned for the
/// lifetime of the service (lazy initialization, if desired, is the
/// caller's responsibility when constructing the `Arc<dyn ...>` handles).
pub struct Service {
    config: Config,
    pipeline: IndexingPipeline,
    bm25: RwLock<Bm25Engine>,
    reranker: Arc<dyn CrossEncoderModel>,
    vector_store: Arc<dyn VectorStore>,
    graph_store: Arc<dyn GraphStore>,
    metadata_store: Arc<dyn MetadataStore>,
    embedder: Arc<dyn EmbeddingModel>,
    acronyms: RwLock<AcronymDictionary>,
}

impl Service {
    pub fn new(
        config: Config,
        vector_store: Arc<dyn VectorStore>,
        graph_store: Arc<dyn GraphStore>,
        metadata_store: Arc<dyn MetadataStore>,
        embedder: Arc<dyn EmbeddingModel>,
        reranker: Arc<dyn CrossEncoderModel>,
    ) -> Self {
        let pipeline = IndexingPipeline::new(
            config.clone(),
            vector_store.clone(),
            graph_store.clone(),
            metadata_store.clone(),
            embedder.clone(),
        );

        Self {
            config,
            pipeline,
            bm25: RwLock::new(Bm25Engine::new()),
            reranker,
            vector_store,
            graph_store,
            metadata_store,
            embedder,
            acronyms: RwLock::new(AcronymDictionary::default()),
        }
    }

    pub fn index(&self, directory: &Path) -> Result<IndexStats> {
        let (stats, acronyms) = self.pipeline.index(directory)?;
        *self.acronyms.write() = acronyms;

        let mut bm25 = self.bm25.write();
        if let Ok(chunks) = self.metadata_store.get_all_chunks() {
            bm25.build_index(&chunks);
        }

        Ok(stats)
    }

    pub fn search(&self, query: &str, top_k: usize, mode: SearchMode, rerank_enabled: bool, expand: bool) -> Result<Vec<SearchResult>> {
        let semantic_engine = SemanticEngine::new(self.vector_store.clone(), self.embedder.clone());
        let graph_engine = GraphEngine::new(self.graph_store.clone(), self.metadata_store.clone());
        let query_expander = QueryExpander::new(self.metadata_store.clone());

        let search_query = if expand && self.config.features.enable_query_expansion {
            let acronyms = self.acronyms.read();
            let expanded = query_expander.expand(query, &acronyms)?;
            tracing::debug!(original = query, expanded = %expanded.expanded_text, "expanded query");
            expanded.expanded_text
        } else {
            query.to_string()
        };

        let pool_size = if rerank_enabled { self.config.search.rerank_pool_size } else { top_k };

        let mut semantic_hits = Vec::new();
        let mut bm25_hits = Vec::new();
        let mut graph_hits = Vec::new();

        let run_semantic = matches!(mode, SearchMode::Semantic | SearchMode::Hybrid);
        let run_bm25 = matches!(mode, SearchMode::Bm25 | SearchMode::Hybrid);

        if run_semantic || run_bm25 {
            let (s, b) = rayon::join(
                || {
                    if run_semantic {
                        semantic_engine.search(&search_query, pool_size).unwrap_or_default()
                    } else {
                        Vec::new()
                    }
                },
                || {
                    if run_bm25 {
                        self.bm25.read().search(&search_query, pool_size)
                    } else {
                        Vec::new()
                    }
                },
            );
            semantic_hits = s;
            bm25_hits = b;
        }

        if matches!(mode, SearchMode::Graph | SearchMode::Hybrid) {
            let seed_ids: Vec<String> = if mode == SearchMode::Graph {
                let sem_seeds = semantic_engine.search(&search_query, pool_size).unwrap_or_default();
                let bm25_seeds = self.bm25.read().search(&search_query, pool_size);
                dedup_preserve_order(sem_seeds.into_iter().chain(bm25_seeds).map(|(id, _)| id))
            } else {
                dedup_preserve_order(semantic_hits.iter().chain(bm25_hits.iter()).map(|(id, _)| id.clone()))
            };
            graph_hits = graph_engine.search(&search_query, pool_size, &seed_ids, self.config.search.graph_max_hops)?;
        }

        let mut engine_results: HashMap<String, Vec<(String, f32)>> = HashMap::new();
        if !semantic_hits.is_empty() {
            engine_results.insert("semantic".to_string(), semantic_hits);
        }
        if !bm25_hits.is_empty() {
            engine_results.insert("bm25".to_string(), bm25_hits);
        }
        if !graph_hits.is_empty() {
            engine_results.insert("graph".to_string(), graph_hits);
        }

        let mut fused = fuse_results(&engine_results, self.config.search.fusion_k);

        if rerank_enabled && !fused.is_empty() {
            let chunk_ids: Vec<String> = fused.iter().take(pool_size).map(|(id, _)| id.clone()).collect();
            let metadata_store = self.metadata_store.clone();
            fused = rerank(
                self.reranker.as_ref(),
                query,
                &chunk_ids,
                |id| metadata_store.get_chunk(id).ok().flatten(),
                pool_size,
                RerankConfig::default(),
            )?;
        }

        let results = build_search_results(&fused, &engine_results, &self.metadata_store, query, top_k)?;
        Ok(results)
    }

    pub fn status(&self) -> Result<Option<IndexStats>> {
        Ok(self.metadata_store.get_stats()?)
    }

    pub fn clear(&self) -> Result<()> {
        self.pipeline.clear()?;
        *self.acronyms.write() = AcronymDictionary::default();
        *self.bm25.write() = Bm25Engine::new();
        Ok(())
    }
}

fn dedup_preserve_order(iter: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    iter.filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::reranking::LexicalOverlapReranker;
    use crate::storage::memory::{InMemoryGraphStore, InMemoryMetadataStore, InMemoryVectorStore};

    fn service() -> Service {
        Service::new(
            Config::default(),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(InMemoryGraphStore::new()),
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(HashingEmbedder::new(64)),
            Arc::new(LexicalOverlapReranker),
        )
    }

    #[test]
    fn status_is_none_before_any_index_runs() {
        let svc = service();
        assert!(svc.status().unwrap().is_none());
    }

    #[test]
    fn search_before_indexing_returns_empty_not_an_error() {
        let svc = service();
        let results = svc.search("hello", 10, SearchMode::Hybrid, false, false).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn index_then_bm25_search_finds_the_chunk() {
        let dir = std::env::temp_dir().join(format!("mdkb_service_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.md"), "# Alpha\n\nHello world.").unwrap();

        let svc = service();
        let stats = svc.index(&dir).unwrap();
        assert_eq!(stats.total_chunks, 1);

        let results = svc.search("hello", 10, SearchMode::Bm25, false, false).unwrap();
        assert_eq!(results.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn clear_resets_status_to_none() {
        let dir = std::env::temp_dir().join(format!("mdkb_clear_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.md"), "# Alpha\n\nHello world.").unwrap();

        let svc = service();
        svc.index(&dir).unwrap();
        svc.clear().unwrap();
        assert!(svc.status().unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
