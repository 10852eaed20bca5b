//! End-to-end indexing pipeline: discover -> chunk -> embed -> BM25 ->
//! extract -> populate graph -> persist stats.

use std::sync::Arc;

use chrono::Utc;
use rayon::prelude::*;

use crate::chunker::{chunk_file, ChunkerConfig};
use crate::config::Config;
use crate::embeddings::EmbeddingModel;
use crate::error::Result;
use crate::extraction::keyterms::KeyTermConfig;
use crate::extraction::{acronyms::extract_acronyms_from_chunks, AcronymDictionary, KeyTermExtractor, StructuralExtractor};
use crate::reader::{discover_files, read_file};
use crate::search::Bm25Engine;
use crate::storage::{GraphStore, MetadataStore, VectorStore};
use crate::types::{Chunk, IndexStats};

pub struct IndexingPipeline {
    config: Config,
    vector_store: Arc<dyn VectorStore>,
    graph_store: Arc<dyn GraphStore>,
    metadata_store: Arc<dyn MetadataStore>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl IndexingPipeline {
    pub fn new(
        config: Config,
        vector_store: Arc<dyn VectorStore>,
        graph_store: Arc<dyn GraphStore>,
        metadata_store: Arc<dyn MetadataStore>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        Self {
            config,
            vector_store,
            graph_store,
            metadata_store,
            embedder,
        }
    }

    /// Index every markdown file under `directory`. Returns the new
    /// [`IndexStats`] on success.
    ///
    /// On a fatal I/O error the pipeline aborts, leaving the stores in
    /// whatever intermediate state was reached; the only recovery is
    /// `clear()` followed by a retry.
    pub fn index(&self, directory: &std::path::Path) -> Result<(IndexStats, AcronymDictionary)> {
        // 1. Discover files.
        let files = discover_files(directory)?;
        tracing::info!(count = files.len(), path = %directory.display(), "discovered files");

        // 2. Read and chunk.
        let chunker_config = ChunkerConfig {
            max_tokens: self.config.chunking.max_chunk_tokens,
            overlap_tokens: self.config.chunking.chunk_overlap_tokens,
        };
        let all_chunks: Vec<Chunk> = files
            .par_iter()
            .map(|file| -> Result<Vec<Chunk>> {
                let content = read_file(&file.path)?;
                Ok(chunk_file(&file.path, &content, chunker_config))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();
        tracing::info!(chunks = all_chunks.len(), files = files.len(), "produced chunks");

        // 3. Persist chunks.
        self.metadata_store.save_chunks(&all_chunks)?;

        // 4. Encode and add to vector store.
        if !all_chunks.is_empty() {
            let texts: Vec<&str> = all_chunks.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedder.embed_documents(&texts)?;
            self.vector_store.add_chunks(&all_chunks, &embeddings)?;
            tracing::info!(count = all_chunks.len(), "added vectors to vector store");
        }

        // 5. Build BM25 index.
        let mut bm25 = Bm25Engine::new();
        bm25.build_index(&all_chunks);
        bm25.save_index(&self.config.bm25_path())?;

        // 6. Structural extraction.
        let structural_result = StructuralExtractor::new().extract(&all_chunks);
        tracing::info!(
            entities = structural_result.entities.len(),
            relations = structural_result.relations.len(),
            "structural extraction"
        );

        // 7. NER extraction is an out-of-scope external collaborator; when
        // selected it is logged and otherwise a no-op.
        if self.config.extract_depth == crate::config::ExtractDepth::Ner {
            tracing::warn!("extract_depth=ner selected but no NER extractor is wired in; skipping");
        }

        // 8. Key-term extraction (TF-IDF + acronyms + heading terms).
        let keyterm_config = KeyTermConfig {
            min_df: self.config.keyterms.min_df,
            max_df_ratio: self.config.keyterms.max_df_ratio,
            top_k_per_chunk: self.config.keyterms.top_k_per_chunk,
            top_percentile: self.config.keyterms.top_percentile,
        };
        let keyterm_result = KeyTermExtractor::new(keyterm_config).extract(&all_chunks);
        tracing::info!(
            entities = keyterm_result.entities.len(),
            relations = keyterm_result.relations.len(),
            "key-term extraction"
        );

        let all_entities: Vec<_> = structural_result.entities.into_iter().chain(keyterm_result.entities).collect();
        let all_relations: Vec<_> = structural_result.relations.into_iter().chain(keyterm_result.relations).collect();

        // 9. Populate graph store: entity/tag nodes, file nodes, section
        // nodes, relation edges, then CONTAINS edges file -> chunk.
        for entity in &all_entities {
            if entity.entity_type == "tag" {
                self.graph_store.add_tag_node(&entity.name)?;
            } else {
                self.graph_store.add_entity_node(&entity.name, &entity.entity_type, &entity.source.to_string())?;
            }
        }

        for file in &files {
            self.graph_store.add_file_node(&file.path.to_string_lossy(), &file.title, &file.checksum)?;
        }

        for chunk in &all_chunks {
            let preview: String = chunk.text.chars().take(200).collect();
            self.graph_store
                .add_section_node(&chunk.chunk_id, chunk.heading(), chunk.level, &chunk.file_path.to_string_lossy(), &preview)?;
        }

        for relation in &all_relations {
            self.graph_store
                .add_edge(&relation.source_id, &relation.target_id, relation.relation_type.as_str(), relation.weight)?;
        }

        for chunk in &all_chunks {
            self.graph_store
                .add_edge(&chunk.file_path.to_string_lossy(), &chunk.chunk_id, "CONTAINS", 1.0)?;
        }

        // 10. Acronym dictionary.
        let acronym_dict = extract_acronyms_from_chunks(&all_chunks);
        if !acronym_dict.is_empty() {
            tracing::info!(count = acronym_dict.len(), "extracted acronyms");
        }

        // 11. Stats.
        let stats = IndexStats {
            total_files: files.len(),
            total_chunks: all_chunks.len(),
            total_entities: all_entities.len(),
            total_edges: all_relations.len(),
            last_indexed: Utc::now(),
        };
        self.metadata_store.save_stats(&stats)?;
        tracing::info!(?stats, "indexing complete");

        Ok((stats, acronym_dict))
    }

    pub fn clear(&self) -> Result<()> {
        self.metadata_store.delete_all()?;
        self.vector_store.delete_all()?;
        self.graph_store.delete_all()?;
        let acronyms_path = self.config.acronyms_path();
        if acronyms_path.exists() {
            std::fs::remove_file(acronyms_path)?;
        }
        tracing::info!("all stores cleared");
        Ok(())
    }

    pub fn metadata_store(&self) -> &Arc<dyn MetadataStore> {
        &self.metadata_store
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    pub fn graph_store(&self) -> &Arc<dyn GraphStore> {
        &self.graph_store
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingModel> {
        &self.embedder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::storage::memory::{InMemoryGraphStore, InMemoryMetadataStore, InMemoryVectorStore};

    fn pipeline(config: Config) -> IndexingPipeline {
        IndexingPipeline::new(
            config,
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(InMemoryGraphStore::new()),
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(HashingEmbedder::new(64)),
        )
    }

    #[test]
    fn indexing_an_empty_directory_yields_zero_counts() {
        let dir = std::env::temp_dir().join(format!("mdkb_empty_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let pipeline = pipeline(Config::default());
        let (stats, _) = pipeline.index(&dir).unwrap();
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.total_chunks, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn indexing_a_single_file_produces_a_searchable_chunk() {
        let dir = std::env::temp_dir().join(format!("mdkb_single_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.md"), "# Alpha\n\nHello world.").unwrap();

        let pipeline = pipeline(Config::default());
        let (stats, _) = pipeline.index(&dir).unwrap();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_chunks, 1);

        let chunks = pipeline.metadata_store().get_all_chunks().unwrap();
        assert_eq!(chunks.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
