//! Dense vector search engine: encode the query, delegate to the vector store.

use std::sync::Arc;

use crate::embeddings::EmbeddingModel;
use crate::storage::VectorStore;

pub struct SemanticEngine {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl SemanticEngine {
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self { vector_store, embedder }
    }

    pub fn encode_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.embedder.embed_documents(texts)
    }

    pub fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<(String, f32)>> {
        let vector = self.embedder.embed_query(query)?;
        self.vector_store.search(&vector, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::storage::memory::InMemoryVectorStore;
    use crate::types::Chunk;
    use std::path::PathBuf;

    #[test]
    fn search_returns_closest_encoded_document() {
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(HashingEmbedder::new(64));

        let chunk = Chunk {
            chunk_id: "c1".into(),
            file_path: PathBuf::from("a.md"),
            heading_hierarchy: vec![],
            level: 0,
            text: "rust programming language".into(),
            chunk_index: 0,
            char_offset: 0,
        };
        let embedding = embedder.embed_document(&chunk.text).unwrap();
        vector_store.add_chunks(&[chunk], &[embedding]).unwrap();

        let engine = SemanticEngine::new(vector_store, embedder);
        let results = engine.search("rust programming language", 5).unwrap();
        assert_eq!(results[0].0, "c1");
    }
}
