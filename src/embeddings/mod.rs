//! Dense embedding model trait and a deterministic default implementation.
//!
//! The real embedding model is an external collaborator specified only at
//! this interface; production callers supply their own implementation (a
//! wrapped ONNX/E5 model, etc). [`HashingEmbedder`] is a dependency-free
//! default so indexing and semantic search work without a downloaded model.

use std::sync::OnceLock;

use anyhow::Result;
use lru::LruCache;
use parking_lot::Mutex;

use crate::text::tokenize;

/// Unified embedding model trait.
pub trait EmbeddingModel: Send + Sync {
    /// Embed a search query.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a document/passage.
    fn embed_document(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch embed documents, used during indexing.
    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_document(t)).collect()
    }

    /// Embedding vector dimension.
    fn dimension(&self) -> usize;
}

/// Deterministic feature-hashed bag-of-words embedding, L2-normalized.
///
/// Query and document embeddings are produced by the same hashing function;
/// there is no learned asymmetry between the two, unlike a real bi-encoder.
pub struct HashingEmbedder {
    dimension: usize,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            cache: Mutex::new(LruCache::new(std::num::NonZeroUsize::new(1000).unwrap())),
        }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.cache.lock().get(text) {
            return v.clone();
        }

        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let idx = (hash as usize) % self.dimension;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }

        self.cache.lock().put(text.to_string(), vector.clone());
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingModel for HashingEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.encode(text))
    }

    fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.encode(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Process-wide lazily initialized default embedder, for callers that don't
/// supply their own `EmbeddingModel`.
pub fn default_embedder(dimension: usize) -> &'static HashingEmbedder {
    static CELL: OnceLock<HashingEmbedder> = OnceLock::new();
    CELL.get_or_init(|| HashingEmbedder::new(dimension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic_and_unit_length() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_document("hello world").unwrap();
        let b = embedder.embed_document("hello world").unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[test]
    fn different_texts_produce_different_embeddings() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_document("alpha beta gamma").unwrap();
        let b = embedder.embed_document("completely different content here").unwrap();
        assert_ne!(a, b);
    }
}
