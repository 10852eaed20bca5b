//! Storage protocol contracts.
//!
//! The core depends only on these trait object capability sets, never on a
//! concrete backend. Production callers wire in their own implementation
//! (an embedded vector DB, an embedded graph DB, a relational metadata
//! store); [`memory`] ships a reference implementation of each so the crate
//! is runnable standalone.

pub mod memory;

use crate::types::{Chunk, IndexStats};

/// A node kind in the typed knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Section,
    Entity,
    Tag,
}

/// A neighbor returned by graph traversal: `(node_id, relation_label, weight)`.
pub type Neighbor = (String, String, f32);

/// Vector similarity search over chunk embeddings.
pub trait VectorStore: Send + Sync {
    /// Overwrite semantics: replaces any existing rows for the given chunk IDs.
    fn add_chunks(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> anyhow::Result<()>;
    fn search(&self, vector: &[f32], top_k: usize) -> anyhow::Result<Vec<(String, f32)>>;
    fn delete_all(&self) -> anyhow::Result<()>;
    fn count(&self) -> anyhow::Result<usize>;
}

/// Typed knowledge-graph node/edge storage.
pub trait GraphStore: Send + Sync {
    fn add_file_node(&self, file_path: &str, title: &str, checksum: &str) -> anyhow::Result<()>;
    fn add_section_node(&self, chunk_id: &str, heading: Option<&str>, level: u8, file_path: &str, text_preview: &str) -> anyhow::Result<()>;
    fn add_entity_node(&self, name: &str, entity_type: &str, source: &str) -> anyhow::Result<()>;
    fn add_tag_node(&self, name: &str) -> anyhow::Result<()>;
    /// Upsert an edge, merging on `(source_id, target_id, relation_type)`.
    fn add_edge(&self, source_id: &str, target_id: &str, relation_type: &str, weight: f32) -> anyhow::Result<()>;
    /// All nodes reachable from `id` within `max_hops`.
    fn get_neighbors(&self, id: &str, max_hops: usize) -> anyhow::Result<Vec<Neighbor>>;
    fn delete_all(&self) -> anyhow::Result<()>;
    fn node_count(&self) -> anyhow::Result<usize>;
    fn edge_count(&self) -> anyhow::Result<usize>;
}

/// Chunk and index-stats persistence.
pub trait MetadataStore: Send + Sync {
    fn save_chunks(&self, chunks: &[Chunk]) -> anyhow::Result<()>;
    fn get_chunk(&self, chunk_id: &str) -> anyhow::Result<Option<Chunk>>;
    /// Best-effort order preservation matching the order of `ids`.
    fn get_chunks(&self, ids: &[String]) -> anyhow::Result<Vec<Chunk>>;
    fn get_all_chunks(&self) -> anyhow::Result<Vec<Chunk>>;
    fn save_stats(&self, stats: &IndexStats) -> anyhow::Result<()>;
    fn get_stats(&self) -> anyhow::Result<Option<IndexStats>>;
    fn delete_all(&self) -> anyhow::Result<()>;
}
