//! In-memory reference implementations of the storage protocols.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use parking_lot::RwLock;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::storage::{GraphStore, MetadataStore, Neighbor, NodeKind, VectorStore};
use crate::types::{Chunk, IndexStats};

/// Brute-force cosine-similarity vector store.
#[derive(Default)]
pub struct InMemoryVectorStore {
    rows: RwLock<HashMap<String, Vec<f32>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

impl VectorStore for InMemoryVectorStore {
    fn add_chunks(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> anyhow::Result<()> {
        anyhow::ensure!(chunks.len() == embeddings.len(), "chunks/embeddings length mismatch");
        let mut rows = self.rows.write();
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            rows.insert(chunk.chunk_id.clone(), embedding.clone());
        }
        Ok(())
    }

    fn search(&self, vector: &[f32], top_k: usize) -> anyhow::Result<Vec<(String, f32)>> {
        let rows = self.rows.read();
        let mut scored: Vec<(String, f32)> =
            rows.iter().map(|(id, v)| (id.clone(), cosine_similarity(vector, v))).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    fn delete_all(&self) -> anyhow::Result<()> {
        self.rows.write().clear();
        Ok(())
    }

    fn count(&self) -> anyhow::Result<usize> {
        Ok(self.rows.read().len())
    }
}

struct GraphNode {
    kind: NodeKind,
}

/// petgraph-backed knowledge graph keyed by a stable string ID.
pub struct InMemoryGraphStore {
    inner: RwLock<GraphInner>,
}

#[derive(Default)]
struct GraphInner {
    graph: DiGraph<GraphNode, (String, f32)>,
    index: HashMap<String, NodeIndex>,
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GraphInner::default()),
        }
    }

    fn upsert_node(&self, id: &str, kind: NodeKind) -> NodeIndex {
        let mut inner = self.inner.write();
        if let Some(&idx) = inner.index.get(id) {
            return idx;
        }
        let idx = inner.graph.add_node(GraphNode { kind });
        inner.index.insert(id.to_string(), idx);
        idx
    }
}

impl GraphStore for InMemoryGraphStore {
    fn add_file_node(&self, file_path: &str, _title: &str, _checksum: &str) -> anyhow::Result<()> {
        self.upsert_node(file_path, NodeKind::File);
        Ok(())
    }

    fn add_section_node(&self, chunk_id: &str, _heading: Option<&str>, _level: u8, _file_path: &str, _text_preview: &str) -> anyhow::Result<()> {
        self.upsert_node(chunk_id, NodeKind::Section);
        Ok(())
    }

    fn add_entity_node(&self, name: &str, _entity_type: &str, _source: &str) -> anyhow::Result<()> {
        self.upsert_node(name, NodeKind::Entity);
        Ok(())
    }

    fn add_tag_node(&self, name: &str) -> anyhow::Result<()> {
        self.upsert_node(name, NodeKind::Tag);
        Ok(())
    }

    fn add_edge(&self, source_id: &str, target_id: &str, relation_type: &str, weight: f32) -> anyhow::Result<()> {
        let src = self.upsert_node(source_id, NodeKind::Entity);
        let tgt = self.upsert_node(target_id, NodeKind::Entity);
        let mut inner = self.inner.write();

        if let Some(edge) = inner.graph.find_edge(src, tgt) {
            if let Some(w) = inner.graph.edge_weight_mut(edge) {
                if w.0 == relation_type {
                    w.1 = weight;
                    return Ok(());
                }
            }
        }
        inner.graph.add_edge(src, tgt, (relation_type.to_string(), weight));
        Ok(())
    }

    fn get_neighbors(&self, id: &str, max_hops: usize) -> anyhow::Result<Vec<Neighbor>> {
        let inner = self.inner.read();
        let Some(&start) = inner.index.get(id) else {
            return Ok(Vec::new());
        };

        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut frontier = VecDeque::new();
        frontier.push_back((start, 0usize));
        let mut out = Vec::new();

        let id_of = |idx: NodeIndex, inner: &GraphInner| -> Option<String> {
            inner.index.iter().find(|(_, &v)| v == idx).map(|(k, _)| k.clone())
        };

        while let Some((node, depth)) = frontier.pop_front() {
            if depth >= max_hops {
                continue;
            }
            // Edges are stored directionally (as produced during indexing), but
            // traversal treats them as undirected so a Section --MENTIONS--> Entity
            // edge is also reachable from the entity side, matching the
            // ground-truth graph's undirected Cypher traversal.
            let outgoing = inner.graph.edges_directed(node, Direction::Outgoing).map(|e| (e.target(), e.weight().clone()));
            let incoming = inner.graph.edges_directed(node, Direction::Incoming).map(|e| (e.source(), e.weight().clone()));
            for (neighbor, (label, weight)) in outgoing.chain(incoming) {
                if let Some(neighbor_id) = id_of(neighbor, &inner) {
                    out.push((neighbor_id, label, weight));
                }
                if visited.insert(neighbor) {
                    frontier.push_back((neighbor, depth + 1));
                }
            }
        }

        Ok(out)
    }

    fn delete_all(&self) -> anyhow::Result<()> {
        let mut inner = self.inner.write();
        inner.graph.clear();
        inner.index.clear();
        Ok(())
    }

    fn node_count(&self) -> anyhow::Result<usize> {
        Ok(self.inner.read().graph.node_count())
    }

    fn edge_count(&self) -> anyhow::Result<usize> {
        Ok(self.inner.read().graph.edge_count())
    }
}

/// In-memory chunk/stats store with JSON-file persistence helpers.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    chunks: RwLock<HashMap<String, Chunk>>,
    stats: RwLock<Option<IndexStats>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let chunks = self.get_all_chunks()?;
        let content = serde_json::to_string_pretty(&chunks)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let chunks: Vec<Chunk> = serde_json::from_str(&content)?;
        let store = Self::new();
        store.save_chunks(&chunks)?;
        Ok(store)
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn save_chunks(&self, chunks: &[Chunk]) -> anyhow::Result<()> {
        let mut store = self.chunks.write();
        for chunk in chunks {
            store.insert(chunk.chunk_id.clone(), chunk.clone());
        }
        Ok(())
    }

    fn get_chunk(&self, chunk_id: &str) -> anyhow::Result<Option<Chunk>> {
        Ok(self.chunks.read().get(chunk_id).cloned())
    }

    fn get_chunks(&self, ids: &[String]) -> anyhow::Result<Vec<Chunk>> {
        let store = self.chunks.read();
        Ok(ids.iter().filter_map(|id| store.get(id).cloned()).collect())
    }

    fn get_all_chunks(&self) -> anyhow::Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self.chunks.read().values().cloned().collect();
        chunks.sort_by(|a, b| (&a.file_path, a.chunk_index).cmp(&(&b.file_path, b.chunk_index)));
        Ok(chunks)
    }

    fn save_stats(&self, stats: &IndexStats) -> anyhow::Result<()> {
        *self.stats.write() = Some(stats.clone());
        Ok(())
    }

    fn get_stats(&self) -> anyhow::Result<Option<IndexStats>> {
        Ok(self.stats.read().clone())
    }

    fn delete_all(&self) -> anyhow::Result<()> {
        self.chunks.write().clear();
        *self.stats.write() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn vector_store_returns_most_similar_first() {
        let store = InMemoryVectorStore::new();
        let chunk_a = test_chunk("a");
        let chunk_b = test_chunk("b");
        store.add_chunks(&[chunk_a, chunk_b], &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let results = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn graph_neighbors_respects_max_hops() {
        // Both edges are added in the same direction indexing.rs actually
        // produces (chunk -> entity); traversal still reaches s2 from s1 in
        // two undirected hops because get_neighbors treats edges as
        // bidirectional.
        let store = InMemoryGraphStore::new();
        store.add_section_node("s1", None, 1, "f.md", "").unwrap();
        store.add_entity_node("E1", "key_term", "keyterm").unwrap();
        store.add_section_node("s2", None, 1, "f.md", "").unwrap();
        store.add_edge("s1", "E1", "MENTIONS", 1.0).unwrap();
        store.add_edge("s2", "E1", "MENTIONS", 1.0).unwrap();

        let one_hop = store.get_neighbors("s1", 1).unwrap();
        assert!(one_hop.iter().any(|(id, _, _)| id == "E1"));
        assert!(!one_hop.iter().any(|(id, _, _)| id == "s2"));

        let two_hop = store.get_neighbors("s1", 2).unwrap();
        assert!(two_hop.iter().any(|(id, _, _)| id == "s2"));
    }

    #[test]
    fn metadata_store_round_trips_chunks() {
        let store = InMemoryMetadataStore::new();
        let chunk = test_chunk("c1");
        store.save_chunks(&[chunk.clone()]).unwrap();
        assert_eq!(store.get_chunk("c1").unwrap().unwrap().chunk_id, "c1");
        assert_eq!(store.get_all_chunks().unwrap().len(), 1);
    }

    fn test_chunk(id: &str) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            file_path: PathBuf::from("a.md"),
            heading_hierarchy: vec![],
            level: 0,
            text: "text".to_string(),
            chunk_index: 0,
            char_offset: 0,
        }
    }
}
