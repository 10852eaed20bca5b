//! Hybrid retrieval core for a local markdown knowledge base.
//!
//! Given a directory of markdown files, builds a dense vector index, a
//! sparse BM25 index, and a knowledge graph of structural and entity
//! relations, and serves ranked search results by fusing evidence from all
//! three. See [`service::Service`] for the top-level API.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extraction;
pub mod indexing;
pub mod reader;
pub mod reranking;
pub mod search;
pub mod service;
pub mod storage;
pub mod text;
pub mod types;

pub use config::Config;
pub use error::{KbError, Result};
pub use service::Service;
pub use types::{Chunk, Entity, FileInfo, IndexStats, Relation, RelationType, SearchMode, SearchResult};
