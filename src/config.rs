use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KbError, Result};

/// How deep extraction goes during indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractDepth {
    /// Structural + key-term extraction only (always run regardless of this setting).
    Structural,
    /// Structural + key-term, plus an optional NER pass. The NER pass itself
    /// is an external collaborator the core does not implement; selecting
    /// this depth is accepted but currently a no-op beyond structural+keyterm.
    Ner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_chunk_tokens: usize,
    pub chunk_overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 512,
            chunk_overlap_tokens: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_top_k: usize,
    pub fusion_k: usize,
    pub rerank_pool_size: usize,
    pub graph_max_hops: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            fusion_k: 60,
            rerank_pool_size: 20,
            graph_max_hops: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyTermConfig {
    pub min_df: usize,
    pub max_df_ratio: f32,
    pub top_k_per_chunk: usize,
    pub top_percentile: f32,
}

impl Default for KeyTermConfig {
    fn default() -> Self {
        Self {
            min_df: 2,
            max_df_ratio: 0.6,
            top_k_per_chunk: 8,
            top_percentile: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub enable_reranking: bool,
    pub enable_query_expansion: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_reranking: true,
            enable_query_expansion: true,
        }
    }
}

/// Top-level configuration for the retrieval core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    pub index_dir: PathBuf,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub reranker_model: String,
    pub extract_depth: ExtractDepth,
    pub ner_entity_types: Vec<String>,
    pub read_only: bool,
    pub chunking: ChunkingConfig,
    pub search: SearchConfig,
    pub keyterms: KeyTermConfig,
    pub features: FeatureFlags,
}

impl Config {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            return Err(KbError::InvalidConfig("embedding_dim must be > 0".into()));
        }
        if self.chunking.max_chunk_tokens < 16 {
            return Err(KbError::InvalidConfig("chunking.max_chunk_tokens must be >= 16".into()));
        }
        if self.chunking.chunk_overlap_tokens >= self.chunking.max_chunk_tokens {
            return Err(KbError::InvalidConfig(
                "chunking.chunk_overlap_tokens must be < max_chunk_tokens".into(),
            ));
        }
        if self.search.default_top_k == 0 {
            return Err(KbError::InvalidConfig("search.default_top_k must be > 0".into()));
        }
        if self.search.rerank_pool_size == 0 {
            return Err(KbError::InvalidConfig("search.rerank_pool_size must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.keyterms.max_df_ratio) {
            return Err(KbError::InvalidConfig("keyterms.max_df_ratio must be in [0.0, 1.0]".into()));
        }
        if !(0.0..=1.0).contains(&self.keyterms.top_percentile) {
            return Err(KbError::InvalidConfig("keyterms.top_percentile must be in [0.0, 1.0]".into()));
        }
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| KbError::InvalidConfig(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn bm25_path(&self) -> PathBuf {
        self.index_dir.join("bm25.json")
    }

    pub fn acronyms_path(&self) -> PathBuf {
        self.index_dir.join("acronyms.json")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.index_dir.join("metadata.json")
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("mdkb");

        Self {
            index_dir: data_dir.join("index"),
            data_dir,
            embedding_model: "hashing-embedder-v1".to_string(),
            embedding_dim: 384,
            reranker_model: "lexical-overlap-v1".to_string(),
            extract_depth: ExtractDepth::Structural,
            ner_entity_types: Vec::new(),
            read_only: false,
            chunking: ChunkingConfig::default(),
            search: SearchConfig::default(),
            keyterms: KeyTermConfig::default(),
            features: FeatureFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let mut cfg = Config::default();
        cfg.chunking.chunk_overlap_tokens = cfg.chunking.max_chunk_tokens;
        assert!(cfg.validate().is_err());
    }
}
