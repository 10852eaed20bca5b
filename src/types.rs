//! Core data model shared by every component of the retrieval pipeline.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A markdown file discovered under the scan root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub title: String,
    pub last_modified: DateTime<Utc>,
    pub size_bytes: u64,
    /// Content hash of the file, used for change detection by callers.
    pub checksum: String,
}

/// A contiguous, heading-aware region of a markdown file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub file_path: PathBuf,
    pub heading_hierarchy: Vec<String>,
    /// Heading level of this chunk's own heading, 1-6, or 0 for pre-heading text.
    pub level: u8,
    pub text: String,
    pub chunk_index: usize,
    pub char_offset: usize,
}

impl Chunk {
    /// Last element of the heading hierarchy, if any.
    pub fn heading(&self) -> Option<&str> {
        self.heading_hierarchy.last().map(|s| s.as_str())
    }

    pub fn heading_path(&self) -> String {
        self.heading_hierarchy.join(" > ")
    }
}

/// Where an entity or relation was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Structural,
    Keyterm,
    Ner,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionSource::Structural => "structural",
            ExtractionSource::Keyterm => "keyterm",
            ExtractionSource::Ner => "ner",
        };
        write!(f, "{s}")
    }
}

/// A canonical named thing discovered by an extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    /// Free-form label: `link`, `tag`, `acronym`, `heading_term`, `key_term`,
    /// or a frontmatter key.
    pub entity_type: String,
    pub source: ExtractionSource,
    pub chunk_ids: BTreeSet<String>,
}

impl Entity {
    pub fn dedup_key(&self) -> (String, String) {
        (self.name.to_lowercase(), self.entity_type.clone())
    }
}

/// The fixed set of relation labels the core ever produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationType {
    LinksTo,
    HasTag,
    HasFrontmatter,
    ParentOf,
    Contains,
    Mentions,
    CoOccurs,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::LinksTo => "LINKS_TO",
            RelationType::HasTag => "HAS_TAG",
            RelationType::HasFrontmatter => "HAS_FRONTMATTER",
            RelationType::ParentOf => "PARENT_OF",
            RelationType::Contains => "CONTAINS",
            RelationType::Mentions => "MENTIONS",
            RelationType::CoOccurs => "CO_OCCURS",
        }
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LINKS_TO" => Ok(RelationType::LinksTo),
            "HAS_TAG" => Ok(RelationType::HasTag),
            "HAS_FRONTMATTER" => Ok(RelationType::HasFrontmatter),
            "PARENT_OF" => Ok(RelationType::ParentOf),
            "CONTAINS" => Ok(RelationType::Contains),
            "MENTIONS" => Ok(RelationType::Mentions),
            "CO_OCCURS" => Ok(RelationType::CoOccurs),
            other => Err(format!("unknown relation type: {other}")),
        }
    }
}

/// A directed, labeled edge between two nodes addressed by ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    pub weight: f32,
    pub properties: Vec<(String, String)>,
}

impl Relation {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, relation_type: RelationType) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type,
            weight: 1.0,
            properties: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }
}

/// Output of one extractor pass over one chunk corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

impl ExtractionResult {
    pub fn merge(mut self, other: ExtractionResult) -> Self {
        self.entities.extend(other.entities);
        self.relations.extend(other.relations);
        self
    }
}

/// A query after expansion, carrying the terms that were added.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpandedQuery {
    pub original: String,
    pub expanded_terms: Vec<String>,
    pub expanded_text: String,
}

/// One hydrated, ranked search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub file_path: PathBuf,
    pub heading_path: String,
    pub snippet: String,
    pub fused_score: f32,
    pub semantic_score: Option<f32>,
    pub bm25_score: Option<f32>,
    pub graph_score: Option<f32>,
    pub matched_engines: Vec<String>,
}

/// Summary statistics for the most recently completed index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_files: usize,
    pub total_chunks: usize,
    pub total_entities: usize,
    pub total_edges: usize,
    pub last_indexed: DateTime<Utc>,
}

/// Which search engines a query mode runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Semantic,
    Bm25,
    Graph,
    Hybrid,
}

/// Title or filename stem, used when a file has no top-level heading.
pub fn title_from_path_or_heading(path: &Path, first_heading: Option<&str>) -> String {
    first_heading.map(|h| h.to_string()).unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_type_round_trips_through_string_form() {
        for rt in [
            RelationType::LinksTo,
            RelationType::HasTag,
            RelationType::HasFrontmatter,
            RelationType::ParentOf,
            RelationType::Contains,
            RelationType::Mentions,
            RelationType::CoOccurs,
        ] {
            let s = rt.as_str();
            assert_eq!(RelationType::from_str(s).unwrap(), rt);
        }
    }

    #[test]
    fn entity_dedup_key_is_case_insensitive_on_name() {
        let a = Entity {
            name: "SIEM".into(),
            entity_type: "acronym".into(),
            source: ExtractionSource::Keyterm,
            chunk_ids: BTreeSet::new(),
        };
        let b = Entity {
            name: "siem".into(),
            entity_type: "acronym".into(),
            source: ExtractionSource::Keyterm,
            chunk_ids: BTreeSet::new(),
        };
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
