//! Extraction of entities and relations from markdown syntax: wikilinks,
//! hashtags, frontmatter, markdown links, and heading-hierarchy parentage.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Chunk, Entity, ExtractionResult, ExtractionSource, Relation, RelationType};

static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\]|]+?)(?:\|[^\]]*)?\]\]").unwrap());
static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\s)#([A-Za-z][\w-]*)").unwrap());
static MD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)\s]+\.md)[^)]*\)").unwrap());
static FRONTMATTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\A---\s*\n(.*?)\n---\s*\n").unwrap());

pub struct StructuralExtractor;

impl Default for StructuralExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuralExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, chunks: &[Chunk]) -> ExtractionResult {
        let mut entities: HashMap<(String, String), Entity> = HashMap::new();
        let mut relations = Vec::new();

        for chunk in chunks {
            self.extract_wikilinks(chunk, &mut entities, &mut relations);
            self.extract_hashtags(chunk, &mut entities, &mut relations);
            self.extract_frontmatter(chunk, &mut entities, &mut relations);
            self.extract_md_links(chunk, &mut entities, &mut relations);
        }

        relations.extend(parent_of_relations(chunks));

        ExtractionResult {
            entities: entities.into_values().collect(),
            relations,
        }
    }

    fn extract_wikilinks(
        &self,
        chunk: &Chunk,
        entities: &mut HashMap<(String, String), Entity>,
        relations: &mut Vec<Relation>,
    ) {
        for cap in WIKILINK_RE.captures_iter(&chunk.text) {
            let target = cap.get(1).unwrap().as_str().trim().to_string();
            if target.is_empty() {
                continue;
            }
            upsert_entity(entities, &target, "link", ExtractionSource::Structural, &chunk.chunk_id);
            relations.push(Relation::new(chunk.chunk_id.clone(), target, RelationType::LinksTo));
        }
    }

    fn extract_hashtags(
        &self,
        chunk: &Chunk,
        entities: &mut HashMap<(String, String), Entity>,
        relations: &mut Vec<Relation>,
    ) {
        for line in chunk.text.lines() {
            if line.trim_start().starts_with('#') && heading_prefix_len(line) > 0 {
                // Skip ATX heading lines; hashtags only count in body text.
                continue;
            }
            for cap in HASHTAG_RE.captures_iter(line) {
                let tag = cap.get(1).unwrap().as_str().to_string();
                upsert_entity(entities, &tag, "tag", ExtractionSource::Structural, &chunk.chunk_id);
                relations.push(Relation::new(chunk.chunk_id.clone(), tag, RelationType::HasTag));
            }
        }
    }

    fn extract_frontmatter(
        &self,
        chunk: &Chunk,
        entities: &mut HashMap<(String, String), Entity>,
        relations: &mut Vec<Relation>,
    ) {
        let Some(cap) = FRONTMATTER_RE.captures(&chunk.text) else {
            return;
        };
        let body = cap.get(1).unwrap().as_str();
        let Ok(value) = serde_yaml_like::parse(body) else {
            return;
        };
        for (key, values) in value {
            for v in values {
                if v.is_empty() {
                    continue;
                }
                upsert_entity(entities, &v, &key, ExtractionSource::Structural, &chunk.chunk_id);
                relations.push(
                    Relation::new(chunk.chunk_id.clone(), v, RelationType::HasFrontmatter)
                        .with_property("key", key.clone()),
                );
            }
        }
    }

    fn extract_md_links(
        &self,
        chunk: &Chunk,
        entities: &mut HashMap<(String, String), Entity>,
        relations: &mut Vec<Relation>,
    ) {
        for cap in MD_LINK_RE.captures_iter(&chunk.text) {
            let link_text = cap.get(1).unwrap().as_str().to_string();
            let href = cap.get(2).unwrap().as_str().to_string();
            upsert_entity(entities, &href, "link", ExtractionSource::Structural, &chunk.chunk_id);
            relations.push(
                Relation::new(chunk.chunk_id.clone(), href, RelationType::LinksTo)
                    .with_property("link_text", link_text),
            );
        }
    }
}

fn heading_prefix_len(line: &str) -> usize {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes >= 1 && hashes <= 3 && trimmed.as_bytes().get(hashes) == Some(&b' ') {
        hashes
    } else {
        0
    }
}

fn upsert_entity(
    entities: &mut HashMap<(String, String), Entity>,
    name: &str,
    entity_type: &str,
    source: ExtractionSource,
    chunk_id: &str,
) {
    let key = (name.to_lowercase(), entity_type.to_string());
    entities
        .entry(key)
        .and_modify(|e| {
            e.chunk_ids.insert(chunk_id.to_string());
        })
        .or_insert_with(|| Entity {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            source,
            chunk_ids: BTreeSet::from([chunk_id.to_string()]),
        });
}

/// For every chunk with hierarchy depth > 1, find the chunk whose hierarchy
/// equals this one minus the last heading and emit a `PARENT_OF` edge.
fn parent_of_relations(chunks: &[Chunk]) -> Vec<Relation> {
    let mut by_hierarchy: HashMap<Vec<String>, String> = HashMap::new();
    for chunk in chunks {
        by_hierarchy
            .entry(chunk.heading_hierarchy.clone())
            .or_insert_with(|| chunk.chunk_id.clone());
    }

    let mut relations = Vec::new();
    for chunk in chunks {
        if chunk.heading_hierarchy.len() <= 1 {
            continue;
        }
        let parent_hierarchy = &chunk.heading_hierarchy[..chunk.heading_hierarchy.len() - 1];
        if let Some(parent_id) = by_hierarchy.get(parent_hierarchy) {
            if parent_id != &chunk.chunk_id {
                relations.push(Relation::new(parent_id.clone(), chunk.chunk_id.clone(), RelationType::ParentOf));
            }
        }
    }
    relations
}

/// A tiny `key: value` / `key: [a, b]` frontmatter line parser — enough for
/// the flat key/value and simple list shapes this extractor cares about,
/// without pulling in a full YAML dependency for a few lines of frontmatter.
mod serde_yaml_like {
    pub fn parse(body: &str) -> Result<Vec<(String, Vec<String>)>, ()> {
        let mut out = Vec::new();
        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_string();
            let rest = rest.trim();
            if rest.is_empty() {
                continue;
            }
            let values = if rest.starts_with('[') && rest.ends_with(']') {
                rest[1..rest.len() - 1]
                    .split(',')
                    .map(|v| unquote(v.trim()))
                    .filter(|v| !v.is_empty())
                    .collect()
            } else {
                vec![unquote(rest)]
            };
            out.push((key, values));
        }
        Ok(out)
    }

    fn unquote(s: &str) -> String {
        let s = s.trim();
        if (s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')) {
            s[1..s.len() - 1].to_string()
        } else {
            s.to_string()
        }
    }
}
