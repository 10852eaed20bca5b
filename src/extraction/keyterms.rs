//! Three-phase statistical key-term extraction: acronyms, heading terms, and
//! TF-IDF, pruned by document-frequency percentile and linked by
//! `MENTIONS`/`CO_OCCURS` relations.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::text::{is_noise_token, tokenize_filtered};
use crate::types::{Chunk, Entity, ExtractionResult, ExtractionSource, Relation, RelationType};

static ACRONYM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([A-Z][A-Z0-9]{1,9})\b").unwrap());
static TITLE_CASE_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+(?:of|in|and|the|for|to|a|an|[A-Z][a-z]+)){1,4}\b").unwrap()
});
static SINGLE_CAP_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]{3,}\b").unwrap());

#[derive(Debug, Clone)]
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

pub struct KeyTermExtractor {
    config: KeyTermConfig,
}

impl Default for KeyTermExtractor {
    fn default() -> Self {
        Self::new(KeyTermConfig::default())
    }
}

impl KeyTermExtractor {
    pub fn new(config: KeyTermConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, chunks: &[Chunk]) -> ExtractionResult {
        let n = chunks.len();
        if n == 0 {
            return ExtractionResult::default();
        }

        let mut entities: HashMap<(String, String), Entity> = HashMap::new();

        self.extract_acronym_entities(chunks, &mut entities);
        self.extract_heading_term_entities(chunks, n, &mut entities);
        self.extract_tfidf_entities(chunks, n, &mut entities);

        let kept = prune_by_percentile(entities.into_values().collect(), self.config.top_percentile);

        let relations = build_relations(&kept);

        ExtractionResult {
            entities: kept,
            relations,
        }
    }

    fn extract_acronym_entities(&self, chunks: &[Chunk], entities: &mut HashMap<(String, String), Entity>) {
        let mut doc_freq: HashMap<String, BTreeSet<String>> = HashMap::new();
        for chunk in chunks {
            let mut seen_in_chunk = HashSet::new();
            for cap in ACRONYM_RE.captures_iter(&chunk.text) {
                let term = cap[1].to_string();
                if is_noise_token(&term.to_lowercase()) {
                    continue;
                }
                if seen_in_chunk.insert(term.clone()) {
                    doc_freq.entry(term).or_default().insert(chunk.chunk_id.clone());
                }
            }
        }
        for (term, chunk_ids) in doc_freq {
            if chunk_ids.len() >= self.config.min_df {
                upsert(entities, &term, "acronym", ExtractionSource::Keyterm, chunk_ids);
            }
        }
    }

    fn extract_heading_term_entities(&self, chunks: &[Chunk], n: usize, entities: &mut HashMap<(String, String), Entity>) {
        let mut doc_freq: HashMap<String, BTreeSet<String>> = HashMap::new();

        for chunk in chunks {
            let mut terms_in_chunk: HashSet<String> = HashSet::new();
            for heading in &chunk.heading_hierarchy {
                for m in TITLE_CASE_PHRASE_RE.find_iter(heading) {
                    terms_in_chunk.insert(m.as_str().to_string());
                }
                for m in SINGLE_CAP_WORD_RE.find_iter(heading) {
                    let word = m.as_str();
                    if !is_noise_token(&word.to_lowercase()) {
                        terms_in_chunk.insert(word.to_string());
                    }
                }
            }
            for term in terms_in_chunk {
                doc_freq.entry(term).or_default().insert(chunk.chunk_id.clone());
            }
        }

        let max_df = (self.config.max_df_ratio * n as f32) as usize;
        for (term, chunk_ids) in doc_freq {
            if chunk_ids.len() >= self.config.min_df && chunk_ids.len() <= max_df {
                upsert(entities, &term, "heading_term", ExtractionSource::Keyterm, chunk_ids);
            }
        }
    }

    fn extract_tfidf_entities(&self, chunks: &[Chunk], n: usize, entities: &mut HashMap<(String, String), Entity>) {
        let tokenized: Vec<Vec<String>> = chunks.iter().map(|c| tokenize_filtered(&c.text)).collect();

        let mut df: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let unique: HashSet<&str> = tokens.iter().map(|s| s.as_str()).collect();
            for t in unique {
                *df.entry(t).or_insert(0) += 1;
            }
        }

        for (chunk, tokens) in chunks.iter().zip(tokenized.iter()) {
            let mut tf: HashMap<&str, usize> = HashMap::new();
            for t in tokens {
                *tf.entry(t.as_str()).or_insert(0) += 1;
            }

            let mut scored: Vec<(&str, f32)> = tf
                .iter()
                .filter_map(|(term, &count)| {
                    let document_freq = *df.get(term).unwrap_or(&1) as f32;
                    if document_freq < self.config.min_df as f32 || document_freq > self.config.max_df_ratio * n as f32 {
                        return None;
                    }
                    let score = count as f32 * (n as f32 / document_freq).ln();
                    Some((*term, score))
                })
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(self.config.top_k_per_chunk);

            for (term, _) in scored {
                upsert(
                    entities,
                    term,
                    "key_term",
                    ExtractionSource::Keyterm,
                    BTreeSet::from([chunk.chunk_id.clone()]),
                );
            }
        }
    }
}

fn upsert(
    entities: &mut HashMap<(String, String), Entity>,
    name: &str,
    entity_type: &str,
    source: ExtractionSource,
    chunk_ids: BTreeSet<String>,
) {
    let key = (name.to_lowercase(), entity_type.to_string());
    entities
        .entry(key)
        .and_modify(|e| e.chunk_ids.extend(chunk_ids.iter().cloned()))
        .or_insert_with(|| Entity {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            source,
            chunk_ids,
        });
}

fn prune_by_percentile(mut entities: Vec<Entity>, top_percentile: f32) -> Vec<Entity> {
    entities.sort_by(|a, b| b.chunk_ids.len().cmp(&a.chunk_ids.len()));
    let keep = ((entities.len() as f32) * top_percentile).ceil().max(1.0) as usize;
    entities.truncate(keep.min(entities.len()));
    entities
}

fn build_relations(entities: &[Entity]) -> Vec<Relation> {
    let mut relations = Vec::new();
    let mut chunk_to_entities: HashMap<&str, Vec<&Entity>> = HashMap::new();

    for entity in entities {
        for chunk_id in &entity.chunk_ids {
            relations.push(Relation::new(chunk_id.clone(), entity.name.clone(), RelationType::Mentions).with_weight(1.0));
            chunk_to_entities.entry(chunk_id.as_str()).or_default().push(entity);
        }
    }

    let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
    for entities_in_chunk in chunk_to_entities.values() {
        for i in 0..entities_in_chunk.len() {
            for j in (i + 1)..entities_in_chunk.len() {
                let (a, b) = (entities_in_chunk[i].name.as_str(), entities_in_chunk[j].name.as_str());
                let key = if a <= b {
                    (a.to_string(), b.to_string())
                } else {
                    (b.to_string(), a.to_string())
                };
                if seen_pairs.insert(key.clone()) {
                    relations.push(Relation::new(key.0, key.1, RelationType::CoOccurs).with_weight(1.0));
                }
            }
        }
    }

    relations
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: id.into(),
            file_path: PathBuf::from("a.md"),
            heading_hierarchy: vec![],
            level: 0,
            text: text.to_string(),
            chunk_index: 0,
            char_offset: 0,
        }
    }

    #[test]
    fn acronym_kept_only_when_meeting_min_df() {
        let chunks = vec![
            chunk("c1", "The SIEM platform handles events."),
            chunk("c2", "SIEM is deployed across sites."),
        ];
        let result = KeyTermExtractor::default().extract(&chunks);
        assert!(result.entities.iter().any(|e| e.name == "SIEM" && e.entity_type == "acronym"));
    }

    #[test]
    fn rare_acronym_below_min_df_is_dropped() {
        let chunks = vec![chunk("c1", "The XQZ platform handles events.")];
        let result = KeyTermExtractor::default().extract(&chunks);
        assert!(!result.entities.iter().any(|e| e.name == "XQZ"));
    }

    #[test]
    fn cooccurring_entities_in_same_chunk_get_an_edge() {
        let chunks = vec![
            chunk("c1", "SIEM and EDR work together in this SOC deployment today."),
            chunk("c2", "SIEM handles log aggregation across the SOC."),
            chunk("c3", "EDR handles endpoint detection across the SOC."),
        ];
        let result = KeyTermExtractor::default().extract(&chunks);
        assert!(result.relations.iter().any(|r| r.relation_type == RelationType::CoOccurs));
    }
}
