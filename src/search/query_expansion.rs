//! Query expansion: acronym substitution followed by heading-structural
//! expansion. The combined behavior is the canonical contract (the source
//! corpus shipped overlapping acronym-only/structural-only/combined
//! variants; this implements the superset).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::extraction::AcronymDictionary;
use crate::storage::MetadataStore;
use crate::text::{levenshtein, tokenize_for_expansion};
use crate::types::ExpandedQuery;

const FUZZY_THRESHOLD: usize = 1;

pub struct QueryExpander {
    metadata_store: Arc<dyn MetadataStore>,
}

impl QueryExpander {
    pub fn new(metadata_store: Arc<dyn MetadataStore>) -> Self {
        Self { metadata_store }
    }

    pub fn expand(&self, query: &str, acronyms: &AcronymDictionary) -> anyhow::Result<ExpandedQuery> {
        let acronym_terms = self.expand_acronyms(query, acronyms);

        let acronym_expanded_text = if acronym_terms.is_empty() {
            query.to_string()
        } else {
            format!("{query} {}", acronym_terms.join(" "))
        };

        let structural_terms = self.expand_structural(&acronym_expanded_text)?;

        let mut expanded_terms = acronym_terms;
        expanded_terms.extend(structural_terms);

        let expanded_text = if expanded_terms.is_empty() {
            query.to_string()
        } else {
            format!("{query} {}", expanded_terms.join(" "))
        };

        Ok(ExpandedQuery {
            original: query.to_string(),
            expanded_terms,
            expanded_text,
        })
    }

    fn expand_acronyms(&self, query: &str, acronyms: &AcronymDictionary) -> Vec<String> {
        let mut terms = Vec::new();
        for token in query.split_whitespace() {
            let upper: String = token.chars().filter(|c| c.is_alphabetic()).map(|c| c.to_ascii_uppercase()).collect();
            if upper.len() < 2 {
                continue;
            }

            if let Some(expansions) = acronyms.expansions(&upper) {
                terms.extend(expansions.iter().cloned());
                continue;
            }

            for (candidate, expansions) in &acronyms.entries {
                if levenshtein(&upper, candidate) <= FUZZY_THRESHOLD {
                    terms.extend(expansions.iter().cloned());
                    break;
                }
            }
        }
        terms
    }

    fn expand_structural(&self, query: &str) -> anyhow::Result<Vec<String>> {
        let query_tokens: HashSet<String> = tokenize_for_expansion(query).into_iter().collect();
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = self.metadata_store.get_all_chunks()?;

        let mut heading_to_hierarchies: HashMap<String, Vec<Vec<String>>> = HashMap::new();
        for chunk in &chunks {
            for heading in &chunk.heading_hierarchy {
                heading_to_hierarchies
                    .entry(heading.to_lowercase())
                    .or_default()
                    .push(chunk.heading_hierarchy.clone());
            }
        }

        let mut expansion: HashSet<String> = HashSet::new();
        for (heading, hierarchies) in &heading_to_hierarchies {
            let heading_tokens: HashSet<String> = tokenize_for_expansion(heading).into_iter().collect();
            if heading_tokens.is_disjoint(&query_tokens) {
                continue;
            }
            for hierarchy in hierarchies {
                for other in hierarchy {
                    expansion.insert(other.clone());
                }
            }
        }

        let mut terms: Vec<String> = expansion.into_iter().collect();
        terms.sort();
        Ok(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryMetadataStore;
    use crate::types::Chunk;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn chunk(id: &str, hierarchy: Vec<&str>) -> Chunk {
        Chunk {
            chunk_id: id.into(),
            file_path: PathBuf::from("a.md"),
            heading_hierarchy: hierarchy.into_iter().map(String::from).collect(),
            level: hierarchy_level(id),
            text: "text".into(),
            chunk_index: 0,
            char_offset: 0,
        }
    }

    fn hierarchy_level(_id: &str) -> u8 {
        1
    }

    #[test]
    fn acronym_expansion_adds_expansions_for_known_acronym() {
        let store = Arc::new(InMemoryMetadataStore::new());
        let mut acronyms = AcronymDictionary::default();
        acronyms
            .entries
            .insert("SIEM".to_string(), BTreeSet::from(["Security Information and Event Management".to_string()]));

        let expander = QueryExpander::new(store);
        let expanded = expander.expand("SIEM", &acronyms).unwrap();
        assert!(expanded.expanded_text.contains("SIEM"));
        assert!(expanded.expanded_text.contains("Security Information and Event Management"));
    }

    #[test]
    fn structural_expansion_adds_sibling_headings() {
        let store = Arc::new(InMemoryMetadataStore::new());
        store
            .save_chunks(&[chunk("c1", vec!["Security", "Detection"]), chunk("c2", vec!["Security", "Response"])])
            .unwrap();

        let expander = QueryExpander::new(store);
        let expanded = expander.expand("security", &AcronymDictionary::default()).unwrap();
        assert!(expanded.expanded_terms.iter().any(|t| t == "Detection" || t == "Response"));
    }
}
