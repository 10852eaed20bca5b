//! Acronym dictionary extraction: five surface patterns, merged into a
//! `acronym -> sorted expansions` map after subsequence validation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Chunk;

/// Full form immediately followed by the acronym in parens: "Full Form (ACR)".
static PAREN_AFTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:[A-Z][A-Za-z0-9]*\s+){1,7}[A-Z][A-Za-z0-9]*)\s*\(([A-Z][A-Z0-9]{1,9})\)").unwrap());

/// Acronym immediately followed by the full form in parens: "ACR (Full Form)".
static PAREN_BEFORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][A-Z0-9]{1,9})\s*\(((?:[A-Za-z0-9]+\s+){1,7}[A-Za-z0-9]+)\)").unwrap());

/// "Full Form stands for/is short for/means ACR" (or the reverse).
static STANDS_FOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Za-z][A-Za-z0-9 ]{2,80}?)\s+(?:stands\s+for|is\s+short\s+for|means)\s+([A-Za-z][A-Za-z0-9 ]{2,80}?)[.\n]").unwrap()
});

/// "Full Form, or/abbreviated as ACR".
static OR_ACRONYM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:[A-Z][A-Za-z0-9]*\s+){1,7}[A-Z][A-Za-z0-9]*),?\s+(?:or|abbreviated\s+as)\s+([A-Z][A-Z0-9]{1,9})\b").unwrap()
});

/// Markdown table row with a bold acronym: `| **ACR** | Full Form |`.
static TABLE_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|\s*\*\*([A-Z][A-Z0-9]{1,9})\*\*\s*\|\s*([^|]+?)\s*\|").unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcronymDictionary {
    pub entries: BTreeMap<String, BTreeSet<String>>,
}

impl AcronymDictionary {
    pub fn expansions(&self, acronym: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(acronym)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        Ok(Self {
            entries: serde_json::from_str(s)?,
        })
    }
}

fn word_initials(expansion: &str) -> Vec<char> {
    expansion
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// The letters of `acronym` must form a subsequence of `expansion`'s
/// word-initial letters.
fn is_valid_acronym(acronym: &str, expansion: &str) -> bool {
    let initials = word_initials(expansion);
    let mut it = initials.iter();
    acronym.chars().all(|c| {
        let target = c.to_ascii_uppercase();
        it.by_ref().any(|&i| i == target)
    })
}

fn add_pair(dict: &mut BTreeMap<String, BTreeSet<String>>, acronym: &str, expansion: &str) {
    let acronym = acronym.trim();
    let expansion = expansion.trim();
    if acronym.len() < 2 || expansion.is_empty() {
        return;
    }
    if !acronym.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return;
    }
    if !is_valid_acronym(acronym, expansion) {
        return;
    }
    dict.entry(acronym.to_string()).or_default().insert(expansion.to_string());
}

/// Scan all chunk texts and build the acronym dictionary.
pub fn extract_acronyms_from_chunks(chunks: &[Chunk]) -> AcronymDictionary {
    let mut entries: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for chunk in chunks {
        let text = &chunk.text;

        for cap in PAREN_AFTER_RE.captures_iter(text) {
            add_pair(&mut entries, &cap[2], &cap[1]);
        }
        for cap in PAREN_BEFORE_RE.captures_iter(text) {
            add_pair(&mut entries, &cap[1], &cap[2]);
        }
        for cap in STANDS_FOR_RE.captures_iter(text) {
            let (left, right) = (&cap[1], &cap[2]);
            if left.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) && left.len() <= 10 {
                add_pair(&mut entries, left, right);
            } else {
                add_pair(&mut entries, right, left);
            }
        }
        for cap in OR_ACRONYM_RE.captures_iter(text) {
            add_pair(&mut entries, &cap[2], &cap[1]);
        }
        for cap in TABLE_ROW_RE.captures_iter(text) {
            add_pair(&mut entries, &cap[1], &cap[2]);
        }
    }

    AcronymDictionary { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            chunk_id: "c1".into(),
            file_path: PathBuf::from("a.md"),
            heading_hierarchy: vec![],
            level: 0,
            text: text.to_string(),
            chunk_index: 0,
            char_offset: 0,
        }
    }

    #[test]
    fn full_form_before_parens_is_extracted() {
        let c = chunk("Security Information and Event Management (SIEM) does X.");
        let dict = extract_acronyms_from_chunks(&[c]);
        let expansions = dict.expansions("SIEM").expect("SIEM present");
        assert!(expansions.contains("Security Information and Event Management"));
    }

    #[test]
    fn invalid_subsequence_is_rejected() {
        let c = chunk("Totally Unrelated Words (XYZ) does X.");
        let dict = extract_acronyms_from_chunks(&[c]);
        assert!(dict.expansions("XYZ").is_none());
    }

    #[test]
    fn acronym_before_parens_is_extracted() {
        let c = chunk("The API (Application Programming Interface) is stable.");
        let dict = extract_acronyms_from_chunks(&[c]);
        assert!(dict.expansions("API").unwrap().contains("Application Programming Interface"));
    }
}
