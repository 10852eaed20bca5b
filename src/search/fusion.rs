//! Reciprocal Rank Fusion, best-window snippet extraction, and result hydration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::MetadataStore;
use crate::text::tokenize_for_expansion;
use crate::types::SearchResult;

const DEFAULT_SNIPPET_LENGTH: usize = 300;

/// `{engine_name: [(chunk_id, raw_score)]}` -> fused `(chunk_id, rrf_score)`
/// sorted descending. Ties broken by first-seen (stable sort) order.
pub fn fuse_results(engine_results: &HashMap<String, Vec<(String, f32)>>, k: usize) -> Vec<(String, f32)> {
    let mut rrf: HashMap<String, f32> = HashMap::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut order_counter = 0usize;

    let mut engines: Vec<&String> = engine_results.keys().collect();
    engines.sort();

    for engine in engines {
        let hits = &engine_results[engine];
        for (rank, (chunk_id, _score)) in hits.iter().enumerate() {
            let contribution = 1.0 / (k as f32 + (rank + 1) as f32);
            *rrf.entry(chunk_id.clone()).or_insert(0.0) += contribution;
            first_seen.entry(chunk_id.clone()).or_insert_with(|| {
                order_counter += 1;
                order_counter
            });
        }
    }

    let mut fused: Vec<(String, f32)> = rrf.into_iter().collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| first_seen[&a.0].cmp(&first_seen[&b.0]))
    });
    fused
}

/// Best-window snippet: slide a `snippet_length`-character window at word
/// boundaries, maximizing distinct query token coverage.
pub fn extract_best_snippet(text: &str, query: &str, snippet_length: usize) -> String {
    let query_tokens: std::collections::HashSet<String> = tokenize_for_expansion(query).into_iter().collect();

    if query_tokens.is_empty() {
        return head_truncate(text, snippet_length);
    }

    if text.chars().count() <= snippet_length {
        return text.to_string();
    }

    let word_boundaries: Vec<usize> = std::iter::once(0)
        .chain(text.match_indices(char::is_whitespace).map(|(i, _)| i + 1))
        .collect();

    let char_indices: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total_chars = char_indices.len();

    let mut best_start = 0usize;
    let mut best_count = -1i32;

    for &start in &word_boundaries {
        if start >= text.len() {
            continue;
        }
        let start_char = text[..start].chars().count();
        if start_char >= total_chars {
            continue;
        }
        let end_char = (start_char + snippet_length).min(total_chars);
        let end_byte = char_indices.get(end_char).copied().unwrap_or(text.len());
        let window = &text[start..end_byte];
        let window_lower = window.to_lowercase();
        let count = query_tokens.iter().filter(|t| window_lower.contains(t.as_str())).count() as i32;
        if count > best_count {
            best_count = count;
            best_start = start;
        }
    }

    let start_char = text[..best_start].chars().count();
    let end_char = (start_char + snippet_length).min(total_chars);
    let mut end_byte = char_indices.get(end_char).copied().unwrap_or(text.len());

    if end_byte < text.len() {
        if let Some(last_space) = text[best_start..end_byte].rfind(char::is_whitespace) {
            let lost = end_byte - (best_start + last_space);
            if (lost as f32) < 0.2 * (end_byte - best_start) as f32 {
                end_byte = best_start + last_space;
            }
        }
    }

    let mut snippet = text[best_start..end_byte].trim().to_string();
    if best_start > 0 {
        snippet = format!("...{snippet}");
    }
    if end_byte < text.len() {
        snippet = format!("{snippet}...");
    }
    snippet
}

fn head_truncate(text: &str, length: usize) -> String {
    if text.chars().count() <= length {
        return text.to_string();
    }
    let truncated: String = text.chars().take(length).collect();
    match truncated.rfind(char::is_whitespace) {
        Some(idx) if idx as f32 > 0.8 * truncated.len() as f32 => format!("{}...", truncated[..idx].trim_end()),
        _ => format!("{}...", truncated.trim_end()),
    }
}

/// Hydrate the top-k fused IDs into [`SearchResult`] records. Chunks missing
/// from the metadata store are silently dropped.
pub fn build_search_results(
    fused: &[(String, f32)],
    per_engine: &HashMap<String, Vec<(String, f32)>>,
    metadata_store: &Arc<dyn MetadataStore>,
    query: &str,
    top_k: usize,
) -> anyhow::Result<Vec<SearchResult>> {
    let engine_scores: HashMap<&str, HashMap<&str, f32>> = per_engine
        .iter()
        .map(|(engine, hits)| (engine.as_str(), hits.iter().map(|(id, s)| (id.as_str(), *s)).collect()))
        .collect();

    let mut results = Vec::new();
    for (chunk_id, fused_score) in fused.iter().take(top_k) {
        let Some(chunk) = metadata_store.get_chunk(chunk_id)? else {
            continue;
        };

        let semantic_score = engine_scores.get("semantic").and_then(|m| m.get(chunk_id.as_str())).copied();
        let bm25_score = engine_scores.get("bm25").and_then(|m| m.get(chunk_id.as_str())).copied();
        let graph_score = engine_scores.get("graph").and_then(|m| m.get(chunk_id.as_str())).copied();

        let mut matched_engines = Vec::new();
        if semantic_score.is_some() {
            matched_engines.push("semantic".to_string());
        }
        if bm25_score.is_some() {
            matched_engines.push("bm25".to_string());
        }
        if graph_score.is_some() {
            matched_engines.push("graph".to_string());
        }
        matched_engines.sort();

        results.push(SearchResult {
            chunk_id: chunk_id.clone(),
            file_path: chunk.file_path.clone(),
            heading_path: chunk.heading_path(),
            snippet: extract_best_snippet(&chunk.text, query, DEFAULT_SNIPPET_LENGTH),
            fused_score: *fused_score,
            semantic_score,
            bm25_score,
            graph_score,
            matched_engines,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrf_fusion_matches_the_worked_example() {
        let mut engine_results = HashMap::new();
        engine_results.insert("semantic".to_string(), vec![("a".to_string(), 0.9), ("b".to_string(), 0.8), ("c".to_string(), 0.7)]);
        engine_results.insert("bm25".to_string(), vec![("b".to_string(), 5.0), ("d".to_string(), 4.0), ("a".to_string(), 3.0)]);

        let fused = fuse_results(&engine_results, 60);
        let order: Vec<&str> = fused.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn fusion_is_deterministic_given_identical_inputs() {
        let mut engine_results = HashMap::new();
        engine_results.insert("semantic".to_string(), vec![("a".to_string(), 0.9), ("b".to_string(), 0.8)]);
        let first = fuse_results(&engine_results, 60);
        let second = fuse_results(&engine_results, 60);
        assert_eq!(first, second);
    }

    #[test]
    fn snippet_extraction_prefers_window_with_query_terms() {
        let text = "Introduction text that has nothing useful in it at all here today. \
                    The important part mentions rust programming extensively in detail. \
                    Trailing filler content that does not matter for scoring at all.";
        let snippet = extract_best_snippet(text, "rust programming", 60);
        assert!(snippet.to_lowercase().contains("rust"));
    }

    #[test]
    fn empty_query_falls_back_to_head_truncation() {
        let text = "a".repeat(500);
        let snippet = extract_best_snippet(&text, "", 100);
        assert!(snippet.len() <= 104);
    }
}
