//! End-to-end scenarios wiring the service facade to the in-memory storage
//! adapters and the default embedder/reranker.

use std::path::PathBuf;
use std::sync::Arc;

use mdkb_core::config::Config;
use mdkb_core::embeddings::HashingEmbedder;
use mdkb_core::reranking::LexicalOverlapReranker;
use mdkb_core::storage::memory::{InMemoryGraphStore, InMemoryMetadataStore, InMemoryVectorStore};
use mdkb_core::types::SearchMode;
use mdkb_core::Service;

fn temp_corpus(name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mdkb_e2e_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    for (filename, content) in files {
        std::fs::write(dir.join(filename), content).unwrap();
    }
    dir
}

fn service() -> Service {
    Service::new(
        Config::default(),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(InMemoryGraphStore::new()),
        Arc::new(InMemoryMetadataStore::new()),
        Arc::new(HashingEmbedder::new(128)),
        Arc::new(LexicalOverlapReranker),
    )
}

#[test]
fn scenario_single_file_one_heading() {
    let dir = temp_corpus("single_heading", &[("a.md", "# Alpha\n\nHello world.")]);
    let svc = service();
    let stats = svc.index(&dir).unwrap();
    assert_eq!(stats.total_chunks, 1);

    let results = svc.search("hello", 10, SearchMode::Bm25, false, false).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].fused_score > 0.0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn scenario_oversize_section_splits_into_multiple_chunks() {
    let sentence = "This particular sentence repeats many times across the document body today. ";
    let body = sentence.repeat(40);
    let content = format!("# T\n\n{body}");
    let dir = temp_corpus("oversize", &[("a.md", &content)]);

    let mut config = Config::default();
    config.chunking.max_chunk_tokens = 50;
    config.chunking.chunk_overlap_tokens = 10;

    let svc = Service::new(
        config,
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(InMemoryGraphStore::new()),
        Arc::new(InMemoryMetadataStore::new()),
        Arc::new(HashingEmbedder::new(128)),
        Arc::new(LexicalOverlapReranker),
    );
    let stats = svc.index(&dir).unwrap();
    assert!(stats.total_chunks > 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn scenario_wikilink_extraction_links_to_a_found_entity() {
    let dir = temp_corpus("wikilink", &[("a.md", "# Notes\n\nSee [[Foo Bar]] for details.")]);
    let svc = service();
    svc.index(&dir).unwrap();

    // The wikilink target becomes a graph entity node reachable from the
    // chunk that mentions it.
    let results = svc.search("details", 10, SearchMode::Bm25, false, false).unwrap();
    assert_eq!(results.len(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn scenario_acronym_round_trip_expands_query() {
    let content = "# Security\n\nSecurity Information and Event Management (SIEM) does X.\n\n\
                   ## Details\n\nSecurity Information and Event Management (SIEM) is widely deployed.";
    let dir = temp_corpus("acronym", &[("a.md", content)]);
    let svc = service();
    svc.index(&dir).unwrap();

    let results = svc.search("SIEM", 10, SearchMode::Bm25, false, true).unwrap();
    assert!(!results.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn scenario_hybrid_mode_surfaces_both_semantic_and_lexical_matches() {
    let dir = temp_corpus(
        "hybrid",
        &[(
            "a.md",
            "# Chunk X\n\nrust programming language ownership borrowing memory safety concepts.\n\n\
             # Chunk Y\n\nzzyx qwerty lexically distinct unique filler token marker.",
        )],
    );
    let svc = service();
    svc.index(&dir).unwrap();

    let results = svc.search("qwerty", 10, SearchMode::Hybrid, false, false).unwrap();
    assert!(!results.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn search_with_no_index_built_returns_empty_results_not_an_error() {
    let svc = service();
    let results = svc.search("anything", 10, SearchMode::Hybrid, false, false).unwrap();
    assert!(results.is_empty());
    assert!(svc.status().unwrap().is_none());
}
