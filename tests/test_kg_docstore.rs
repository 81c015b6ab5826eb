//! Integration tests for the entity co-occurrence graph as built by uploads.
//!
//! ```bash
//! cargo test --test test_kg_docstore
//! ```

use std::collections::HashSet;

use docchat::subsystems::memory::stores::docstore::DocumentStore;
use docchat::subsystems::memory::stores::kg_docstore::{CapitalizedEntityExtractor, EntityExtractor};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn entities(text: &str) -> Vec<String> {
    CapitalizedEntityExtractor.extract(text)
}

fn docs(ids: &[&String]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

// ── Extraction ────────────────────────────────────────────────────────────────

#[test]
fn multiword_names_form_one_entity() {
    let found = entities("Tourists in New York met Ada Lovelace.");
    assert!(found.contains(&"New York".to_string()), "{found:?}");
    assert!(found.contains(&"Ada Lovelace".to_string()), "{found:?}");
}

#[test]
fn lowercase_text_has_no_entities() {
    assert!(entities("nothing capitalized here at all").is_empty());
}

// ── Graph from uploads ────────────────────────────────────────────────────────

#[test]
fn single_chunk_entities_fully_connected() {
    let store = DocumentStore::default();
    store
        .upload("Alice met Bob in Paris. Bob later betrayed Alice.", "story.txt", "text/plain")
        .expect("upload");
    store
        .read(|corpus| {
            let graph = corpus.graph();
            for (a, b) in [("Alice", "Bob"), ("Alice", "Paris"), ("Bob", "Paris")] {
                assert!(graph.has_edge(a, b), "{a}-{b}");
                assert!(graph.edge_weight(a, b, None) > 0);
            }
            assert_eq!(graph.node_count(), 3);
            assert_eq!(graph.edge_count(), 3);
        })
        .expect("read");
}

#[test]
fn edge_weights_sum_across_documents_and_filter_by_selection() {
    let store = DocumentStore::default();
    let a = store.upload("Alice met Bob.", "a.txt", "text/plain").expect("a");
    let b = store.upload("Bob thanked Alice.", "b.txt", "text/plain").expect("b");
    store
        .read(|corpus| {
            let graph = corpus.graph();
            assert_eq!(graph.edge_weight("Alice", "Bob", None), 2);
            assert_eq!(graph.edge_weight("Bob", "Alice", Some(&docs(&[&a]))), 1);
            assert_eq!(graph.edge_weight("Alice", "Bob", Some(&docs(&[&a, &b]))), 2);
            assert_eq!(graph.edge_weight("Alice", "Bob", Some(&HashSet::new())), 0);
        })
        .expect("read");
}

#[test]
fn neighbors_respect_document_filter() {
    let store = DocumentStore::default();
    let a = store.upload("Alice met Bob.", "a.txt", "text/plain").expect("a");
    let _b = store.upload("Alice visited Carol.", "b.txt", "text/plain").expect("b");
    store
        .read(|corpus| {
            let graph = corpus.graph();
            let mut all: Vec<&str> = graph.neighbors("Alice", None).into_iter().map(|(n, _)| n).collect();
            all.sort_unstable();
            assert_eq!(all, vec!["Bob", "Carol"]);

            let only_a: Vec<&str> = graph
                .neighbors("Alice", Some(&docs(&[&a])))
                .into_iter()
                .map(|(n, _)| n)
                .collect();
            assert_eq!(only_a, vec!["Bob"]);
        })
        .expect("read");
}

#[test]
fn chunk_entity_lookup_matches_mentions() {
    let store = DocumentStore::default();
    let id = store.upload("Alice met Bob in Paris.", "a.txt", "text/plain").expect("upload");
    let chunk_id = format!("{id}_chunk_0");
    store
        .read(|corpus| {
            let graph = corpus.graph();
            let ents: HashSet<&str> = graph.entities_of(&chunk_id).iter().map(String::as_str).collect();
            assert_eq!(ents, HashSet::from(["Alice", "Bob", "Paris"]));
            for e in ents {
                assert!(graph.mentions(e).any(|c| c == chunk_id));
            }
        })
        .expect("read");
}
