use std::sync::Arc;

use lexstat_core::{Corpus, Error, FormSet, MemoryIndex, Mi, Rail, RailConfig, RailStore, TagFilter, HOLE};
use tempfile::{tempdir, TempDir};

fn open(index: MemoryIndex) -> (TempDir, Corpus, Arc<Rail>) {
    let dir = tempdir().unwrap();
    let index = Arc::new(index);
    let corpus = Corpus::from_index("text", index.clone());
    let rail = RailStore::open(&RailConfig::new(dir.path()), &corpus, index.as_ref()).unwrap().rail();
    (dir, corpus, rail)
}

fn forms(ids: &[u32]) -> FormSet { FormSet::from_ids(100, ids) }

#[test]
fn chain_start_middle_end() {
    let mut index = MemoryIndex::with_size("text", 1, 100);
    index.add_doc_ids(&[10, 11, 12]);
    let (_dir, corpus, rail) = open(index);

    let graph = rail.expressions_by_forms(&corpus, None, &forms(&[10]), &forms(&[11]), &forms(&[12]));
    assert_eq!(graph.len(), 1);
    let edge = graph.get(10, 12).unwrap();
    assert_eq!(edge.count, 1);
    assert!(edge.directed);
    assert_eq!(edge.label.as_deref(), Some("w10 w11 w12"));
    assert!(graph.get(12, 10).is_none());
}

#[test]
fn unknown_form_breaks_chain() {
    let mut index = MemoryIndex::with_size("text", 1, 100);
    index.add_doc_ids(&[10, 11, 99, 12]);
    index.add_doc_ids(&[10, 11, HOLE, 12]);
    let (_dir, corpus, rail) = open(index);

    let graph = rail.expressions_by_forms(&corpus, None, &forms(&[10]), &forms(&[11]), &forms(&[12]));
    assert!(graph.is_empty());
}

#[test]
fn end_reopens_and_docs_close() {
    let mut index = MemoryIndex::with_size("text", 1, 100);
    index.add_doc_ids(&[1, 2, 3, 2, 3, 1]);
    index.add_doc_ids(&[2, 1, 3]);
    let (_dir, corpus, rail) = open(index);

    let graph = rail.expressions_by_forms(&corpus, None, &forms(&[1, 3]), &forms(&[2]), &forms(&[3]));
    assert_eq!(graph.get(1, 3).map(|e| e.count), Some(2));
    assert_eq!(graph.get(3, 3).map(|e| e.count), Some(1));
    assert_eq!(graph.get(1, 3).and_then(|e| e.label.clone()).as_deref(), Some("w1 w2 w3"));
    assert_eq!(graph.len(), 2);
}

#[test]
fn expressions_by_tags() {
    const NOUN: u8 = 0x30;
    const PREP: u8 = 0x40;
    const DET: u8 = 0x60;
    let mut index = MemoryIndex::new("text", 1);
    let pomme = index.add_form("pomme", NOUN);
    index.add_form("de", PREP);
    let terre = index.add_form("terre", NOUN);
    index.add_form("la", DET);
    index.add_form("l'", DET);
    let eau = index.add_form("eau", NOUN);
    index.add_doc_forms(&["pomme", "de", "terre", "et", "pomme", "de", "la", "terre"]);
    index.add_doc_forms(&["pomme", "de", "l'", "eau"]);
    let (_dir, corpus, rail) = open(index);

    let nouns = TagFilter::of(&[NOUN]);
    let between = TagFilter::of(&[PREP, DET]);
    let graph = rail.expressions(&corpus, None, &nouns, &between, &nouns);
    assert_eq!(graph.len(), 2);
    let edge = graph.get(pomme, terre).unwrap();
    assert_eq!(edge.count, 2);
    assert_eq!(edge.label.as_deref(), Some("pomme de terre"));
    let edge = graph.get(pomme, eau).unwrap();
    assert_eq!(edge.label.as_deref(), Some("pomme de l'eau"));
    assert_eq!(graph.nodes().iter().find(|n| n.0 == pomme).map(|n| n.1), Some(3));
}

#[test]
fn context_graph() {
    let mut index = MemoryIndex::with_size("text", 1, 10);
    index.add_doc_ids(&[1, 2, 3, 1, 4]);
    index.add_doc_ids(&[2, 1, 3, 9]);
    index.add_doc_ids(&[3, 4, 9]);
    let (_dir, corpus, rail) = open(index);

    let graph = rail.edges(&corpus, &[1], 1, 1, &[2, 3, 4], None).unwrap();
    assert!(!graph.is_directed());
    assert_eq!(graph.nodes().iter().map(|n| n.0).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    // not a star around the pivot
    assert!(graph.get(1, 2).is_none());
    assert_eq!(graph.get(3, 4).map(|e| e.count), Some(1));
    assert_eq!(graph.get(2, 3).map(|e| e.count), Some(1));
    assert_eq!(graph.len(), 2);

    let wide = rail.edges(&corpus, &[1], 2, 2, &[2, 3, 4], None).unwrap();
    assert_eq!(wide.get(2, 3).map(|e| e.count), Some(3));
    assert_eq!(wide.get(3, 4).map(|e| e.count), Some(1));
    assert_eq!(wide.get(2, 4).map(|e| e.count), Some(1));
    assert!(wide.get(1, 3).is_none());
}

#[test]
fn other_pivot_occurrence_is_a_node() {
    let mut index = MemoryIndex::with_size("text", 1, 4);
    index.add_doc_ids(&[1, 3, 1]);
    let (_dir, corpus, rail) = open(index);

    let graph = rail.edges(&corpus, &[1], 2, 2, &[3], None).unwrap();
    // each pivot sees the other one and the 3
    assert_eq!(graph.get(1, 3).map(|e| e.count), Some(2));
    assert_eq!(graph.len(), 1);
}

#[test]
fn widest_window_links_the_whole_document() {
    let mut index = MemoryIndex::with_size("text", 1, 5);
    index.add_doc_ids(&[1, 2, 4, 3]);
    let (_dir, corpus, rail) = open(index);

    let near = rail.edges(&corpus, &[1], 0, 1, &[2, 3], None).unwrap();
    assert!(near.is_empty());
    let graph = rail.edges(&corpus, &[1], 0, usize::MAX, &[2, 3], None).unwrap();
    assert_eq!(graph.get(2, 3).map(|e| e.count), Some(1));
    assert_eq!(graph.len(), 1);
    let both = rail.edges(&corpus, &[4], usize::MAX, usize::MAX, &[1, 2, 3], None).unwrap();
    assert_eq!(both.len(), 3);
}

#[test]
fn context_graph_errors() {
    let mut index = MemoryIndex::with_size("text", 1, 4);
    index.add_doc_ids(&[1, 2, 3]);
    let (_dir, corpus, rail) = open(index);

    assert!(matches!(rail.edges(&corpus, &[], 1, 1, &[2], None), Err(Error::NoPivots)));
    assert!(matches!(rail.edges(&corpus, &[1], 0, 0, &[2], None), Err(Error::Window { .. })));
}

#[test]
fn scored_and_balanced() {
    let mut index = MemoryIndex::with_size("text", 1, 10);
    for _ in 0..3 {
        index.add_doc_ids(&[2, 1, 3]);
    }
    index.add_doc_ids(&[4, 1, 5]);
    let (_dir, corpus, rail) = open(index);

    let mut graph = rail.edges(&corpus, &[1], 1, 1, &[2, 3, 4, 5], None).unwrap();
    graph.score(Mi::Jaccard);
    let best = graph.sorted()[0];
    assert_eq!((best.source, best.target, best.count), (2, 3, 3));
    assert!((best.score - 1.0).abs() < 1e-12);
    let balanced = graph.balanced();
    assert_eq!(balanced.len(), 2);
    assert!(graph.to_string().starts_with("2 -- 3 (3)"));
}
