//! Sparse weighted graphs of forms: co-occurrence of contexts and expressions.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use roaring::RoaringBitmap;

use crate::bits::FormSet;
use crate::cooc::pivot_lookup;
use crate::corpus::Corpus;
use crate::errors::{check_window, Result};
use crate::index::{TermId, HOLE};
use crate::mi::Mi;
use crate::rail::Rail;
use crate::tags::TagFilter;

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: TermId,
    pub target: TermId,
    pub count: u32,
    /// Set by [`EdgeMatrix::score`], `0.0` before.
    pub score: f64,
    /// Literal text of an expression.
    pub label: Option<String>,
    pub directed: bool,
}

impl Edge {
    pub fn new(source: TermId, target: TermId, directed: bool) -> Self {
        Self { source, target, count: 0, score: 0.0, label: None, directed }
    }

    pub fn inc(&mut self) { self.count += 1; }

    /// Best first: score, then count, then ids.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then(other.count.cmp(&self.count))
            .then((self.source, self.target).cmp(&(other.source, other.target)))
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = if self.directed { "->" } else { "--" };
        write!(f, "{} {arrow} {} ({})", self.source, self.target, self.count)?;
        if let Some(label) = &self.label {
            write!(f, " \"{label}\"")?;
        }
        Ok(())
    }
}

/// Edges between nodes, keyed by (source, target), the smaller id first when undirected.
///
/// A graph built `with_nodes()` only accepts edges between its nodes,
/// a graph built `new()` accepts any id and records nodes as they come.
#[derive(Debug, Clone)]
pub struct EdgeMatrix {
    /// (id, occurrences), sorted by id
    nodes: Vec<(TermId, u64)>,
    closed: bool,
    directed: bool,
    occs_all: u64,
    edges: HashMap<(TermId, TermId), Edge>,
    cluster: Vec<TermId>,
}

impl EdgeMatrix {
    pub fn new(directed: bool, occs_all: u64) -> Self {
        Self {
            nodes: Vec::new(),
            closed: false,
            directed,
            occs_all,
            edges: HashMap::new(),
            cluster: Vec::new(),
        }
    }

    pub fn with_nodes(nodes: impl IntoIterator<Item = (TermId, u64)>, occs_all: u64, directed: bool) -> Self {
        let mut nodes: Vec<(TermId, u64)> = nodes.into_iter().collect();
        nodes.sort_unstable_by_key(|n| n.0);
        nodes.dedup_by_key(|n| n.0);
        Self { nodes, closed: true, ..Self::new(directed, occs_all) }
    }

    pub fn is_directed(&self) -> bool { self.directed }

    pub fn occs_all(&self) -> u64 { self.occs_all }

    pub fn nodes(&self) -> &[(TermId, u64)] { &self.nodes }

    pub fn node_index(&self, id: TermId) -> Option<usize> { self.nodes.binary_search_by_key(&id, |n| n.0).ok() }

    /// Insert a node or update its occurrences.
    pub fn add_node(&mut self, id: TermId, occs: u64) {
        match self.nodes.binary_search_by_key(&id, |n| n.0) {
            Ok(i) => self.nodes[i].1 = occs,
            Err(i) => self.nodes.insert(i, (id, occs)),
        }
    }

    fn key(&self, source: TermId, target: TermId) -> (TermId, TermId) {
        if self.directed || source <= target {
            (source, target)
        } else {
            (target, source)
        }
    }

    /// Count one more edge, `false` if a node is unknown to a closed graph.
    pub fn inc(&mut self, source: TermId, target: TermId) -> bool {
        if self.closed && (self.node_index(source).is_none() || self.node_index(target).is_none()) {
            return false;
        }
        if !self.closed {
            for id in [source, target] {
                if self.node_index(id).is_none() {
                    self.add_node(id, 0);
                }
            }
        }
        let key = self.key(source, target);
        let directed = self.directed;
        self.edges.entry(key).or_insert_with(|| Edge::new(key.0, key.1, directed)).inc();
        true
    }

    pub fn get(&self, source: TermId, target: TermId) -> Option<&Edge> { self.edges.get(&self.key(source, target)) }

    pub fn edge_mut(&mut self, source: TermId, target: TermId) -> Option<&mut Edge> {
        let key = self.key(source, target);
        self.edges.get_mut(&key)
    }

    pub fn len(&self) -> usize { self.edges.len() }

    pub fn is_empty(&self) -> bool { self.edges.is_empty() }

    /// Edges in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Edge> { self.edges.values() }

    /// Add an id to the current cluster, linking it to every id already there.
    pub fn clust(&mut self, id: TermId) {
        let cluster = std::mem::take(&mut self.cluster);
        for &other in &cluster {
            self.inc(id, other);
        }
        self.cluster = cluster;
        self.cluster.push(id);
    }

    /// Close the current cluster.
    pub fn declust(&mut self) { self.cluster.clear(); }

    /// Score every edge with an association measure between its two nodes.
    /// Edge counts may exceed node occurrences in large windows, so `Oab` is capped.
    pub fn score(&mut self, mi: Mi) -> &mut Self {
        let n = self.occs_all as f64;
        let nodes = &self.nodes;
        let occs = |id: TermId| nodes.binary_search_by_key(&id, |node| node.0).map_or(0, |i| nodes[i].1);
        for edge in self.edges.values_mut() {
            let oa = occs(edge.source);
            let ob = occs(edge.target);
            let oab = (edge.count as u64).min(oa.min(ob));
            edge.score = mi.score(oab as f64, oa as f64, ob as f64, n);
        }
        self
    }

    /// Edges, best first.
    pub fn sorted(&self) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges.values().collect();
        edges.sort_by(|a, b| a.rank(b));
        edges
    }

    /// Edges taken in turn from each node, every node giving its best edge not yet
    /// taken. Keeps weak nodes connected where `sorted()` would leave them orphans.
    /// Loops on a node are skipped.
    pub fn balanced(&self) -> Vec<&Edge> {
        let mut by_node: Vec<Vec<&Edge>> = vec![Vec::new(); self.nodes.len()];
        for edge in self.edges.values().filter(|e| e.source != e.target) {
            for id in [edge.source, edge.target] {
                if let Some(i) = self.node_index(id) {
                    by_node[i].push(edge);
                }
            }
        }
        for edges in by_node.iter_mut() {
            edges.sort_by(|a, b| a.rank(b));
        }
        let mut taken: HashSet<(TermId, TermId)> = HashSet::with_capacity(self.edges.len());
        let mut cursors = vec![0usize; by_node.len()];
        let mut out = Vec::with_capacity(self.edges.len());
        loop {
            let mut progress = false;
            for (node, edges) in by_node.iter().enumerate() {
                while let Some(edge) = edges.get(cursors[node]) {
                    cursors[node] += 1;
                    if taken.insert((edge.source, edge.target)) {
                        out.push(*edge);
                        progress = true;
                        break;
                    }
                }
            }
            if !progress {
                break;
            }
        }
        out
    }
}

impl fmt::Display for EdgeMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for edge in self.sorted() {
            writeln!(f, "{edge}")?;
        }
        Ok(())
    }
}

impl Rail {
    /// Graph of the forms found together around the pivots.
    ///
    /// Nodes are the pivots and the `cooc_ids`. For each pivot occurrence, the
    /// distinct nodes of the window (the pivot position excluded) are linked by
    /// pairs. Ids outside the node set are ignored.
    pub fn edges(
        &self,
        corpus: &Corpus,
        pivots: &[TermId],
        left: usize,
        right: usize,
        cooc_ids: &[TermId],
        doc_filter: Option<&RoaringBitmap>,
    ) -> Result<EdgeMatrix> {
        check_window(left, right)?;
        let lookup = pivot_lookup(pivots)?;
        let nodes = lookup
            .iter()
            .chain(cooc_ids)
            .filter(|&&id| id != HOLE)
            .map(|&id| (id, corpus.occs(id)));
        let mut graph = EdgeMatrix::with_nodes(nodes, corpus.dic().occs_all(), false);
        let mut found: Vec<TermId> = Vec::new();
        for (doc_id, pos) in self.positions(&lookup, doc_filter) {
            let ids = self.slice(doc_id as usize);
            let pos = pos as usize;
            let from = pos.saturating_sub(left);
            let to = ids.len().min(pos.saturating_add(1).saturating_add(right));
            found.clear();
            for (i, &id) in ids.get(from..to).unwrap_or(&[]).iter().enumerate() {
                if from + i == pos || id == HOLE || graph.node_index(id).is_none() || found.contains(&id) {
                    continue;
                }
                found.push(id);
            }
            for (x, &a) in found.iter().enumerate() {
                for &b in &found[x + 1..] {
                    graph.inc(a, b);
                }
            }
        }
        tracing::debug!(field = corpus.field(), nodes = graph.nodes().len(), edges = graph.len(), "edges");
        Ok(graph)
    }

    /// Chains of forms opened by a `start` form, continued by `middle` forms
    /// and closed by an `end` form, counted as directed edges (first, last).
    pub fn expressions(
        &self,
        corpus: &Corpus,
        doc_filter: Option<&RoaringBitmap>,
        start: &TagFilter,
        middle: &TagFilter,
        end: &TagFilter,
    ) -> EdgeMatrix {
        let dic = corpus.dic();
        self.expressions_by_forms(corpus, doc_filter, &start.forms(dic), &middle.forms(dic), &end.forms(dic))
    }

    pub fn expressions_by_forms(
        &self,
        corpus: &Corpus,
        doc_filter: Option<&RoaringBitmap>,
        start: &FormSet,
        middle: &FormSet,
        end: &FormSet,
    ) -> EdgeMatrix {
        let mut graph = EdgeMatrix::new(true, corpus.dic().occs_all());
        let mut slider: Vec<TermId> = Vec::new();
        for (_, ids) in self.docs(doc_filter) {
            slider.clear();
            for &id in ids {
                if id == HOLE {
                    slider.clear();
                    continue;
                }
                if slider.is_empty() {
                    if start.contains(id) {
                        slider.push(id);
                    }
                    continue;
                }
                if end.contains(id) {
                    slider.push(id);
                    close_chain(&mut graph, corpus, &slider);
                    slider.clear();
                    // an end may open the next chain
                    if start.contains(id) {
                        slider.push(id);
                    }
                } else if middle.contains(id) {
                    slider.push(id);
                } else {
                    slider.clear();
                }
            }
        }
        tracing::debug!(field = corpus.field(), expressions = graph.len(), "expressions");
        graph
    }
}

fn close_chain(graph: &mut EdgeMatrix, corpus: &Corpus, chain: &[TermId]) {
    let (Some(&first), Some(&last)) = (chain.first(), chain.last()) else {
        return;
    };
    graph.add_node(first, corpus.occs(first));
    graph.add_node(last, corpus.occs(last));
    graph.inc(first, last);
    if let Some(edge) = graph.edge_mut(first, last) {
        if edge.label.is_none() {
            edge.label = Some(label(corpus, chain));
        }
    }
}

/// Forms joined by a space, except after an apostrophe.
fn label(corpus: &Corpus, chain: &[TermId]) -> String {
    let mut label = String::new();
    for &id in chain {
        if !label.is_empty() && !label.ends_with(&['\'', '’'][..]) {
            label.push(' ');
        }
        label.push_str(corpus.form(id));
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undirected_key() {
        let mut graph = EdgeMatrix::with_nodes([(1, 10), (2, 10), (3, 10)], 100, false);
        assert!(graph.inc(2, 1));
        assert!(graph.inc(1, 2));
        assert!(!graph.inc(1, 9));
        assert_eq!(graph.get(1, 2).map(|e| e.count), Some(2));
        assert_eq!(graph.get(2, 1).map(|e| (e.source, e.target)), Some((1, 2)));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn directed_key() {
        let mut graph = EdgeMatrix::new(true, 100);
        graph.inc(2, 1);
        assert!(graph.get(1, 2).is_none());
        assert_eq!(graph.get(2, 1).map(|e| e.count), Some(1));
        assert_eq!(graph.nodes(), &[(1, 0), (2, 0)]);
        assert_eq!(graph.to_string(), "2 -> 1 (1)\n");
    }

    #[test]
    fn clusters() {
        let mut graph = EdgeMatrix::new(false, 100);
        graph.clust(1);
        graph.clust(2);
        graph.clust(3);
        graph.declust();
        graph.clust(3);
        graph.clust(1);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.get(1, 3).map(|e| e.count), Some(2));
        assert_eq!(graph.get(2, 3).map(|e| e.count), Some(1));
    }

    #[test]
    fn sorted_by_score_then_count() {
        let mut graph = EdgeMatrix::with_nodes([(1, 10), (2, 10), (3, 50)], 1000, false);
        for _ in 0..3 {
            graph.inc(1, 3);
        }
        graph.inc(1, 2);
        graph.inc(1, 2);
        let counts: Vec<u32> = graph.sorted().iter().map(|e| e.count).collect();
        assert_eq!(counts, vec![3, 2]);
        // rarer nodes win with a ratio
        graph.score(Mi::Dice);
        let first = graph.sorted()[0];
        assert_eq!((first.source, first.target), (1, 2));
    }

    #[test]
    fn balanced_reaches_weak_nodes() {
        let mut graph = EdgeMatrix::with_nodes([(1, 0), (2, 0), (3, 0), (4, 0)], 100, false);
        for _ in 0..5 {
            graph.inc(1, 2);
            graph.inc(1, 3);
            graph.inc(2, 3);
        }
        graph.inc(3, 4);
        let edges = graph.balanced();
        assert_eq!(edges.len(), 4);
        // 1 gives its best, 2 its best left, 3 its best left, 4 its only edge
        let order: Vec<(TermId, TermId)> = edges.iter().map(|e| (e.source, e.target)).collect();
        assert_eq!(order, vec![(1, 2), (2, 3), (1, 3), (3, 4)]);
    }

    #[test]
    fn label_glues_apostrophes() {
        use crate::index::MemoryIndex;
        use std::sync::Arc;

        let mut index = MemoryIndex::new("text", 1);
        let l = index.add_form("l'", 0);
        let eau = index.add_form("eau", 0);
        let vive = index.add_form("vive", 0);
        let corpus = Corpus::from_index("text", Arc::new(index));
        assert_eq!(label(&corpus, &[l, eau, vive]), "l'eau vive");
    }
}
