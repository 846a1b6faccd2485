//! Dense co-occurrence matrix over a restricted vocabulary.

use std::fmt;

use roaring::RoaringBitmap;

use crate::bits::FormSet;
use crate::corpus::Corpus;
use crate::errors::{check_window, Error, Result};
use crate::index::{TermId, HOLE};
use crate::rail::Rail;
use crate::tags::TagFilter;

/// Marks an empty slot of the sliding window.
const EMPTY: u32 = u32::MAX;

/// Square matrix of counts addressed by term id, stored by rank.
///
/// The rank space is the sorted set of accepted ids, only those ids are
/// valid as a row or a column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoocMat {
    /// rank -> id
    headers: Vec<TermId>,
    /// id -> rank
    ranks: Vec<Option<u32>>,
    cells: Vec<u32>,
}

impl CoocMat {
    pub fn new(ids: &FormSet) -> Self {
        let headers: Vec<TermId> = ids.iter().collect();
        let max_id = headers.last().map_or(0, |&id| id as usize + 1);
        let mut ranks = vec![None; max_id];
        for (rank, &id) in headers.iter().enumerate() {
            ranks[id as usize] = Some(rank as u32);
        }
        let n = headers.len();
        Self { headers, ranks, cells: vec![0; n * n] }
    }

    /// Count of rows (and columns).
    pub fn len(&self) -> usize { self.headers.len() }

    pub fn is_empty(&self) -> bool { self.headers.is_empty() }

    /// Accepted ids, in rank order.
    pub fn headers(&self) -> &[TermId] { &self.headers }

    pub fn rank(&self, id: TermId) -> Option<usize> {
        self.ranks.get(id as usize).copied().flatten().map(|r| r as usize)
    }

    pub fn get(&self, row: TermId, col: TermId) -> Result<u32> {
        let cell = self.cell(row, col)?;
        Ok(self.cells[cell])
    }

    pub fn inc(&mut self, row: TermId, col: TermId) -> Result<()> {
        let cell = self.cell(row, col)?;
        self.cells[cell] += 1;
        Ok(())
    }

    pub fn set(&mut self, row: TermId, col: TermId, value: u32) -> Result<()> {
        let cell = self.cell(row, col)?;
        self.cells[cell] = value;
        Ok(())
    }

    /// Count by ranks, `0` outside the matrix.
    pub fn get_by_rank(&self, row: usize, col: usize) -> u32 {
        if row >= self.len() || col >= self.len() {
            return 0;
        }
        self.cells[row * self.len() + col]
    }

    /// A row by rank, empty outside the matrix.
    pub fn row_by_rank(&self, row: usize) -> &[u32] {
        let n = self.len();
        self.cells.get(row * n..(row + 1) * n).unwrap_or(&[])
    }

    #[inline]
    fn inc_by_rank(&mut self, row: u32, col: u32) {
        let n = self.len();
        self.cells[row as usize * n + col as usize] += 1;
    }

    fn cell(&self, row: TermId, col: TermId) -> Result<usize> {
        let row = self.rank(row).ok_or(Error::NotInRankSpace { id: row, axis: "row" })?;
        let col = self.rank(col).ok_or(Error::NotInRankSpace { id: col, axis: "col" })?;
        Ok(row * self.len() + col)
    }

    /// Table with forms as headers instead of ids.
    pub fn to_tsv(&self, corpus: &Corpus) -> String {
        let mut out = String::new();
        for &id in &self.headers {
            out.push('\t');
            out.push_str(corpus.form(id));
        }
        out.push('\n');
        for (rank, &id) in self.headers.iter().enumerate() {
            out.push_str(corpus.form(id));
            for count in self.row_by_rank(rank) {
                out.push('\t');
                out.push_str(&count.to_string());
            }
            out.push('\n');
        }
        out
    }
}

impl From<&FormSet> for CoocMat {
    fn from(ids: &FormSet) -> Self { CoocMat::new(ids) }
}

impl fmt::Display for CoocMat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in &self.headers {
            write!(f, "\t{id}")?;
        }
        writeln!(f)?;
        for (rank, id) in self.headers.iter().enumerate() {
            write!(f, "{id}")?;
            for count in self.row_by_rank(rank) {
                write!(f, "\t{count}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Circular window of ranks, the pivot lags `right` slots behind the last push.
struct Window {
    slots: Vec<u32>,
    right: usize,
    pushed: usize,
}

impl Window {
    fn new(left: usize, right: usize) -> Self {
        let width = left.saturating_add(right).saturating_add(1);
        Self { slots: vec![EMPTY; width], right, pushed: 0 }
    }

    fn reset(&mut self) {
        self.slots.fill(EMPTY);
        self.pushed = 0;
    }

    /// Push a rank, then count the pivot against the rest of the window.
    fn push(&mut self, rank: u32, mat: &mut CoocMat) {
        let width = self.slots.len();
        self.slots[self.pushed % width] = rank;
        self.pushed += 1;
        if self.pushed <= self.right {
            return;
        }
        let at = (self.pushed - 1 - self.right) % width;
        let pivot = self.slots[at];
        if pivot == EMPTY {
            return;
        }
        for (i, &cooc) in self.slots.iter().enumerate() {
            if i != at && cooc != EMPTY {
                mat.inc_by_rank(pivot, cooc);
            }
        }
    }
}

/// Vocabulary of a matrix: ids passing the tag filter, with at least `min_freq` occurrences.
pub fn vocabulary(corpus: &Corpus, tag_filter: Option<&TagFilter>, min_freq: u64) -> FormSet {
    let max_form = corpus.max_form();
    let mut ids = match tag_filter {
        Some(filter) => filter.forms(corpus.dic()),
        None => FormSet::full(max_form),
    };
    ids.remove(HOLE);
    for id in 1..max_form as TermId {
        if ids.contains(id) && corpus.occs(id) < min_freq {
            ids.remove(id);
        }
    }
    ids
}

impl Rail {
    /// Count co-occurrences between every pair of vocabulary forms in a window of
    /// `left` and `right` tokens. Forms outside the vocabulary are skipped before
    /// windowing, so the window spans vocabulary tokens only. Every vocabulary
    /// token is a pivot once, and the matrix is symmetric when `left == right`.
    pub fn cooc_matrix(
        &self,
        corpus: &Corpus,
        left: usize,
        right: usize,
        tag_filter: Option<&TagFilter>,
        min_freq: u64,
        doc_filter: Option<&RoaringBitmap>,
    ) -> Result<CoocMat> {
        check_window(left, right)?;
        let vocab = vocabulary(corpus, tag_filter, min_freq);
        let mut mat = CoocMat::new(&vocab);
        if mat.is_empty() {
            tracing::debug!(field = corpus.field(), min_freq, "empty vocabulary, empty matrix");
            return Ok(mat);
        }
        // a window never spans more vocabulary tokens than the longest document
        let longest = self.docs(doc_filter).map(|(_, ids)| ids.len()).max().unwrap_or(0);
        let (left, right) = (left.min(longest), right.min(longest));
        let mut window = Window::new(left, right);
        for (_, ids) in self.docs(doc_filter) {
            window.reset();
            for &id in ids {
                if let Some(rank) = mat.rank(id) {
                    window.push(rank as u32, &mut mat);
                }
            }
            for _ in 0..right {
                window.push(EMPTY, &mut mat);
            }
        }
        tracing::debug!(field = corpus.field(), nodes = mat.len(), left, right, "cooc matrix");
        Ok(mat)
    }
}
