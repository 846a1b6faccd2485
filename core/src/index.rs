use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;
pub type DocId = u32;

/// Empty position of a rail: punctuation filtered out, deleted token…
pub const HOLE: TermId = 0;

/// Frozen dictionary of forms for one field, ids are dense, `0` is the hole.
pub trait TermDictionary {
    /// Count of ids, hole included, so that every valid id is `< size()`.
    fn size(&self) -> usize;
    fn id_of(&self, form: &str) -> Option<TermId>;
    fn form(&self, id: TermId) -> Option<&str>;
    fn tag(&self, id: TermId) -> u8;
    fn is_stop(&self, id: TermId) -> bool;
    fn is_locution(&self, id: TermId) -> bool;
    fn is_punctuation(&self, id: TermId) -> bool;
    /// Occurrences of a form in the whole corpus.
    fn occs(&self, id: TermId) -> u64;
    /// Documents containing a form in the whole corpus.
    fn docs(&self, id: TermId) -> u32;
    fn occs_all(&self) -> u64;
    fn docs_all(&self) -> u32;
}

/// Positions of the inverted index, consumed to build rails.
pub trait PositionalPostings {
    /// Generation of the index, a rail built for another version is stale.
    fn version(&self) -> u64;
    fn max_doc(&self) -> u32;
    fn has_positions(&self, field: &str) -> bool;
    /// Ordered `(position, term id)` pairs, `None` for a document without data (ex: deleted).
    fn positions(&self, doc_id: DocId, field: &str) -> anyhow::Result<Option<Vec<(u32, TermId)>>>;
    fn max_position(&self, doc_id: DocId, field: &str) -> anyhow::Result<Option<u32>>;
}

const FLAG_STOP: u8 = 1;
const FLAG_LOCUTION: u8 = 1 << 1;
const FLAG_PUNCTUATION: u8 = 1 << 2;

/// In memory dictionary and positional postings for a single field.
/// Handy for small corpora, tests and benches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryIndex {
    pub field: String,
    pub version: u64,
    pub dictionary: HashMap<String, TermId>,
    pub forms: Vec<String>,
    pub tags: Vec<u8>,
    flags: Vec<u8>,
    pub occs: Vec<u64>,
    pub df: Vec<u32>,
    /// `None` for a deleted document
    pub docs: Vec<Option<Vec<(u32, TermId)>>>,
}

impl MemoryIndex {
    pub fn new(field: &str, version: u64) -> Self {
        Self {
            field: field.to_string(),
            version,
            forms: vec![String::new()],
            tags: vec![0],
            flags: vec![0],
            occs: vec![0],
            df: vec![0],
            ..Self::default()
        }
    }

    /// Dictionary of synthetic forms `w1…w{size-1}`, all with tag 0.
    pub fn with_size(field: &str, version: u64, size: usize) -> Self {
        let mut index = Self::new(field, version);
        for id in 1..size {
            index.add_form(&format!("w{id}"), 0);
        }
        index
    }

    pub fn add_form(&mut self, form: &str, tag: u8) -> TermId {
        if let Some(&id) = self.dictionary.get(form) {
            return id;
        }
        let id = self.forms.len() as TermId;
        self.dictionary.insert(form.to_string(), id);
        self.forms.push(form.to_string());
        self.tags.push(tag);
        self.flags.push(0);
        self.occs.push(0);
        self.df.push(0);
        id
    }

    pub fn set_tag(&mut self, id: TermId, tag: u8) { self.tags[id as usize] = tag; }
    pub fn set_stop(&mut self, id: TermId) { self.flags[id as usize] |= FLAG_STOP; }
    pub fn set_locution(&mut self, id: TermId) { self.flags[id as usize] |= FLAG_LOCUTION; }
    pub fn set_punctuation(&mut self, id: TermId) { self.flags[id as usize] |= FLAG_PUNCTUATION; }

    /// Append a document as a sequence of ids, `HOLE` leaves the position empty.
    pub fn add_doc_ids(&mut self, ids: &[TermId]) -> DocId {
        let positions = ids
            .iter()
            .enumerate()
            .filter(|&(_, &id)| id != HOLE)
            .map(|(pos, &id)| (pos as u32, id))
            .collect();
        self.add_doc_positions(positions)
    }

    /// Append a document as forms, unknown forms are added to the dictionary, `""` is a hole.
    pub fn add_doc_forms(&mut self, forms: &[&str]) -> DocId {
        let ids: Vec<TermId> = forms
            .iter()
            .map(|form| if form.is_empty() { HOLE } else { self.add_form(form, 0) })
            .collect();
        self.add_doc_ids(&ids)
    }

    /// Append raw positions, ids unknown to the dictionary are kept as is.
    pub fn add_doc_positions(&mut self, mut positions: Vec<(u32, TermId)>) -> DocId {
        positions.sort_unstable();
        let mut seen: Vec<TermId> = Vec::new();
        for &(_, id) in &positions {
            let idx = id as usize;
            if idx >= self.forms.len() {
                continue;
            }
            self.occs[idx] += 1;
            if !seen.contains(&id) {
                seen.push(id);
                self.df[idx] += 1;
            }
        }
        let doc_id = self.docs.len() as DocId;
        self.docs.push(if positions.is_empty() { None } else { Some(positions) });
        doc_id
    }

    pub fn add_deleted(&mut self) -> DocId {
        let doc_id = self.docs.len() as DocId;
        self.docs.push(None);
        doc_id
    }

    /// Start a new generation of the corpus.
    pub fn bump_version(&mut self) { self.version += 1; }

    fn flag(&self, id: TermId, mask: u8) -> bool {
        self.flags.get(id as usize).map_or(false, |f| f & mask != 0)
    }
}

impl TermDictionary for MemoryIndex {
    fn size(&self) -> usize { self.forms.len() }

    fn id_of(&self, form: &str) -> Option<TermId> { self.dictionary.get(form).copied() }

    fn form(&self, id: TermId) -> Option<&str> {
        if id == HOLE {
            return None;
        }
        self.forms.get(id as usize).map(String::as_str)
    }

    fn tag(&self, id: TermId) -> u8 { self.tags.get(id as usize).copied().unwrap_or(0) }
    fn is_stop(&self, id: TermId) -> bool { self.flag(id, FLAG_STOP) }
    fn is_locution(&self, id: TermId) -> bool { self.flag(id, FLAG_LOCUTION) }
    fn is_punctuation(&self, id: TermId) -> bool { self.flag(id, FLAG_PUNCTUATION) }
    fn occs(&self, id: TermId) -> u64 { self.occs.get(id as usize).copied().unwrap_or(0) }
    fn docs(&self, id: TermId) -> u32 { self.df.get(id as usize).copied().unwrap_or(0) }
    fn occs_all(&self) -> u64 { self.occs.iter().sum() }
    fn docs_all(&self) -> u32 { self.docs.iter().filter(|d| d.is_some()).count() as u32 }
}

impl PositionalPostings for MemoryIndex {
    fn version(&self) -> u64 { self.version }

    fn max_doc(&self) -> u32 { self.docs.len() as u32 }

    fn has_positions(&self, field: &str) -> bool { field == self.field }

    fn positions(&self, doc_id: DocId, field: &str) -> anyhow::Result<Option<Vec<(u32, TermId)>>> {
        anyhow::ensure!(field == self.field, "no positions for field {field:?}");
        Ok(self.docs.get(doc_id as usize).cloned().flatten())
    }

    fn max_position(&self, doc_id: DocId, field: &str) -> anyhow::Result<Option<u32>> {
        anyhow::ensure!(field == self.field, "no positions for field {field:?}");
        Ok(self
            .docs
            .get(doc_id as usize)
            .and_then(|d| d.as_ref())
            .and_then(|positions| positions.last().map(|&(pos, _)| pos)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_occs_and_docs() {
        let mut index = MemoryIndex::new("text", 1);
        index.add_doc_forms(&["le", "chat", "", "le", "chien"]);
        index.add_doc_forms(&["le", "loup"]);
        index.add_deleted();
        let le = index.id_of("le").unwrap();
        assert_eq!(index.occs(le), 3);
        assert_eq!(index.docs(le), 2);
        assert_eq!(index.occs_all(), 6);
        assert_eq!(index.docs_all(), 2);
        assert_eq!(index.max_doc(), 3);
        assert_eq!(index.max_position(0, "text").unwrap(), Some(4));
        assert_eq!(index.max_position(2, "text").unwrap(), None);
        assert!(index.positions(0, "other").is_err());
    }

    #[test]
    fn hole_has_no_form() {
        let index = MemoryIndex::with_size("text", 1, 4);
        assert_eq!(index.size(), 4);
        assert_eq!(index.form(HOLE), None);
        assert_eq!(index.form(3), Some("w3"));
        assert_eq!(index.id_of("w2"), Some(2));
    }
}
