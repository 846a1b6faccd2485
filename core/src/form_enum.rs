use crate::corpus::Corpus;
use crate::distrib::{Distrib, Law};
use crate::index::TermId;
use crate::mi::Mi;

/// Counts by form for one query, vectors indexed by term id.
#[derive(Debug, Clone, Default)]
pub struct FormEnum {
    pub(crate) freq: Vec<u64>,
    pub(crate) hits: Vec<u32>,
    pub(crate) score: Option<Vec<f64>>,
    pub(crate) freq_all: u64,
    pub(crate) hits_all: u32,
}

impl FormEnum {
    pub fn new(max_form: usize) -> Self {
        Self { freq: vec![0; max_form], hits: vec![0; max_form], ..Self::default() }
    }

    /// Size of the vectors, the dictionary size.
    pub fn len(&self) -> usize { self.freq.len() }

    pub fn is_empty(&self) -> bool { self.freq.is_empty() }

    /// Occurrences found for a form.
    pub fn freq(&self, id: TermId) -> u64 { self.freq.get(id as usize).copied().unwrap_or(0) }

    /// Documents where the form was found.
    pub fn hits(&self, id: TermId) -> u32 { self.hits.get(id as usize).copied().unwrap_or(0) }

    pub fn score(&self, id: TermId) -> Option<f64> {
        self.score.as_ref().and_then(|s| s.get(id as usize).copied())
    }

    pub fn freq_all(&self) -> u64 { self.freq_all }

    pub fn hits_all(&self) -> u32 { self.hits_all }

    pub fn freqs(&self) -> &[u64] { &self.freq }

    pub fn scores(&self) -> Option<&[f64]> { self.score.as_deref() }

    /// Count of forms found at least once.
    pub fn cardinality(&self) -> usize { self.freq.iter().filter(|&&f| f > 0).count() }

    /// Forms found, in id order.
    pub fn iter(&self) -> impl Iterator<Item = TermId> + '_ {
        self.freq.iter().enumerate().filter(|&(_, &f)| f > 0).map(|(id, _)| id as TermId)
    }

    /// Score the found forms as a single document of `freq_all` occurrences.
    pub fn score_distrib(&mut self, corpus: &Corpus, law: Law) -> &mut Self {
        let dic = corpus.dic();
        let docs_all = dic.docs_all() as f64;
        let occs_all = dic.occs_all() as f64;
        let mut distrib = Distrib::new(law);
        let mut scores = vec![0.0; self.freq.len()];
        for (id, &freq) in self.freq.iter().enumerate() {
            if freq < 1 {
                continue;
            }
            let id = id as TermId;
            distrib.idf(dic.docs(id) as f64, docs_all, occs_all);
            distrib.expectation(dic.occs(id) as f64, occs_all);
            scores[id as usize] = distrib.score(freq as f64, self.freq_all as f64);
        }
        self.score = Some(scores);
        self
    }

    /// Score co-occurrents of pivots with an association measure.
    /// `Oab` is the freq of a form, capped to `Ob` the occurrences of the pivots,
    /// because a frequent word may be repeated in a large context.
    pub fn score_mi(&mut self, corpus: &Corpus, mi: Mi, pivots: &[TermId]) -> &mut Self {
        let n = corpus.dic().occs_all() as f64;
        let ob: u64 = pivots.iter().map(|&id| corpus.occs(id)).sum();
        let mut scores = vec![0.0; self.freq.len()];
        for (id, &freq) in self.freq.iter().enumerate() {
            if freq == 0 {
                continue;
            }
            let oab = freq.min(ob);
            let oa = corpus.occs(id as TermId);
            scores[id] = mi.score(oab as f64, oa as f64, ob as f64, n);
        }
        self.score = Some(scores);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use std::sync::Arc;

    #[test]
    fn accessors_out_of_range() {
        let forms = FormEnum::new(3);
        assert_eq!(forms.len(), 3);
        assert_eq!(forms.freq(10), 0);
        assert_eq!(forms.hits(10), 0);
        assert_eq!(forms.score(1), None);
        assert_eq!(forms.cardinality(), 0);
    }

    #[test]
    fn occs_score_is_freq() {
        let mut index = MemoryIndex::with_size("text", 1, 4);
        index.add_doc_ids(&[1, 2, 3, 1]);
        let corpus = Corpus::from_index("text", Arc::new(index));
        let mut forms = FormEnum::new(4);
        forms.freq[1] = 2;
        forms.freq[3] = 1;
        forms.freq_all = 3;
        forms.score_distrib(&corpus, Law::Occs);
        assert_eq!(forms.score(1), Some(2.0));
        assert_eq!(forms.score(2), Some(0.0));
        assert_eq!(forms.iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn mi_caps_by_pivot_occs() {
        let mut index = MemoryIndex::with_size("text", 1, 3);
        index.add_doc_ids(&[1, 2, 2, 2]);
        let corpus = Corpus::from_index("text", Arc::new(index));
        let mut forms = FormEnum::new(3);
        forms.freq[2] = 3;
        forms.score_mi(&corpus, Mi::Occs, &[1]);
        assert_eq!(forms.score(2), Some(1.0));
    }
}
