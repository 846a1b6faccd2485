//! Windowed scans of a rail around pivot forms, and frequency lists of a document subset.

use roaring::RoaringBitmap;

use crate::bits::StampSet;
use crate::corpus::Corpus;
use crate::distrib::{Distrib, Law};
use crate::errors::{check_window, Error, Result};
use crate::form_enum::FormEnum;
use crate::index::{DocId, TermId, HOLE};
use crate::rail::Rail;

/// Sorted set of pivot ids, without duplicates.
pub(crate) fn pivot_lookup(pivots: &[TermId]) -> Result<Vec<TermId>> {
    let mut lookup = pivots.to_vec();
    lookup.sort_unstable();
    lookup.dedup();
    if lookup.is_empty() {
        return Err(Error::NoPivots);
    }
    Ok(lookup)
}

impl Rail {
    /// Positions of the pivots, ordered by document then position.
    pub fn positions(&self, pivots: &[TermId], doc_filter: Option<&RoaringBitmap>) -> Vec<(DocId, u32)> {
        let mut found = Vec::new();
        for (doc_id, ids) in self.docs(doc_filter) {
            for (pos, id) in ids.iter().enumerate() {
                if *id != HOLE && pivots.binary_search(id).is_ok() {
                    found.push((doc_id, pos as u32));
                }
            }
        }
        found
    }

    /// Count the forms found in a context of `left` and `right` positions around the pivots.
    ///
    /// A form is counted once by context. When two contexts overlap, the
    /// positions already scanned for a previous pivot of the same document are
    /// not scanned again, whatever the pivot. Pivots are counted at their own
    /// position, never as co-occurrents.
    pub fn coocs(
        &self,
        corpus: &Corpus,
        pivots: &[TermId],
        left: usize,
        right: usize,
        doc_filter: Option<&RoaringBitmap>,
    ) -> Result<FormEnum> {
        check_window(left, right)?;
        let lookup = pivot_lookup(pivots)?;
        let max_form = corpus.max_form();
        let mut forms = FormEnum::new(max_form);
        let mut form_by_doc = StampSet::new(max_form);
        let mut form_by_context = StampSet::new(max_form);

        let mut doc_last: Option<DocId> = None;
        let mut to_last: usize = 0; // end of the last context, exclusive
        for (doc_id, pos) in self.positions(&lookup, doc_filter) {
            let ids = self.slice(doc_id as usize);
            if doc_last != Some(doc_id) {
                form_by_doc.clear();
                to_last = 0;
                forms.hits_all += 1;
                doc_last = Some(doc_id);
            }
            let pos = pos as usize;
            let Some(&pivot) = ids.get(pos).filter(|&&id| (id as usize) < max_form) else {
                continue;
            };
            forms.freq[pivot as usize] += 1;
            if form_by_doc.insert(pivot) {
                forms.hits[pivot as usize] += 1;
            }

            let from = pos.saturating_sub(left).max(to_last);
            let to = ids.len().min(pos.saturating_add(1).saturating_add(right));
            to_last = to.max(to_last);
            form_by_context.clear();
            for &id in ids.get(from..to).unwrap_or(&[]) {
                if id == HOLE || id as usize >= max_form || lookup.binary_search(&id).is_ok() {
                    continue;
                }
                // already seen in this context (ex: le, un…)
                if !form_by_context.insert(id) {
                    continue;
                }
                forms.freq[id as usize] += 1;
                forms.freq_all += 1;
                if form_by_doc.insert(id) {
                    forms.hits[id as usize] += 1;
                }
            }
        }
        Ok(forms)
    }

    /// Occurrences by term id for a subset of documents, holes are counted at index 0.
    pub fn freqs(&self, corpus: &Corpus, doc_filter: Option<&RoaringBitmap>) -> Vec<u64> {
        let mut freqs = vec![0u64; corpus.max_form()];
        for (_, ids) in self.docs(doc_filter) {
            for &id in ids {
                if let Some(freq) = freqs.get_mut(id as usize) {
                    *freq += 1;
                }
            }
        }
        freqs
    }

    /// Occurrences and documents by form for a subset of documents, holes excluded.
    pub fn forms(&self, corpus: &Corpus, doc_filter: Option<&RoaringBitmap>) -> FormEnum {
        let max_form = corpus.max_form();
        let mut forms = FormEnum::new(max_form);
        let mut form_by_doc = StampSet::new(max_form);
        for (_, ids) in self.docs(doc_filter) {
            form_by_doc.clear();
            forms.hits_all += 1;
            for &id in ids {
                if id == HOLE || id as usize >= max_form {
                    continue;
                }
                forms.freq[id as usize] += 1;
                forms.freq_all += 1;
                if form_by_doc.insert(id) {
                    forms.hits[id as usize] += 1;
                }
            }
        }
        forms
    }

    /// Score every form of a document subset with a law, document by document.
    /// For each form, scores are summed over the documents where it appears,
    /// then the occurrences outside the subset are added with `Distrib::last()`.
    /// Document sizes are counted in tokens, holes excluded.
    pub fn score_forms(&self, corpus: &Corpus, doc_filter: Option<&RoaringBitmap>, law: Law) -> FormEnum {
        let dic = corpus.dic();
        let docs_all = dic.docs_all() as f64;
        let occs_all = dic.occs_all() as f64;
        let max_form = corpus.max_form();
        let mut forms = self.forms(corpus, doc_filter);
        let mut scores = vec![0.0f64; max_form];
        let mut distrib = Distrib::new(law);
        let mut doc_freq = vec![0u64; max_form];
        let mut doc_forms: Vec<TermId> = Vec::new();
        let mut part_len = 0u64;
        for (_, ids) in self.docs(doc_filter) {
            doc_forms.clear();
            let mut tokens = 0u64;
            for &id in ids {
                if id == HOLE || id as usize >= max_form {
                    continue;
                }
                tokens += 1;
                if doc_freq[id as usize] == 0 {
                    doc_forms.push(id);
                }
                doc_freq[id as usize] += 1;
            }
            part_len += tokens;
            let doc_len = tokens as f64;
            for &id in &doc_forms {
                distrib.idf(dic.docs(id) as f64, docs_all, occs_all);
                distrib.expectation(dic.occs(id) as f64, occs_all);
                scores[id as usize] += distrib.score(doc_freq[id as usize] as f64, doc_len);
                doc_freq[id as usize] = 0;
            }
        }
        let rest_len = (occs_all - part_len as f64).max(0.0);
        for id in forms.iter() {
            distrib.idf(dic.docs(id) as f64, docs_all, occs_all);
            distrib.expectation(dic.occs(id) as f64, occs_all);
            let rest_freq = dic.occs(id).saturating_sub(forms.freq(id)) as f64;
            scores[id as usize] += distrib.last(rest_freq, rest_len);
        }
        forms.score = Some(scores);
        forms
    }
}
