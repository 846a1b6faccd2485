//! Statistical laws comparing the frequency observed for a form with chance.
//!
//! A [`Distrib`] is set up once per form (`idf()`, `expectation()`), then
//! `score()` is accumulated over the documents of the form. For the laws
//! where `Σ observed = Σ expected = N` matters (G-test, Chi²), `last()` adds
//! the residual mass outside the scanned documents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{BM25_B, BM25_K1, TFIDF_K};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Law {
    Bm25,
    /// Chi² = Σ(Oi - Ei)²/Ei
    Chi2,
    /// Occurrences found relative to the document size.
    Freq,
    /// Log-likelihood, G = 2 Σ(Oi.ln(Oi/Ei))
    G,
    /// Raw count of occurrences found.
    Occs,
    TfIdf,
}

impl Law {
    pub const ALL: [Law; 6] = [Law::Bm25, Law::Chi2, Law::Freq, Law::G, Law::Occs, Law::TfIdf];

    pub fn name(&self) -> &'static str {
        match self {
            Law::Bm25 => "bm25",
            Law::Chi2 => "chi2",
            Law::Freq => "freq",
            Law::G => "g",
            Law::Occs => "occs",
            Law::TfIdf => "tfidf",
        }
    }
}

impl fmt::Display for Law {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Law {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Law::ALL
            .into_iter()
            .find(|law| law.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown distribution law {s:?}"))
    }
}

/// A law with the constants of the form being scored.
#[derive(Debug, Clone, Copy)]
pub struct Distrib {
    law: Law,
    idf: f64,
    expectation: f64,
    doc_avg: f64,
}

impl Distrib {
    pub fn new(law: Law) -> Self {
        Self { law, idf: 0.0, expectation: 0.0, doc_avg: 0.0 }
    }

    pub fn law(&self) -> Law { self.law }

    /// Set the inverse document frequency of a form, no-op for laws without one.
    pub fn idf(&mut self, hits: f64, docs_all: f64, occs_all: f64) {
        match self.law {
            Law::Bm25 => {
                self.doc_avg = occs_all / docs_all;
                self.idf = (1.0 + (docs_all - hits + 0.5) / (hits + 0.5)).ln();
            }
            Law::TfIdf => {
                let to_pow = 1.0 + ((docs_all + 1.0) / (hits + 1.0)).ln();
                self.idf = to_pow * to_pow;
            }
            _ => {}
        }
    }

    /// Set the expected probability of a form, `occs_all == 0` keeps the previous one.
    pub fn expectation(&mut self, form_occs: f64, occs_all: f64) {
        if occs_all == 0.0 {
            return;
        }
        self.expectation = form_occs / occs_all;
    }

    /// Score of a form for a document, `freq` occurrences among `doc_len`.
    pub fn score(&self, freq: f64, doc_len: f64) -> f64 {
        match self.law {
            Law::Bm25 => {
                self.idf * (freq * (BM25_K1 + 1.0))
                    / (freq + BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len / self.doc_avg))
            }
            Law::Chi2 => {
                if freq < 1.0 || doc_len < 1.0 {
                    return 0.0;
                }
                let expected = self.expectation * doc_len;
                let diff = freq - expected;
                diff * diff / expected
            }
            Law::Freq => freq / doc_len,
            Law::G => {
                if freq < 1.0 || doc_len < 1.0 {
                    return 0.0;
                }
                let expected = self.expectation * doc_len;
                // negative when under-represented
                2.0 * freq * (freq / expected).ln()
            }
            Law::Occs => freq,
            Law::TfIdf => self.idf * (TFIDF_K + (1.0 - TFIDF_K) * freq / doc_len),
        }
    }

    /// Close the sum of a form with the occurrences outside the scanned documents.
    pub fn last(&self, rest_freq: f64, rest_len: f64) -> f64 {
        match self.law {
            Law::Chi2 | Law::G => self.score(rest_freq, rest_len),
            _ => 0.0,
        }
    }
}

impl From<Law> for Distrib {
    fn from(law: Law) -> Self { Distrib::new(law) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

    #[test]
    fn names_round_trip() {
        for law in Law::ALL {
            assert_eq!(law.name().parse::<Law>().unwrap(), law);
        }
        assert_eq!("TFIDF".parse::<Law>().unwrap(), Law::TfIdf);
        assert!("fisher".parse::<Law>().is_err());
        assert_eq!(serde_json::to_string(&Law::Chi2).unwrap(), "\"chi2\"");
    }

    #[test]
    fn bm25() {
        let mut d = Distrib::new(Law::Bm25);
        d.idf(10.0, 100.0, 10_000.0);
        let idf = (1.0f64 + 90.5 / 10.5).ln();
        let expected = idf * (3.0 * 2.2) / (3.0 + 1.2 * (0.25 + 0.75 * 50.0 / 100.0));
        assert!(close(d.score(3.0, 50.0), expected));
        assert_eq!(d.last(5.0, 100.0), 0.0);
    }

    #[test]
    fn tfidf() {
        let mut d = Distrib::new(Law::TfIdf);
        d.idf(9.0, 99.0, 0.0);
        let idf = (1.0 + (10.0f64).ln()).powi(2);
        assert!(close(d.score(2.0, 10.0), idf * (0.2 + 0.8 * 0.2)));
    }

    #[test]
    fn chi2_and_g() {
        let mut chi2 = Distrib::new(Law::Chi2);
        chi2.expectation(10.0, 1000.0);
        // expected = 0.01 * 200 = 2
        assert!(close(chi2.score(4.0, 200.0), 2.0));
        assert_eq!(chi2.score(0.0, 200.0), 0.0);
        assert_eq!(chi2.score(4.0, 0.0), 0.0);
        assert!(close(chi2.last(4.0, 200.0), 2.0));

        let mut g = Distrib::new(Law::G);
        g.expectation(10.0, 1000.0);
        assert!(close(g.score(4.0, 200.0), 8.0 * 2f64.ln()));
        assert!(g.score(1.0, 200.0) < 0.0);
    }

    #[test]
    fn raw_counts() {
        let d = Distrib::new(Law::Occs);
        assert_eq!(d.score(7.0, 100.0), 7.0);
        let d = Distrib::new(Law::Freq);
        assert!(close(d.score(7.0, 100.0), 0.07));
    }

    #[test]
    fn expectation_ignores_empty_corpus() {
        let mut d = Distrib::new(Law::Chi2);
        d.expectation(1.0, 10.0);
        d.expectation(1.0, 0.0);
        assert!(close(d.score(2.0, 10.0), 1.0));
    }

    /// Σ score(observed parts) + last(residual) equals the same sum computed in one
    /// pass over all the parts, and the parts exhaust both observed and expected mass.
    #[test]
    fn residual_mass_is_consistent() {
        let occs_all = 1000.0;
        let form_occs = 40.0;
        // (freq, len) for the scanned documents
        let parts = [(5.0, 100.0), (3.0, 50.0), (12.0, 150.0)];
        let scanned_freq: f64 = parts.iter().map(|p| p.0).sum();
        let scanned_len: f64 = parts.iter().map(|p| p.1).sum();
        let rest = (form_occs - scanned_freq, occs_all - scanned_len);

        for law in [Law::G, Law::Chi2] {
            let mut d = Distrib::new(law);
            d.expectation(form_occs, occs_all);
            let partitioned: f64 = parts.iter().map(|&(f, l)| d.score(f, l)).sum::<f64>() + d.last(rest.0, rest.1);

            let e = form_occs / occs_all;
            let mut single = 0.0;
            let mut observed = 0.0;
            let mut expected = 0.0;
            for &(f, l) in parts.iter().chain(std::iter::once(&rest)) {
                let ei = e * l;
                observed += f;
                expected += ei;
                single += match law {
                    Law::G => 2.0 * f * (f / ei).ln(),
                    _ => (f - ei) * (f - ei) / ei,
                };
            }
            assert!((partitioned - single).abs() < 1e-9, "{law}");
            assert!((observed - form_occs).abs() < 1e-9);
            assert!((expected - form_occs).abs() < 1e-9);
        }
    }
}
