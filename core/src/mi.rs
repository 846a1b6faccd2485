//! Association measures between two forms a and b, from the counts
//! `Oab` (co-occurrences), `Oa`, `Ob` (occurrences) and `N` (all events).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::PPMI_K;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mi {
    /// Oab
    Occs,
    /// Oab / (Oa + Ob - Oab)
    Jaccard,
    /// 2.Oab / (Oa + Ob)
    Dice,
    /// 14 + log2(dice)
    DiceLog,
    /// Normalized positive pointwise mutual information.
    Ppmi,
    /// Chi² on the 2×2 contingency table, negative when a and b repel.
    Chi2,
    /// Log-likelihood on the 2×2 contingency table.
    G,
}

impl Mi {
    pub const ALL: [Mi; 7] = [Mi::Occs, Mi::Jaccard, Mi::Dice, Mi::DiceLog, Mi::Ppmi, Mi::Chi2, Mi::G];

    pub fn name(&self) -> &'static str {
        match self {
            Mi::Occs => "occs",
            Mi::Jaccard => "jaccard",
            Mi::Dice => "dice",
            Mi::DiceLog => "dicelog",
            Mi::Ppmi => "ppmi",
            Mi::Chi2 => "chi2",
            Mi::G => "g",
        }
    }

    pub fn score(&self, oab: f64, oa: f64, ob: f64, n: f64) -> f64 {
        match self {
            Mi::Occs => oab,
            Mi::Jaccard => oab / (oa - oab + ob - oab + oab),
            Mi::Dice => 2.0 * oab / (oa + ob),
            Mi::DiceLog => 14.0 + (2.0 * oab / (oa + ob)).log2(),
            Mi::Ppmi => {
                if oa <= PPMI_K || ob <= PPMI_K || oab <= PPMI_K {
                    return 0.0;
                }
                let pmi = (((oab + PPMI_K) / n) / ((oa / n) * (ob / n))).ln();
                if pmi < 0.0 {
                    return 0.0;
                }
                pmi / -(oab / n).ln()
            }
            Mi::Chi2 => {
                let e = expected(oa, ob, n);
                let o = observed(oab, oa, ob, n);
                let sum: f64 = o
                    .iter()
                    .zip(e.iter())
                    .filter(|&(&oi, _)| oi != 0.0)
                    .map(|(&oi, &ei)| (oi - ei) * (oi - ei) / ei)
                    .sum();
                if oab < e[0] {
                    -sum
                } else {
                    sum
                }
            }
            Mi::G => {
                let e = expected(oa, ob, n);
                let o = observed(oab, oa, ob, n);
                let sum: f64 = o
                    .iter()
                    .zip(e.iter())
                    .filter(|&(&oi, _)| oi != 0.0)
                    .map(|(&oi, &ei)| oi * (oi / ei).ln())
                    .sum();
                2.0 * sum
            }
        }
    }
}

/// {Eab, Ea¬b, E¬ab, E¬a¬b}, summing to N.
fn expected(oa: f64, ob: f64, n: f64) -> [f64; 4] {
    [oa * ob / n, oa * (n - ob) / n, ob * (n - oa) / n, (n - oa) * (n - ob) / n]
}

/// {Oab, Oa¬b, O¬ab, O¬a¬b}, summing to N.
fn observed(oab: f64, oa: f64, ob: f64, n: f64) -> [f64; 4] {
    [oab, oa - oab, ob - oab, n - oa - ob + oab]
}

impl fmt::Display for Mi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Mi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mi::ALL
            .into_iter()
            .find(|mi| mi.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown association measure {s:?}"))
    }
}
