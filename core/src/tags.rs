//! Filters on the grammatical tags of forms.
//!
//! A tag is a byte. `[0x00, 0x0F]` are control tags driving the filter
//! (stop words, locutions), `[0x10, 0xFF]` are information tags carried by
//! the dictionary, grouped by their high nibble (ex: `0x20` verbs, `0x21`
//! auxiliaries…).

use std::fmt;

use crate::bits::FormSet;
use crate::index::{TermDictionary, TermId};

/// Accept stop words, whatever their tag.
pub const STOP: u8 = 0x01;
/// Refuse stop words; alone, accept every other form.
pub const NOSTOP: u8 = 0x02;
/// Accept locutions, whatever their tag.
pub const LOC: u8 = 0x03;

/// Punctuation group.
pub const PUN: u8 = 0xF0;
pub const PUN_SECTION: u8 = 0xF1;
pub const PUN_PARA: u8 = 0xF2;
pub const PUN_SENT: u8 = 0xF3;

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct TagFilter {
    rule: [u64; 4],
}

impl TagFilter {
    pub fn new() -> Self { Self::default() }

    pub fn of(tags: &[u8]) -> Self {
        let mut filter = Self::new();
        for &tag in tags {
            filter.set(tag);
        }
        filter
    }

    pub fn set(&mut self, tag: u8) -> &mut Self {
        self.rule[(tag >> 6) as usize] |= 1 << (tag & 63);
        self
    }

    pub fn clear(&mut self, tag: u8) -> &mut Self {
        self.rule[(tag >> 6) as usize] &= !(1 << (tag & 63));
        self
    }

    /// Set the 16 tags sharing the high nibble of `tag`.
    pub fn set_group(&mut self, tag: u8) -> &mut Self {
        let start = tag & 0xF0;
        for t in start..=(start | 0x0F) {
            self.set(t);
        }
        self
    }

    pub fn clear_group(&mut self, tag: u8) -> &mut Self {
        let start = tag & 0xF0;
        for t in start..=(start | 0x0F) {
            self.clear(t);
        }
        self
    }

    pub fn set_all(&mut self) -> &mut Self {
        self.rule = [u64::MAX; 4];
        self
    }

    pub fn clear_all(&mut self) -> &mut Self {
        self.rule = [0; 4];
        self
    }

    #[inline]
    pub fn get(&self, tag: u8) -> bool { self.rule[(tag >> 6) as usize] & (1 << (tag & 63)) != 0 }

    pub fn cardinality(&self) -> usize { self.rule.iter().map(|w| w.count_ones() as usize).sum() }

    pub fn has_info_tag(&self) -> bool { (0x10..=0xFF).any(|t| self.get(t)) }

    pub fn has_control_tag(&self) -> bool { (0x00..=0x0F).any(|t| self.get(t)) }

    /// Resolve the filter against a dictionary, the hole is never accepted.
    pub fn forms(&self, dic: &dyn TermDictionary) -> FormSet {
        let size = dic.size();
        let mut forms = FormSet::new(size);
        let stop = self.get(STOP);
        let no_stop = self.get(NOSTOP);
        let loc = self.get(LOC);
        let has_tags = self.has_info_tag();
        for id in 1..size as TermId {
            if stop {
                if dic.is_stop(id) {
                    forms.insert(id);
                    continue;
                }
            } else if no_stop {
                if dic.is_stop(id) {
                    continue;
                }
                if !has_tags {
                    forms.insert(id);
                    continue;
                }
            }
            if loc && dic.is_locution(id) {
                forms.insert(id);
                continue;
            }
            if self.get(dic.tag(id)) {
                forms.insert(id);
            }
        }
        forms
    }
}

impl fmt::Debug for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries((0..=255u8).filter(|&t| self.get(t)).map(|t| format!("{t:#04x}"))).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;

    const NOUN: u8 = 0x30;
    const VERB: u8 = 0x20;
    const AUX: u8 = 0x21;

    fn dic() -> MemoryIndex {
        let mut index = MemoryIndex::new("text", 1);
        index.add_form("le", 0x60);
        index.add_form("chat", NOUN);
        index.add_form("mange", VERB);
        index.add_form("a", AUX);
        index.add_form("pomme de terre", NOUN);
        index.set_stop(1);
        index.set_stop(4);
        index.set_locution(5);
        index
    }

    #[test]
    fn groups() {
        let mut filter = TagFilter::new();
        filter.set_group(AUX);
        assert!(filter.get(VERB));
        assert!(filter.get(0x2F));
        assert!(!filter.get(NOUN));
        assert_eq!(filter.cardinality(), 16);
        filter.clear_group(VERB);
        assert_eq!(filter.cardinality(), 0);
    }

    #[test]
    fn info_and_control() {
        let filter = TagFilter::of(&[NOSTOP]);
        assert!(filter.has_control_tag());
        assert!(!filter.has_info_tag());
    }

    #[test]
    fn by_tag() {
        let index = dic();
        let forms = TagFilter::of(&[NOUN]).forms(&index);
        assert_eq!(forms.iter().collect::<Vec<_>>(), vec![2, 5]);
    }

    #[test]
    fn no_stop_alone_accepts_others() {
        let index = dic();
        let forms = TagFilter::of(&[NOSTOP]).forms(&index);
        assert_eq!(forms.iter().collect::<Vec<_>>(), vec![2, 3, 5]);
    }

    #[test]
    fn no_stop_with_tags() {
        let index = dic();
        let forms = TagFilter::of(&[NOSTOP, VERB, AUX]).forms(&index);
        assert_eq!(forms.iter().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn stop_and_locutions() {
        let index = dic();
        let forms = TagFilter::of(&[STOP, LOC]).forms(&index);
        assert_eq!(forms.iter().collect::<Vec<_>>(), vec![1, 4, 5]);
    }
}
