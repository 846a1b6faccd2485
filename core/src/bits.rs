//! Bit sets over term ids.

use crate::index::TermId;

/// Fixed size bit set over term ids, used as a form filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSet {
    words: Vec<u64>,
    len: usize,
}

impl FormSet {
    pub fn new(len: usize) -> Self {
        Self { words: vec![0; len.div_ceil(64)], len }
    }

    /// All ids in `[1, len)`, the hole excluded.
    pub fn full(len: usize) -> Self {
        let mut set = Self::new(len);
        for id in 1..len {
            set.insert(id as TermId);
        }
        set
    }

    pub fn from_ids(len: usize, ids: &[TermId]) -> Self {
        let mut set = Self::new(len);
        for &id in ids {
            set.insert(id);
        }
        set
    }

    /// Capacity in ids.
    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.words.iter().all(|&w| w == 0) }

    /// Ids outside capacity are ignored.
    pub fn insert(&mut self, id: TermId) {
        let idx = id as usize;
        if idx < self.len {
            self.words[idx >> 6] |= 1 << (idx & 63);
        }
    }

    pub fn remove(&mut self, id: TermId) {
        let idx = id as usize;
        if idx < self.len {
            self.words[idx >> 6] &= !(1 << (idx & 63));
        }
    }

    #[inline]
    pub fn contains(&self, id: TermId) -> bool {
        let idx = id as usize;
        idx < self.len && self.words[idx >> 6] & (1 << (idx & 63)) != 0
    }

    pub fn count(&self) -> usize { self.words.iter().map(|w| w.count_ones() as usize).sum() }

    /// Set ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TermId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros();
                w &= w - 1;
                Some((i as u32) * 64 + bit)
            })
        })
    }
}

/// Set of ids cleared in O(1): each `clear()` opens a new generation instead of zeroing.
#[derive(Debug)]
pub struct StampSet {
    data: Vec<u32>,
    generation: u32,
}

impl StampSet {
    pub fn new(capacity: usize) -> Self {
        Self { data: vec![0; capacity], generation: 1 }
    }

    pub fn clear(&mut self) {
        if self.generation == u32::MAX {
            self.data.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    /// Returns `true` if `id` was not yet in the set.
    #[inline]
    pub fn insert(&mut self, id: TermId) -> bool {
        let slot = &mut self.data[id as usize];
        if *slot == self.generation {
            false
        } else {
            *slot = self.generation;
            true
        }
    }

    #[inline]
    pub fn contains(&self, id: TermId) -> bool { self.data[id as usize] == self.generation }
}
