//! Location set of a topology object.
//!
//! A growable bitmap of processing-unit indexes. Two sets compare equal
//! when they contain the same bits, regardless of how many trailing zero
//! words either one carries.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

const WORD_BITS: u32 = u64::BITS;

/// Set of elementary processing units covered by an object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuSet {
    words: SmallVec<[u64; 2]>,
}

impl CpuSet {
    /// Empty set.
    pub fn new() -> Self {
        Self { words: SmallVec::new() }
    }

    /// Set containing every index in `range`.
    pub fn from_range(range: Range<u32>) -> Self {
        let mut set = Self::new();
        for idx in range {
            set.set(idx);
        }
        set
    }

    /// Set containing exactly the given indexes.
    pub fn from_indexes(indexes: impl IntoIterator<Item = u32>) -> Self {
        let mut set = Self::new();
        for idx in indexes {
            set.set(idx);
        }
        set
    }

    pub fn set(&mut self, idx: u32) {
        let word = (idx / WORD_BITS) as usize;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (idx % WORD_BITS);
    }

    pub fn is_set(&self, idx: u32) -> bool {
        let word = (idx / WORD_BITS) as usize;
        self.words
            .get(word)
            .is_some_and(|w| w & (1u64 << (idx % WORD_BITS)) != 0)
    }

    /// In-place union.
    pub fn union_with(&mut self, other: &CpuSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= o;
        }
    }

    /// True if every bit of `self` is also set in `other`.
    pub fn is_included_in(&self, other: &CpuSet) -> bool {
        self.words.iter().enumerate().all(|(i, w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    pub fn intersects(&self, other: &CpuSet) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Number of set bits.
    pub fn weight(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Lowest set index, if any.
    pub fn first(&self) -> Option<u32> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i as u32 * WORD_BITS + w.trailing_zeros())
    }

    /// Set indexes in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &w)| {
            (0..WORD_BITS)
                .filter(move |b| w & (1u64 << b) != 0)
                .map(move |b| i as u32 * WORD_BITS + b)
        })
    }

    fn significant_words(&self) -> &[u64] {
        let len = self
            .words
            .iter()
            .rposition(|w| *w != 0)
            .map_or(0, |p| p + 1);
        &self.words[..len]
    }
}

impl PartialEq for CpuSet {
    fn eq(&self, other: &Self) -> bool {
        self.significant_words() == other.significant_words()
    }
}

impl Eq for CpuSet {}

/// Compact list form: `0-3,8,10-11`. The empty set prints as `empty`.
impl fmt::Display for CpuSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("empty");
        }
        let mut first = true;
        let mut iter = self.iter().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end += 1;
                iter.next();
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}-{end}")?;
            }
        }
        Ok(())
    }
}
