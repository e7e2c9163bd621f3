//! Block-matching similarity ratio.
//!
//! `ratio = 2 * M / (len(a) + len(b))` where `M` is the total size of the blocks found by
//! repeatedly taking the longest common contiguous run and recursing on both unmatched
//! sides. Lengths are counted in chars.

use logtriage_normalizer::{CacheStats, MemoCache};
use std::cmp::Ordering;

/// Similarity of two strings in `[0, 1]`.
///
/// Operands are put in lexicographic order before scoring, which makes the ratio exactly
/// symmetric; among equally long blocks the one starting earliest in the smaller operand
/// wins. Two empty strings score 1.0, one empty string scores 0.0.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    let (left, right) = ordered(a, b);
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();

    let total = left.len() + right.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_chars(&left, &right);
    (2 * matched) as f64 / total as f64
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    match a.cmp(b) {
        Ordering::Greater => (b, a),
        _ => (a, b),
    }
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut rows = RunRows::default();
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = rows.longest_block(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Scratch rows for the run-length table, reused across every block search of one ratio.
///
/// `prev[o + 1]` is the length of the common run ending at `a[i - 1]` and `b[blo + o]`;
/// slot 0 stays zero so runs never extend past `blo`.
#[derive(Default)]
struct RunRows {
    prev: Vec<usize>,
    curr: Vec<usize>,
}

impl RunRows {
    /// Longest common run of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
    /// The first run found (earliest end in `a`, then in `b`) wins ties.
    fn longest_block(
        &mut self,
        a: &[char],
        b: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
        let window = &b[blo..bhi];
        self.prev.clear();
        self.prev.resize(window.len() + 1, 0);
        self.curr.clear();
        self.curr.resize(window.len() + 1, 0);

        for (i, &ch) in a.iter().enumerate().take(ahi).skip(alo) {
            for (offset, &other) in window.iter().enumerate() {
                let len = if ch == other {
                    self.prev[offset] + 1
                } else {
                    0
                };
                self.curr[offset + 1] = len;
                if len > best_len {
                    best_i = i + 1 - len;
                    best_j = blo + offset + 1 - len;
                    best_len = len;
                }
            }
            std::mem::swap(&mut self.prev, &mut self.curr);
        }
        (best_i, best_j, best_len)
    }
}

/// Memoizing wrapper around [`ratio`], keyed by the ordered operand pair.
#[derive(Debug)]
pub struct SimilarityScorer {
    cache: MemoCache<(String, String), f64>,
}

impl SimilarityScorer {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: MemoCache::new(cache_capacity),
        }
    }

    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let (left, right) = ordered(a, b);
        let key = (left.to_string(), right.to_string());
        self.cache.get_or_insert_with(&key, || ratio(left, right))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
