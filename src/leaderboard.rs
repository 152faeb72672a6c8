//! Bounded top-K score accumulator
//!
//! A min-heap of at most `k` entries: tallying a candidate costs
//! `O(log k)` and never materializes the whole candidate universe.

use crate::types::{PageId, RankedResult, RankedResultList};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
struct Entry {
    score: f64,
    id: PageId,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.score.to_bits() == other.score.to_bits()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Equal scores prefer the smaller id, so it ranks as the "larger" entry.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Keeps the `k` best-scoring ids seen so far
#[derive(Debug, Clone)]
pub struct Leaderboard {
    k: usize,
    heap: BinaryHeap<Reverse<Entry>>,
}

impl Leaderboard {
    /// Create a leaderboard holding at most `k` entries
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(4096)),
        }
    }

    /// Capacity of the leaderboard
    pub fn capacity(&self) -> usize {
        self.k
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if nothing has been tallied
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offer a candidate. NaN scores are ignored.
    ///
    /// Callers tally each id once; tallying an id twice keeps both entries.
    pub fn tally(&mut self, id: PageId, score: f64) {
        if self.k == 0 || score.is_nan() {
            return;
        }
        let entry = Entry { score, id };
        if self.heap.len() < self.k {
            self.heap.push(Reverse(entry));
            return;
        }
        if let Some(Reverse(worst)) = self.heap.peek() {
            if entry > *worst {
                self.heap.pop();
                self.heap.push(Reverse(entry));
            }
        }
    }

    /// Lowest score that would currently survive, once full
    pub fn threshold(&self) -> Option<f64> {
        if self.heap.len() < self.k {
            return None;
        }
        self.heap.peek().map(|Reverse(e)| e.score)
    }

    /// Entries sorted descending by score (ties by ascending id)
    pub fn top(&self) -> RankedResultList {
        let mut entries: Vec<Entry> = self.heap.iter().map(|Reverse(e)| *e).collect();
        entries.sort_by(|a, b| b.cmp(a));
        let results = entries
            .into_iter()
            .map(|e| RankedResult::new(e.id, e.score))
            .collect();
        RankedResultList::from_results(results, self.k)
    }
}
