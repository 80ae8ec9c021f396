//! Bounded top-K selection over a stream of scored candidates.

use crate::histogram::Histogram;

/// A histogram paired with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub histogram: Histogram,
    pub score: f32,
}

impl ScoredCandidate {
    pub fn new(histogram: Histogram, score: f32) -> Self {
        Self { histogram, score }
    }
}

/// Keeps the `k` highest-scoring candidates seen so far.
///
/// Insertion is a linear scan for the current minimum, which is cheap for the
/// small `k` used in practice. The set has a single owner; callers feeding it
/// from several producers must funnel them through one consumer.
#[derive(Debug)]
pub struct TopK {
    k: usize,
    entries: Vec<ScoredCandidate>,
}

impl TopK {
    /// Create an empty selector with capacity `k`.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            entries: Vec::with_capacity(k),
        }
    }

    /// Offer a candidate.
    ///
    /// Until `k` entries are held every candidate is kept. After that the first
    /// minimum-scoring entry is replaced only by a strictly higher score.
    /// Returns true if the candidate was kept.
    pub fn push(&mut self, candidate: ScoredCandidate) -> bool {
        if self.k == 0 {
            return false;
        }
        if self.entries.len() < self.k {
            self.entries.push(candidate);
            return true;
        }

        let min_idx = self.min_index();
        if candidate.score > self.entries[min_idx].score {
            self.entries[min_idx] = candidate;
            true
        } else {
            false
        }
    }

    fn min_index(&self) -> usize {
        let mut min_idx = 0;
        for (idx, entry) in self.entries.iter().enumerate().skip(1) {
            if entry.score < self.entries[min_idx].score {
                min_idx = idx;
            }
        }
        min_idx
    }

    /// Lowest score currently held, if any.
    pub fn min_score(&self) -> Option<f32> {
        self.entries.get(self.min_index()).map(|e| e.score)
    }

    pub fn capacity(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.k
    }

    /// Held entries in insertion/replacement order.
    pub fn entries(&self) -> &[ScoredCandidate] {
        &self.entries
    }

    /// Consume the selector, returning entries by descending score.
    pub fn into_ranked(mut self) -> Vec<ScoredCandidate> {
        self.entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.histogram.name().cmp(b.histogram.name()))
        });
        self.entries
    }
}

impl Extend<ScoredCandidate> for TopK {
    fn extend<I: IntoIterator<Item = ScoredCandidate>>(&mut self, iter: I) {
        for candidate in iter {
            self.push(candidate);
        }
    }
}
