//! Similarity matrix and candidate pair selection

use cosci_core::HypothesisId;
use std::collections::HashMap;

/// Symmetric similarity scores over hypothesis pairs
///
/// Scores are normalized on insert: NaN becomes 0.0 and everything else is
/// clamped to `[0, 1]`. Pairs that were never scored read as 0.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityMatrix {
    scores: HashMap<(HypothesisId, HypothesisId), f64>,
}

fn key(a: HypothesisId, b: HypothesisId) -> (HypothesisId, HypothesisId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Normalize a raw oracle score into `[0, 1]`
#[must_use]
pub fn normalize_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

impl SimilarityMatrix {
    /// Create empty matrix
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the score for a pair
    pub fn insert(&mut self, a: HypothesisId, b: HypothesisId, score: f64) {
        if a != b {
            self.scores.insert(key(a, b), normalize_score(score));
        }
    }

    /// With a pair score
    #[inline]
    #[must_use]
    pub fn with(mut self, a: HypothesisId, b: HypothesisId, score: f64) -> Self {
        self.insert(a, b, score);
        self
    }

    /// Score for a pair (1.0 for identical ids, 0.0 if unscored)
    #[must_use]
    pub fn get(&self, a: HypothesisId, b: HypothesisId) -> f64 {
        if a == b {
            return 1.0;
        }
        self.scores.get(&key(a, b)).copied().unwrap_or(0.0)
    }

    /// Number of scored pairs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Check if no pair was scored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Pairs to score for a population given in rank order
///
/// Every pair when the population is at most `max_full_comparison`,
/// otherwise each hypothesis against its next `window` neighbours in rank
/// order.
#[must_use]
pub fn candidate_pairs(
    ranked: &[HypothesisId],
    max_full_comparison: usize,
    window: usize,
) -> Vec<(HypothesisId, HypothesisId)> {
    let n = ranked.len();
    let reach = if n <= max_full_comparison { n } else { window.max(1) };

    let mut pairs = Vec::new();
    for i in 0..n {
        let end = n.min(i.saturating_add(reach).saturating_add(1));
        for j in (i + 1)..end {
            pairs.push((ranked[i], ranked[j]));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u64) -> Vec<HypothesisId> {
        (1..=n).map(HypothesisId::new).collect()
    }

    #[test]
    fn scores_are_symmetric() {
        let (a, b) = (HypothesisId::new(1), HypothesisId::new(2));
        let matrix = SimilarityMatrix::new().with(b, a, 0.4);
        assert_eq!(matrix.get(a, b), 0.4);
        assert_eq!(matrix.get(b, a), 0.4);
    }

    #[test]
    fn scores_are_normalized() {
        let (a, b, c) = (HypothesisId::new(1), HypothesisId::new(2), HypothesisId::new(3));
        let matrix = SimilarityMatrix::new()
            .with(a, b, f64::NAN)
            .with(a, c, 1.7)
            .with(b, c, -0.2);
        assert_eq!(matrix.get(a, b), 0.0);
        assert_eq!(matrix.get(a, c), 1.0);
        assert_eq!(matrix.get(b, c), 0.0);
    }

    #[test]
    fn unscored_pairs_are_dissimilar() {
        let matrix = SimilarityMatrix::new();
        assert_eq!(matrix.get(HypothesisId::new(1), HypothesisId::new(2)), 0.0);
        assert_eq!(matrix.get(HypothesisId::new(1), HypothesisId::new(1)), 1.0);
    }

    #[test]
    fn small_population_compares_every_pair() {
        assert_eq!(candidate_pairs(&ids(5), 64, 2).len(), 10);
    }

    #[test]
    fn large_population_uses_rank_window() {
        let pairs = candidate_pairs(&ids(10), 4, 2);
        // 8 members with two successors, one with one, last with none
        assert_eq!(pairs.len(), 17);
        assert!(pairs.contains(&(HypothesisId::new(1), HypothesisId::new(3))));
        assert!(!pairs.contains(&(HypothesisId::new(1), HypothesisId::new(4))));
    }
}
