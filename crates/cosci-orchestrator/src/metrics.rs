//! Run metrics

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Counters accumulated over a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Hypotheses produced by Generate
    pub hypotheses_generated: usize,
    /// Hypotheses produced by Evolve
    pub hypotheses_evolved: usize,
    /// Reviews stored
    pub reviews_completed: usize,
    /// Hypotheses flagged `review_incomplete`
    pub reviews_incomplete: usize,
    /// Matches decided
    pub matches_played: usize,
    /// Matches skipped after a judging failure
    pub matches_skipped: usize,
    /// Hypotheses folded as duplicates
    pub duplicates_removed: usize,
    /// Hypotheses eliminated by the population cap
    pub eliminated: usize,
    /// External capability invocations
    pub capability_calls: usize,
}

impl RunMetrics {
    /// Metrics with only the call counter set
    #[inline]
    #[must_use]
    pub fn calls(capability_calls: usize) -> Self {
        Self {
            capability_calls,
            ..Self::default()
        }
    }
}

impl AddAssign for RunMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.hypotheses_generated += rhs.hypotheses_generated;
        self.hypotheses_evolved += rhs.hypotheses_evolved;
        self.reviews_completed += rhs.reviews_completed;
        self.reviews_incomplete += rhs.reviews_incomplete;
        self.matches_played += rhs.matches_played;
        self.matches_skipped += rhs.matches_skipped;
        self.duplicates_removed += rhs.duplicates_removed;
        self.eliminated += rhs.eliminated;
        self.capability_calls += rhs.capability_calls;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assign_sums_every_counter() {
        let mut total = RunMetrics::calls(2);
        total += RunMetrics {
            matches_played: 9,
            matches_skipped: 1,
            capability_calls: 10,
            ..RunMetrics::default()
        };
        assert_eq!(total.capability_calls, 12);
        assert_eq!(total.matches_played, 9);
        assert_eq!(total.matches_skipped, 1);
        assert_eq!(total.hypotheses_generated, 0);
    }
}
