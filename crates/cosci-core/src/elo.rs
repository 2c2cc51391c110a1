//! Elo scoring primitives
//!
//! `E_A = 1 / (1 + 10^((R_B - R_A) / 400))`, `R' = R + K * (S - E)`.
//! Both sides of a match are updated from the ratings as they stood before
//! the match, so the two deltas always cancel.

use serde::{Deserialize, Serialize};

/// Rating assigned to every new hypothesis unless configured otherwise
pub const DEFAULT_INITIAL_RATING: f64 = 1200.0;

/// Default K-factor
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Outcome of a pairwise comparison between A and B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// A is preferred
    AWins,
    /// B is preferred
    BWins,
    /// Neither is preferred
    Tie,
}

impl MatchOutcome {
    /// Actual scores `(S_A, S_B)`
    #[inline]
    #[must_use]
    pub fn actual_scores(self) -> (f64, f64) {
        match self {
            Self::AWins => (1.0, 0.0),
            Self::BWins => (0.0, 1.0),
            Self::Tie => (0.5, 0.5),
        }
    }

    /// Same outcome seen from the other side of the pairing
    #[inline]
    #[must_use]
    pub fn swapped(self) -> Self {
        match self {
            Self::AWins => Self::BWins,
            Self::BWins => Self::AWins,
            Self::Tie => Self::Tie,
        }
    }
}

/// Expected score of a player rated `rating` against `opponent`
#[inline]
#[must_use]
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

/// A rating transition produced by [`update`]
///
/// Cannot be built outside this module, so every rating mutation in the
/// population store is traceable to an Elo update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    before: f64,
    after: f64,
}

impl RatingChange {
    /// Rating before the match
    #[inline]
    #[must_use]
    pub fn before(&self) -> f64 {
        self.before
    }

    /// Rating after the match
    #[inline]
    #[must_use]
    pub fn after(&self) -> f64 {
        self.after
    }

    /// Signed change
    #[inline]
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.after - self.before
    }
}

/// Rating changes for both sides of one match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EloAdjustment {
    /// Change for side A
    pub a: RatingChange,
    /// Change for side B
    pub b: RatingChange,
}

/// Apply one Elo update
///
/// Computes A's delta and mirrors it onto B, which keeps the match
/// exactly zero-sum.
#[must_use]
pub fn update(rating_a: f64, rating_b: f64, outcome: MatchOutcome, k_factor: f64) -> EloAdjustment {
    let expected_a = expected_score(rating_a, rating_b);
    let (actual_a, _) = outcome.actual_scores();
    let delta = k_factor * (actual_a - expected_a);

    EloAdjustment {
        a: RatingChange {
            before: rating_a,
            after: rating_a + delta,
        },
        b: RatingChange {
            before: rating_b,
            after: rating_b - delta,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ratings_expect_half() {
        assert!((expected_score(1200.0, 1200.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn expected_scores_are_complementary() {
        let ea = expected_score(1300.0, 1100.0);
        let eb = expected_score(1100.0, 1300.0);
        assert!((ea + eb - 1.0).abs() < 1e-12);
        assert!(ea > 0.5);
    }

    #[test]
    fn win_at_equal_rating_moves_half_k() {
        let adj = update(1200.0, 1200.0, MatchOutcome::AWins, 24.0);
        assert!((adj.a.after() - 1212.0).abs() < 1e-9);
        assert!((adj.b.after() - 1188.0).abs() < 1e-9);
    }

    #[test]
    fn tie_between_equals_changes_nothing() {
        let adj = update(1200.0, 1200.0, MatchOutcome::Tie, 32.0);
        assert_eq!(adj.a.delta(), 0.0);
        assert_eq!(adj.b.delta(), 0.0);
    }

    #[test]
    fn tie_favours_underdog() {
        let adj = update(1000.0, 1400.0, MatchOutcome::Tie, 32.0);
        assert!(adj.a.delta() > 0.0);
        assert!(adj.b.delta() < 0.0);
    }

    #[test]
    fn upset_moves_more_than_expected_win() {
        let upset = update(1000.0, 1400.0, MatchOutcome::AWins, 32.0);
        let expected = update(1400.0, 1000.0, MatchOutcome::AWins, 32.0);
        assert!(upset.a.delta() > expected.a.delta());
    }

    #[test]
    fn swapped_outcome() {
        assert_eq!(MatchOutcome::AWins.swapped(), MatchOutcome::BWins);
        assert_eq!(MatchOutcome::Tie.swapped(), MatchOutcome::Tie);
    }
}
