//! Working ratings for one tournament pass
//!
//! Matches are played against a private copy of the active ratings. The
//! resulting match records are replayed into the population store when
//! the stage result is merged, which reproduces these ratings exactly.

use crate::error::TournamentError;
use cosci_core::elo::{self, EloAdjustment, MatchOutcome};
use cosci_core::{HypothesisId, PopulationStore};
use std::collections::BTreeMap;

/// Ratings of the active population during a pass
#[derive(Debug, Clone, PartialEq)]
pub struct Standings {
    ratings: BTreeMap<HypothesisId, f64>,
    k_factor: f64,
}

impl Standings {
    /// Snapshot the active ratings from `store`
    #[must_use]
    pub fn from_store(store: &PopulationStore, k_factor: f64) -> Self {
        let ratings = store.get_active().into_iter().map(|h| (h.id(), h.rating())).collect();
        Self { ratings, k_factor }
    }

    /// Build from explicit ratings
    #[must_use]
    pub fn from_ratings(ratings: impl IntoIterator<Item = (HypothesisId, f64)>, k_factor: f64) -> Self {
        Self {
            ratings: ratings.into_iter().collect(),
            k_factor,
        }
    }

    /// Current rating of `id`
    #[inline]
    #[must_use]
    pub fn rating(&self, id: HypothesisId) -> Option<f64> {
        self.ratings.get(&id).copied()
    }

    /// Participating ids in ascending order
    #[must_use]
    pub fn ids(&self) -> Vec<HypothesisId> {
        self.ratings.keys().copied().collect()
    }

    /// Number of participants
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    /// Check if nobody participates
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Apply one match result
    ///
    /// # Errors
    /// `SelfMatch` if `a == b`, `UnknownHypothesis` if either side is absent.
    pub fn record(
        &mut self,
        a: HypothesisId,
        b: HypothesisId,
        outcome: MatchOutcome,
    ) -> Result<EloAdjustment, TournamentError> {
        if a == b {
            return Err(TournamentError::SelfMatch(a));
        }
        let rating_a = self.rating(a).ok_or(TournamentError::UnknownHypothesis(a))?;
        let rating_b = self.rating(b).ok_or(TournamentError::UnknownHypothesis(b))?;

        let adjustment = elo::update(rating_a, rating_b, outcome, self.k_factor);
        self.ratings.insert(a, adjustment.a.after());
        self.ratings.insert(b, adjustment.b.after());
        Ok(adjustment)
    }

    /// Participants by descending rating, ties by ascending id
    #[must_use]
    pub fn leaderboard(&self) -> Vec<(HypothesisId, f64)> {
        let mut board: Vec<(HypothesisId, f64)> =
            self.ratings.iter().map(|(id, r)| (*id, *r)).collect();
        board.sort_by(|x, y| y.1.total_cmp(&x.1).then_with(|| x.0.cmp(&y.0)));
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosci_core::HypothesisDraft;

    #[test]
    fn snapshot_skips_inactive() {
        let mut store = PopulationStore::default();
        let a = store.add(HypothesisDraft::generated("a"), 0).unwrap();
        let b = store.add(HypothesisDraft::generated("b"), 0).unwrap();
        store.eliminate(b).unwrap();

        let standings = Standings::from_store(&store, 32.0);
        assert_eq!(standings.ids(), vec![a]);
    }

    #[test]
    fn record_chains_ratings_between_matches() {
        let (a, b, c) = (HypothesisId::new(1), HypothesisId::new(2), HypothesisId::new(3));
        let mut standings = Standings::from_ratings([(a, 1200.0), (b, 1200.0), (c, 1200.0)], 24.0);

        standings.record(a, b, MatchOutcome::AWins).unwrap();
        let second = standings.record(a, c, MatchOutcome::AWins).unwrap();

        assert!((second.a.before() - 1212.0).abs() < 1e-9);
        assert_eq!(standings.leaderboard()[0].0, a);
    }

    #[test]
    fn record_rejects_bad_pairs() {
        let a = HypothesisId::new(1);
        let mut standings = Standings::from_ratings([(a, 1200.0)], 24.0);
        assert_eq!(
            standings.record(a, a, MatchOutcome::Tie),
            Err(TournamentError::SelfMatch(a))
        );
        assert_eq!(
            standings.record(a, HypothesisId::new(9), MatchOutcome::Tie),
            Err(TournamentError::UnknownHypothesis(HypothesisId::new(9)))
        );
    }
}
