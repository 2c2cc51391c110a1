//! Tournament ranker
//!
//! Plays the planned matches strictly one after another: each Elo update
//! reads the ratings left by the previous match, so concurrent play would
//! change both the ratings and the recorded history.

use crate::error::TournamentError;
use crate::planner::{plan_matches, tournament_seed, MatchPlan};
use crate::standings::Standings;
use cosci_core::elo::{MatchOutcome, DEFAULT_K_FACTOR};
use cosci_core::{
    bounded, Capability, CapabilityError, HypothesisId, Judge, PopulationStore, Stage,
    WorkflowConfig,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One completed match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Stage that played the match
    pub stage: Stage,
    /// Iteration at the time of the match
    pub iteration: u32,
    /// Position in the match plan
    pub sequence: usize,
    /// Side A
    pub a: HypothesisId,
    /// Side B
    pub b: HypothesisId,
    /// Judge decision
    pub outcome: MatchOutcome,
    /// Winning id, `None` on a tie
    pub winner: Option<HypothesisId>,
    /// A's rating before the match
    pub rating_a_before: f64,
    /// B's rating before the match
    pub rating_b_before: f64,
    /// A's rating change
    pub delta_a: f64,
    /// B's rating change
    pub delta_b: f64,
    /// Judge justification
    pub rationale: String,
}

/// A planned match that produced no decision
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedMatch {
    /// Position in the match plan
    pub sequence: usize,
    /// Side A
    pub a: HypothesisId,
    /// Side B
    pub b: HypothesisId,
    /// Why the judge gave no decision
    pub error: CapabilityError,
}

/// Result of one tournament pass
#[derive(Debug, Clone)]
pub struct TournamentOutcome {
    /// Pairings that were attempted
    pub plan: MatchPlan,
    /// Completed matches in play order
    pub records: Vec<MatchRecord>,
    /// Matches skipped after a judging failure
    pub skipped: Vec<SkippedMatch>,
    /// Ratings after the last match
    pub standings: Standings,
}

impl TournamentOutcome {
    /// Number of judge invocations
    #[inline]
    #[must_use]
    pub fn judge_calls(&self) -> usize {
        self.records.len() + self.skipped.len()
    }
}

/// Pairwise Elo tournament over the active population
#[derive(Debug, Clone)]
pub struct TournamentRanker<J> {
    judge: J,
    k_factor: f64,
    matches_per_hypothesis: u32,
    call_timeout: Duration,
}

impl<J: Judge> TournamentRanker<J> {
    /// Create ranker with default constants
    #[must_use]
    pub fn new(judge: J) -> Self {
        Self {
            judge,
            k_factor: DEFAULT_K_FACTOR,
            matches_per_hypothesis: 3,
            call_timeout: Duration::from_secs(120),
        }
    }

    /// Create ranker from workflow configuration
    #[must_use]
    pub fn from_config(judge: J, config: &WorkflowConfig) -> Self {
        Self {
            judge,
            k_factor: config.elo.k_factor,
            matches_per_hypothesis: config.tournament.matches_per_hypothesis,
            call_timeout: config.call_timeout(),
        }
    }

    /// With K-factor
    #[inline]
    #[must_use]
    pub fn with_k_factor(mut self, k_factor: f64) -> Self {
        self.k_factor = k_factor;
        self
    }

    /// With matches per hypothesis
    #[inline]
    #[must_use]
    pub fn with_matches_per_hypothesis(mut self, matches: u32) -> Self {
        self.matches_per_hypothesis = matches;
        self
    }

    /// With judge call timeout
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// K-factor used for every match
    #[inline]
    #[must_use]
    pub fn k_factor(&self) -> f64 {
        self.k_factor
    }

    /// Plan the pairings for the active population
    #[must_use]
    pub fn plan(&self, goal: &str, iteration: u32, store: &PopulationStore) -> MatchPlan {
        let ids: Vec<HypothesisId> = store.get_active().iter().map(|h| h.id()).collect();
        plan_matches(&ids, self.matches_per_hypothesis, tournament_seed(goal, iteration))
    }

    /// Plan and play one pass
    ///
    /// # Errors
    /// See [`TournamentRanker::play`].
    pub async fn run(
        &self,
        goal: &str,
        stage: Stage,
        iteration: u32,
        store: &PopulationStore,
    ) -> Result<TournamentOutcome, TournamentError> {
        let plan = self.plan(goal, iteration, store);
        self.play(goal, stage, iteration, store, plan).await
    }

    /// Play a plan against the active population
    ///
    /// Judging failures skip the match with no rating change.
    ///
    /// # Errors
    /// - `SelfMatch` / `UnknownHypothesis` if the plan is inconsistent with
    ///   the active population (checked before any judging)
    /// - `AllMatchesSkipped` if matches were planned and none was decided
    pub async fn play(
        &self,
        goal: &str,
        stage: Stage,
        iteration: u32,
        store: &PopulationStore,
        plan: MatchPlan,
    ) -> Result<TournamentOutcome, TournamentError> {
        let mut standings = Standings::from_store(store, self.k_factor);
        let mut texts = Vec::with_capacity(plan.len());
        for &(a, b) in &plan.pairs {
            if a == b {
                return Err(TournamentError::SelfMatch(a));
            }
            let text_a = active_text(store, a)?;
            let text_b = active_text(store, b)?;
            texts.push((text_a, text_b));
        }

        info!(
            stage = %stage,
            iteration,
            planned = plan.len(),
            participants = standings.len(),
            "tournament pass started"
        );

        let mut records = Vec::with_capacity(plan.len());
        let mut skipped = Vec::new();

        for (sequence, (&(a, b), (text_a, text_b))) in plan.pairs.iter().zip(texts).enumerate() {
            let verdict = bounded(
                Capability::Judging,
                self.call_timeout,
                self.judge.judge(goal, text_a, text_b),
            )
            .await;

            let verdict = match verdict {
                Ok(verdict) => verdict,
                Err(error) => {
                    warn!(stage = %stage, iteration, %a, %b, %error, "match skipped");
                    skipped.push(SkippedMatch { sequence, a, b, error });
                    continue;
                }
            };

            let adjustment = standings.record(a, b, verdict.outcome)?;
            let winner = match verdict.outcome {
                MatchOutcome::AWins => Some(a),
                MatchOutcome::BWins => Some(b),
                MatchOutcome::Tie => None,
            };
            debug!(
                stage = %stage,
                iteration,
                %a,
                %b,
                outcome = ?verdict.outcome,
                delta = adjustment.a.delta(),
                "match played"
            );

            records.push(MatchRecord {
                stage,
                iteration,
                sequence,
                a,
                b,
                outcome: verdict.outcome,
                winner,
                rating_a_before: adjustment.a.before(),
                rating_b_before: adjustment.b.before(),
                delta_a: adjustment.a.delta(),
                delta_b: adjustment.b.delta(),
                rationale: verdict.rationale,
            });
        }

        if records.is_empty() {
            if let Some(last) = skipped.last() {
                return Err(TournamentError::AllMatchesSkipped {
                    planned: plan.len(),
                    last: last.error.clone(),
                });
            }
        }

        info!(
            stage = %stage,
            iteration,
            played = records.len(),
            skipped = skipped.len(),
            "tournament pass finished"
        );

        Ok(TournamentOutcome {
            plan,
            records,
            skipped,
            standings,
        })
    }
}

fn active_text(store: &PopulationStore, id: HypothesisId) -> Result<&str, TournamentError> {
    store
        .get(id)
        .filter(|h| h.is_active())
        .map(|h| h.text())
        .ok_or(TournamentError::UnknownHypothesis(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosci_core::{HypothesisDraft, Verdict};

    struct FirstWins;

    #[async_trait::async_trait]
    impl Judge for FirstWins {
        async fn judge(&self, _: &str, _: &str, _: &str) -> Result<Verdict, CapabilityError> {
            Ok(Verdict::new(MatchOutcome::AWins))
        }
    }

    fn store(n: usize) -> PopulationStore {
        let mut store = PopulationStore::default();
        for i in 0..n {
            store.add(HypothesisDraft::generated(format!("h{i}")), 0).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn plays_every_planned_match() {
        let store = store(4);
        let ranker = TournamentRanker::new(FirstWins);
        let outcome = ranker.run("goal", Stage::Rank, 0, &store).await.unwrap();

        assert_eq!(outcome.plan.len(), 6);
        assert_eq!(outcome.records.len(), 6);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.judge_calls(), 6);
    }

    #[tokio::test]
    async fn records_are_zero_sum_and_sequenced() {
        let store = store(5);
        let outcome = TournamentRanker::new(FirstWins)
            .run("goal", Stage::Rank, 0, &store)
            .await
            .unwrap();

        for (i, record) in outcome.records.iter().enumerate() {
            assert_eq!(record.sequence, i);
            assert_eq!(record.winner, Some(record.a));
            assert!((record.delta_a + record.delta_b).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn single_hypothesis_plays_nothing() {
        let store = store(1);
        let outcome = TournamentRanker::new(FirstWins)
            .run("goal", Stage::Rank, 0, &store)
            .await
            .unwrap();
        assert!(outcome.records.is_empty());
        assert!(outcome.plan.is_empty());
    }

    #[tokio::test]
    async fn inconsistent_plan_is_rejected_before_judging() {
        let store = store(2);
        let plan = MatchPlan::fixed(vec![(HypothesisId::new(1), HypothesisId::new(7))]);
        let err = TournamentRanker::new(FirstWins)
            .play("goal", Stage::Rank, 0, &store, plan)
            .await
            .unwrap_err();
        assert_eq!(err, TournamentError::UnknownHypothesis(HypothesisId::new(7)));
    }
}
