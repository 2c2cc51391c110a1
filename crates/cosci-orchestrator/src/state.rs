//! Workflow state and stage deltas
//!
//! The orchestrator owns the only mutable [`WorkflowState`]. Stages read it
//! by reference and return a [`StageDelta`]; nothing reaches the population
//! except through [`WorkflowState::merge`].

use crate::metrics::RunMetrics;
use cosci_core::{
    Diagnostic, HypothesisDraft, HypothesisId, HypothesisPatch, LiteratureContext, MetaReview,
    PopulationError, PopulationStore, ReflectionNote, ReviewRecord, RunId, Severity, Stage,
    SupervisorGuidance, WorkflowConfig,
};
use cosci_proximity::Fold;
use cosci_tournament::MatchRecord;
use serde::Serialize;
use tracing::debug;

/// Process-scoped state for one run
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowState {
    run_id: RunId,
    research_goal: String,
    population: PopulationStore,
    iteration: u32,
    max_iterations: u32,
    stage: Stage,
    match_history: Vec<MatchRecord>,
    meta_review: Option<MetaReview>,
    literature: Option<LiteratureContext>,
    guidance: Option<SupervisorGuidance>,
    diagnostics: Vec<Diagnostic>,
    metrics: RunMetrics,
}

impl WorkflowState {
    /// Create state for a new run
    #[must_use]
    pub fn new(research_goal: impl Into<String>, config: &WorkflowConfig) -> Self {
        Self {
            run_id: RunId::new(),
            research_goal: research_goal.into(),
            population: PopulationStore::new(config.elo.initial_rating),
            iteration: 0,
            max_iterations: config.max_iterations,
            stage: Stage::Init,
            match_history: Vec::new(),
            meta_review: None,
            literature: None,
            guidance: None,
            diagnostics: Vec::new(),
            metrics: RunMetrics::default(),
        }
    }

    /// Run identifier
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Research goal
    #[inline]
    #[must_use]
    pub fn research_goal(&self) -> &str {
        &self.research_goal
    }

    /// Population
    #[inline]
    #[must_use]
    pub fn population(&self) -> &PopulationStore {
        &self.population
    }

    /// Current iteration
    #[inline]
    #[must_use]
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Iteration bound
    #[inline]
    #[must_use]
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Current stage
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Completed matches in play order
    #[inline]
    #[must_use]
    pub fn match_history(&self) -> &[MatchRecord] {
        &self.match_history
    }

    /// Latest meta-review
    #[inline]
    #[must_use]
    pub fn meta_review(&self) -> Option<&MetaReview> {
        self.meta_review.as_ref()
    }

    /// Literature grounding, absent in degraded mode
    #[inline]
    #[must_use]
    pub fn literature(&self) -> Option<&LiteratureContext> {
        self.literature.as_ref()
    }

    /// Research plan from the supervisor, if one was produced
    #[inline]
    #[must_use]
    pub fn guidance(&self) -> Option<&SupervisorGuidance> {
        self.guidance.as_ref()
    }

    /// Recorded diagnostics
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Warning diagnostics only
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Accumulated metrics
    #[inline]
    #[must_use]
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub(crate) fn advance_iteration(&mut self) {
        self.iteration += 1;
    }

    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Merge a stage result
    ///
    /// Applied in order: new hypotheses, reflections, reviews, matches
    /// (replayed through the Elo update), folds, eliminations. Returns the
    /// ids of added hypotheses.
    ///
    /// # Errors
    /// The first population error; the delta must be consistent with the
    /// state it was computed from.
    pub fn merge(&mut self, delta: StageDelta, k_factor: f64) -> Result<Vec<HypothesisId>, PopulationError> {
        let mut added = Vec::with_capacity(delta.added.len());
        for draft in delta.added {
            added.push(self.population.add(draft, self.iteration)?);
        }

        for (id, note) in delta.reflections {
            self.population.update(id, HypothesisPatch::new().reflection(note))?;
        }
        for (id, review) in delta.reviews {
            self.population.update(id, HypothesisPatch::new().review(review))?;
        }
        for id in delta.incomplete_reviews {
            self.population
                .update(id, HypothesisPatch::new().review_incomplete())?;
        }

        for record in delta.matches {
            self.population
                .apply_match(record.a, record.b, record.outcome, k_factor)?;
            self.match_history.push(record);
        }

        for fold in delta.folds {
            self.population.mark_duplicate(fold.id, fold.representative)?;
        }
        for id in delta.eliminations {
            self.population.eliminate(id)?;
        }

        if let Some(meta_review) = delta.meta_review {
            self.meta_review = Some(meta_review);
        }
        if let Some(literature) = delta.literature {
            self.literature = Some(literature);
        }
        if let Some(guidance) = delta.guidance {
            self.guidance = Some(guidance);
        }

        debug!(
            stage = %self.stage,
            iteration = self.iteration,
            added = added.len(),
            diagnostics = delta.diagnostics.len(),
            "stage delta merged"
        );
        self.diagnostics.extend(delta.diagnostics);
        self.metrics += delta.metrics;
        Ok(added)
    }
}

/// Result of one stage, merged by the orchestrator
#[derive(Debug, Clone, Default)]
pub struct StageDelta {
    /// New hypotheses, created at the current iteration
    pub added: Vec<HypothesisDraft>,
    /// Literature reflections to store
    pub reflections: Vec<(HypothesisId, ReflectionNote)>,
    /// Reviews to store
    pub reviews: Vec<(HypothesisId, ReviewRecord)>,
    /// Hypotheses whose review could not be produced
    pub incomplete_reviews: Vec<HypothesisId>,
    /// Completed matches in play order
    pub matches: Vec<MatchRecord>,
    /// Duplicate folds
    pub folds: Vec<Fold>,
    /// Hypotheses removed by the population cap
    pub eliminations: Vec<HypothesisId>,
    /// Replacement meta-review
    pub meta_review: Option<MetaReview>,
    /// Literature grounding
    pub literature: Option<LiteratureContext>,
    /// Research plan
    pub guidance: Option<SupervisorGuidance>,
    /// Recoverable conditions
    pub diagnostics: Vec<Diagnostic>,
    /// Counters to add
    pub metrics: RunMetrics,
}

impl StageDelta {
    /// Empty delta
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosci_core::{MatchOutcome, ReflectionClass, Review, ReviewScores, Status};
    use cosci_proximity::FoldReason;

    fn seeded_state(n: usize) -> (WorkflowState, Vec<HypothesisId>) {
        let mut state = WorkflowState::new("goal", &WorkflowConfig::default());
        let delta = StageDelta {
            added: (1..=n)
                .map(|i| HypothesisDraft::generated(format!("H{i}")))
                .collect(),
            ..StageDelta::new()
        };
        let ids = state.merge(delta, 32.0).unwrap();
        (state, ids)
    }

    #[test]
    fn new_state_starts_at_init() {
        let config = WorkflowConfig::default().with_max_iterations(4);
        let state = WorkflowState::new("goal", &config);
        assert_eq!(state.stage(), Stage::Init);
        assert_eq!(state.iteration(), 0);
        assert_eq!(state.max_iterations(), 4);
        assert!(state.population().is_empty());
    }

    #[test]
    fn merge_adds_hypotheses_at_current_iteration() {
        let (mut state, ids) = seeded_state(2);
        assert_eq!(ids.len(), 2);
        state.advance_iteration();
        let added = state
            .merge(
                StageDelta {
                    added: vec![HypothesisDraft::evolved("H1 refined", [ids[0]])],
                    ..StageDelta::new()
                },
                32.0,
            )
            .unwrap();
        let child = state.population().get(added[0]).unwrap();
        assert_eq!(child.created_at_iteration(), 1);
        assert_eq!(child.lineage(), &[ids[0]]);
    }

    #[test]
    fn merge_replays_matches_into_history() {
        let (mut state, ids) = seeded_state(2);
        let record = MatchRecord {
            stage: Stage::Rank,
            iteration: 0,
            sequence: 0,
            a: ids[0],
            b: ids[1],
            outcome: MatchOutcome::AWins,
            winner: Some(ids[0]),
            rating_a_before: 1200.0,
            rating_b_before: 1200.0,
            delta_a: 16.0,
            delta_b: -16.0,
            rationale: String::new(),
        };
        state
            .merge(
                StageDelta {
                    matches: vec![record],
                    ..StageDelta::new()
                },
                32.0,
            )
            .unwrap();

        assert_eq!(state.match_history().len(), 1);
        assert!((state.population().get(ids[0]).unwrap().rating() - 1216.0).abs() < 1e-9);
        assert!((state.population().get(ids[1]).unwrap().rating() - 1184.0).abs() < 1e-9);
    }

    #[test]
    fn merge_applies_reviews_folds_and_eliminations() {
        let (mut state, ids) = seeded_state(3);
        let review = ReviewRecord::from_review(Review::new(ReviewScores::new().with("novelty", 4.0)), 0);
        state
            .merge(
                StageDelta {
                    reviews: vec![(ids[0], review)],
                    incomplete_reviews: vec![ids[1]],
                    folds: vec![Fold {
                        id: ids[1],
                        representative: ids[0],
                        reason: FoldReason::Duplicate,
                    }],
                    eliminations: vec![ids[2]],
                    metrics: RunMetrics::calls(3),
                    ..StageDelta::new()
                },
                32.0,
            )
            .unwrap();

        let population = state.population();
        assert!(population.get(ids[0]).unwrap().review().is_some());
        assert!(population.get(ids[1]).unwrap().review_incomplete());
        assert_eq!(population.get(ids[1]).unwrap().status(), Status::Duplicate);
        assert_eq!(population.get(ids[2]).unwrap().status(), Status::Eliminated);
        assert_eq!(state.metrics().capability_calls, 3);
    }

    #[test]
    fn merge_keeps_previous_meta_review_when_absent() {
        let (mut state, _) = seeded_state(1);
        let meta = MetaReview {
            common_strengths: vec!["mechanistic".into()],
            ..MetaReview::default()
        };
        state
            .merge(
                StageDelta {
                    meta_review: Some(meta.clone()),
                    ..StageDelta::new()
                },
                32.0,
            )
            .unwrap();
        state.merge(StageDelta::new(), 32.0).unwrap();
        assert_eq!(state.meta_review(), Some(&meta));
    }

    #[test]
    fn merge_stores_reflections_and_guidance() {
        let (mut state, ids) = seeded_state(2);
        let guidance = SupervisorGuidance {
            key_areas: vec!["microbial metabolites".into()],
            ..SupervisorGuidance::default()
        };
        state
            .merge(
                StageDelta {
                    reflections: vec![(
                        ids[1],
                        ReflectionNote::new(ReflectionClass::MissingPiece, "fills the vagal gap"),
                    )],
                    guidance: Some(guidance.clone()),
                    ..StageDelta::new()
                },
                32.0,
            )
            .unwrap();

        assert_eq!(state.guidance(), Some(&guidance));
        assert!(state.population().get(ids[0]).unwrap().reflection().is_none());
        let note = state.population().get(ids[1]).unwrap().reflection().unwrap();
        assert_eq!(note.classification, ReflectionClass::MissingPiece);
    }

    #[test]
    fn inconsistent_delta_is_rejected() {
        let (mut state, _) = seeded_state(1);
        let err = state
            .merge(
                StageDelta {
                    eliminations: vec![HypothesisId::new(99)],
                    ..StageDelta::new()
                },
                32.0,
            )
            .unwrap_err();
        assert_eq!(err, PopulationError::NotFound(HypothesisId::new(99)));
    }

    #[test]
    fn snapshot_serializes() {
        let (state, _) = seeded_state(2);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["research_goal"], "goal");
        assert_eq!(json["stage"], "init");
    }
}
