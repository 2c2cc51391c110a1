//! Rank and ReRank: one tournament pass over the active population

use super::StageContext;
use crate::error::StageFailure;
use crate::metrics::RunMetrics;
use crate::state::{StageDelta, WorkflowState};
use cosci_core::{Capability, Diagnostic, Stage};
use cosci_tournament::TournamentRanker;

pub(super) async fn run(
    ctx: StageContext<'_>,
    stage: Stage,
    state: &WorkflowState,
) -> Result<StageDelta, StageFailure> {
    let iteration = state.iteration();
    let ranker = TournamentRanker::from_config(ctx.capabilities.judge.clone(), ctx.config)
        .with_call_timeout(ctx.call_timeout());
    let outcome = ranker
        .run(state.research_goal(), stage, iteration, state.population())
        .await?;

    let mut delta = StageDelta::new();
    for skipped in &outcome.skipped {
        delta.diagnostics.push(
            Diagnostic::warning(
                stage,
                iteration,
                format!("match {} skipped: {}", skipped.sequence, skipped.error),
            )
            .with_subjects([skipped.a, skipped.b])
            .with_capability(Capability::Judging),
        );
    }
    delta.metrics += RunMetrics {
        matches_played: outcome.records.len(),
        matches_skipped: outcome.skipped.len(),
        capability_calls: outcome.judge_calls(),
        ..RunMetrics::default()
    };
    delta.matches = outcome.records;
    Ok(delta)
}
