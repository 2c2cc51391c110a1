//! Deduplicate: fold near-duplicates, then enforce the population cap

use super::StageContext;
use crate::error::StageFailure;
use crate::metrics::RunMetrics;
use crate::state::{StageDelta, WorkflowState};
use cosci_core::{Capability, Diagnostic, HypothesisId, Stage};
use cosci_proximity::Deduplicator;
use tracing::info;

pub(super) async fn run(ctx: StageContext<'_>, state: &WorkflowState) -> Result<StageDelta, StageFailure> {
    let iteration = state.iteration();
    let deduplicator = Deduplicator::new(ctx.capabilities.similarity.clone(), ctx.config.proximity)?
        .with_call_timeout(ctx.call_timeout());
    let outcome = deduplicator.plan(state.population()).await;

    let mut delta = StageDelta::new();
    for failure in &outcome.failures {
        delta.diagnostics.push(
            Diagnostic::warning(
                Stage::Deduplicate,
                iteration,
                format!("similarity unavailable, pair treated as dissimilar: {}", failure.error),
            )
            .with_subjects([failure.a, failure.b])
            .with_capability(Capability::Similarity),
        );
    }

    let survivors: Vec<HypothesisId> = state
        .population()
        .ranked_active()
        .into_iter()
        .map(|h| h.id())
        .filter(|id| outcome.plan.fold_for(*id).is_none())
        .collect();
    if let Some(cap) = ctx.config.population_cap {
        if survivors.len() > cap {
            delta.eliminations = survivors[cap..].to_vec();
            info!(
                stage = %Stage::Deduplicate,
                iteration,
                cap,
                eliminated = delta.eliminations.len(),
                "population cap applied"
            );
        }
    }

    delta.metrics += RunMetrics {
        duplicates_removed: outcome.plan.len(),
        eliminated: delta.eliminations.len(),
        capability_calls: outcome.comparisons,
        ..RunMetrics::default()
    };
    delta.folds = outcome.plan.folds;
    Ok(delta)
}
