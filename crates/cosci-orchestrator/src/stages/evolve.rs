//! Evolve: refine the top-ranked hypotheses concurrently

use super::{non_blank, StageContext};
use crate::metrics::RunMetrics;
use crate::state::{StageDelta, WorkflowState};
use cosci_core::{
    bounded, Capability, CapabilityError, Diagnostic, EvolutionRequest, HypothesisDraft, Stage,
};
use futures::future::join_all;
use tracing::{info, warn};

pub(super) async fn run(ctx: StageContext<'_>, state: &WorkflowState) -> StageDelta {
    let iteration = state.iteration();
    let requests: Vec<EvolutionRequest> = state
        .population()
        .ranked_active()
        .into_iter()
        .take(ctx.config.evolution_max_count)
        .map(|h| EvolutionRequest {
            goal: state.research_goal().to_string(),
            parent: h.id(),
            text: h.text().to_string(),
            feedback: h.review().map(|r| r.feedback.clone()),
            meta_review: state.meta_review().cloned(),
        })
        .collect();

    info!(stage = %Stage::Evolve, iteration, parents = requests.len(), "evolving hypotheses");

    let results = join_all(requests.iter().map(|request| {
        bounded(
            Capability::Evolution,
            ctx.call_timeout(),
            ctx.capabilities.evolver.evolve(request),
        )
    }))
    .await;

    let mut delta = StageDelta::new();
    for (request, result) in requests.iter().zip(results) {
        let result = result.and_then(|text| {
            non_blank(text)
                .ok_or_else(|| CapabilityError::malformed(Capability::Evolution, "empty hypothesis text"))
        });
        match result {
            Ok(text) => {
                let draft = HypothesisDraft::evolved(text, [request.parent]);
                let ungrounded = state
                    .population()
                    .get(request.parent)
                    .is_some_and(|parent| parent.is_ungrounded());
                delta.added.push(if ungrounded { draft.without_grounding() } else { draft });
            }
            Err(error) => {
                warn!(stage = %Stage::Evolve, iteration, parent = %request.parent, %error, "evolution skipped");
                delta.diagnostics.push(
                    Diagnostic::warning(Stage::Evolve, iteration, format!("evolution skipped: {error}"))
                        .with_subjects([request.parent])
                        .with_capability(Capability::Evolution),
                );
            }
        }
    }

    delta.metrics += RunMetrics {
        hypotheses_evolved: delta.added.len(),
        capability_calls: requests.len(),
        ..RunMetrics::default()
    };
    delta
}
