//! Generate: literature grounding and research planning, then one
//! generation call per hypothesis
//!
//! When grounding is enabled but unavailable, the full count is still
//! generated and each draft is flagged ungrounded.

use super::{non_blank, StageContext};
use crate::error::StageFailure;
use crate::metrics::RunMetrics;
use crate::state::{StageDelta, WorkflowState};
use cosci_core::{
    bounded, Capability, CapabilityError, Diagnostic, GenerationContext, HypothesisDraft,
    LiteratureContext, Stage, SupervisorGuidance,
};
use futures::future::join_all;
use tracing::{info, warn};

pub(super) async fn run(ctx: StageContext<'_>, state: &WorkflowState) -> Result<StageDelta, StageFailure> {
    let iteration = state.iteration();
    let goal = state.research_goal();
    let mut delta = StageDelta::new();

    let (literature, degraded) = ground(ctx, state, &mut delta).await;
    let guidance = plan(ctx, state, &mut delta).await;
    let count = ctx.config.initial_hypotheses_count;

    info!(stage = %Stage::Generate, iteration, count, degraded, "generating hypotheses");

    let contexts: Vec<GenerationContext> = (0..count)
        .map(|index| GenerationContext {
            goal: goal.to_string(),
            literature: literature.clone(),
            index,
            meta_review: state.meta_review().cloned(),
            guidance: guidance.clone(),
        })
        .collect();

    let results = join_all(contexts.iter().map(|context| {
        bounded(
            Capability::Generation,
            ctx.call_timeout(),
            ctx.capabilities.generator.generate(context),
        )
    }))
    .await;

    let mut last_error = None;
    for (index, result) in results.into_iter().enumerate() {
        let result = result.and_then(|text| {
            non_blank(text).ok_or_else(|| CapabilityError::malformed(Capability::Generation, "empty hypothesis text"))
        });
        match result {
            Ok(text) => {
                let draft = HypothesisDraft::generated(text);
                delta.added.push(if degraded { draft.without_grounding() } else { draft });
            }
            Err(error) => {
                warn!(stage = %Stage::Generate, iteration, index, %error, "generation call failed");
                delta.diagnostics.push(
                    Diagnostic::warning(Stage::Generate, iteration, format!("generation {index} failed: {error}"))
                        .with_capability(Capability::Generation),
                );
                last_error = Some(error);
            }
        }
    }

    if delta.added.is_empty() {
        return Err(match last_error {
            Some(error) => StageFailure::Capability(error),
            None => StageFailure::NoOutput("no hypotheses requested".to_string()),
        });
    }

    delta.metrics += RunMetrics {
        hypotheses_generated: delta.added.len(),
        capability_calls: count,
        ..RunMetrics::default()
    };
    delta.literature = literature;
    delta.guidance = guidance;
    Ok(delta)
}

/// Ask the supervisor for a research plan, once per run
async fn plan(
    ctx: StageContext<'_>,
    state: &WorkflowState,
    delta: &mut StageDelta,
) -> Option<SupervisorGuidance> {
    if let Some(existing) = state.guidance() {
        return Some(existing.clone());
    }
    let supervisor = ctx.capabilities.supervisor.as_ref()?;

    let iteration = state.iteration();
    delta.metrics += RunMetrics::calls(1);
    match bounded(Capability::Supervision, ctx.call_timeout(), supervisor.plan(state.research_goal())).await {
        Ok(guidance) if guidance.is_empty() => None,
        Ok(guidance) => {
            info!(
                stage = %Stage::Generate,
                iteration,
                key_areas = guidance.key_areas.len(),
                "research plan ready"
            );
            Some(guidance)
        }
        Err(error) => {
            warn!(stage = %Stage::Generate, iteration, %error, "research planning failed, generating without a plan");
            delta.diagnostics.push(
                Diagnostic::warning(Stage::Generate, iteration, format!("research planning failed: {error}"))
                    .with_capability(Capability::Supervision),
            );
            None
        }
    }
}

/// Consult the literature source; `true` in the second slot means degraded
async fn ground(
    ctx: StageContext<'_>,
    state: &WorkflowState,
    delta: &mut StageDelta,
) -> (Option<LiteratureContext>, bool) {
    if let Some(existing) = state.literature() {
        return (Some(existing.clone()), false);
    }
    if !ctx.config.literature.enabled {
        return (None, false);
    }

    let iteration = state.iteration();
    let error = match &ctx.capabilities.literature {
        Some(source) => {
            delta.metrics += RunMetrics::calls(1);
            match bounded(Capability::Literature, ctx.call_timeout(), source.search(state.research_goal())).await {
                Ok(literature) => return (Some(literature), false),
                Err(error) => error,
            }
        }
        None => CapabilityError::Unavailable(Capability::Literature),
    };

    warn!(
        stage = %Stage::Generate,
        iteration,
        %error,
        "literature grounding unavailable, continuing degraded"
    );
    delta.diagnostics.push(
        Diagnostic::warning(
            Stage::Generate,
            iteration,
            format!("literature grounding unavailable: {error}"),
        )
        .with_capability(Capability::Literature),
    );
    (None, true)
}
