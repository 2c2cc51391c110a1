//! MetaReview: population-level synthesis
//!
//! Optional enrichment. Failure or absence keeps the previous meta-review.

use super::StageContext;
use crate::metrics::RunMetrics;
use crate::state::{StageDelta, WorkflowState};
use cosci_core::{bounded, Capability, Diagnostic, ReviewedHypothesis, Stage};
use tracing::{info, warn};

pub(super) async fn run(ctx: StageContext<'_>, state: &WorkflowState) -> StageDelta {
    let iteration = state.iteration();
    let mut delta = StageDelta::new();

    let Some(meta_reviewer) = &ctx.capabilities.meta_reviewer else {
        delta.diagnostics.push(
            Diagnostic::info(Stage::MetaReview, iteration, "no meta-reviewer configured")
                .with_capability(Capability::MetaReview),
        );
        return delta;
    };

    let ranked: Vec<ReviewedHypothesis> = state
        .population()
        .ranked_active()
        .into_iter()
        .map(|h| ReviewedHypothesis {
            id: h.id(),
            text: h.text().to_string(),
            rating: h.rating(),
            review: h.review().cloned(),
        })
        .collect();

    info!(stage = %Stage::MetaReview, iteration, hypotheses = ranked.len(), "synthesizing meta-review");
    delta.metrics += RunMetrics::calls(1);

    match bounded(
        Capability::MetaReview,
        ctx.call_timeout(),
        meta_reviewer.meta_review(state.research_goal(), &ranked),
    )
    .await
    {
        Ok(meta_review) => delta.meta_review = Some(meta_review),
        Err(error) => {
            warn!(stage = %Stage::MetaReview, iteration, %error, "meta-review failed, keeping previous");
            delta.diagnostics.push(
                Diagnostic::warning(Stage::MetaReview, iteration, format!("meta-review failed: {error}"))
                    .with_capability(Capability::MetaReview),
            );
        }
    }
    delta
}
