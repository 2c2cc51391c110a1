//! Review and ReReview
//!
//! Small target sets go to the reviewer in one comparative call; larger
//! ones fan out to one concurrent call per hypothesis. A target without a
//! usable review keeps its prior scores and is flagged incomplete.
//!
//! When literature is available, targets without a reflection note are
//! first classified against it; a failed reflection leaves the target
//! without a note and the review proceeds.
//!
//! Only the initial Review fails when nothing was reviewed; ReReview
//! covers evolved newcomers and never aborts the run.

use super::StageContext;
use crate::error::StageFailure;
use crate::metrics::RunMetrics;
use crate::state::{StageDelta, WorkflowState};
use cosci_core::{
    bounded, Capability, CapabilityError, Diagnostic, LiteratureContext, Reflector, Review,
    ReviewMode, ReviewRecord, ReviewRequest, ReviewTarget, Stage,
};
use futures::future::join_all;
use tracing::{debug, info, warn};

pub(super) async fn run(
    ctx: StageContext<'_>,
    stage: Stage,
    state: &WorkflowState,
) -> Result<StageDelta, StageFailure> {
    let iteration = state.iteration();
    let mut targets: Vec<ReviewTarget> = state
        .population()
        .get_active()
        .into_iter()
        .filter(|h| stage == Stage::Review || h.review().is_none())
        .map(|h| ReviewTarget {
            id: h.id(),
            text: h.text().to_string(),
            reflection: h.reflection().cloned(),
        })
        .collect();

    let mut delta = StageDelta::new();
    if targets.is_empty() {
        debug!(stage = %stage, iteration, "nothing to review");
        return Ok(delta);
    }

    if let (Some(reflector), Some(literature)) = (&ctx.capabilities.reflector, state.literature()) {
        reflect(ctx, stage, state, &**reflector, literature, &mut targets, &mut delta).await;
    }

    let mode = if targets.len() <= ctx.config.review.comparative_batch_threshold {
        ReviewMode::Comparative
    } else {
        ReviewMode::Individual
    };
    info!(stage = %stage, iteration, targets = targets.len(), ?mode, "reviewing hypotheses");

    let (outcomes, calls) = match mode {
        ReviewMode::Comparative => {
            let request = request(state, targets.clone(), mode);
            let outcomes = expand(call(ctx, &request).await, targets.len());
            (outcomes, 1)
        }
        ReviewMode::Individual => {
            let requests: Vec<ReviewRequest> = targets
                .iter()
                .map(|target| request(state, vec![target.clone()], mode))
                .collect();
            let results = join_all(requests.iter().map(|request| call(ctx, request))).await;
            let outcomes = results
                .into_iter()
                .flat_map(|result| expand(result, 1))
                .collect();
            (outcomes, requests.len())
        }
    };

    let mut last_error = None;
    for (target, outcome) in targets.iter().zip(outcomes) {
        let outcome = outcome.and_then(|review| {
            review
                .scores
                .validate()
                .map(|()| review)
                .map_err(|reason| CapabilityError::malformed(Capability::Review, reason))
        });
        match outcome {
            Ok(review) => delta
                .reviews
                .push((target.id, ReviewRecord::from_review(review, iteration))),
            Err(error) => {
                warn!(stage = %stage, iteration, hypothesis = %target.id, %error, "review incomplete");
                delta.diagnostics.push(
                    Diagnostic::warning(stage, iteration, format!("review incomplete: {error}"))
                        .with_subjects([target.id])
                        .with_capability(Capability::Review),
                );
                delta.incomplete_reviews.push(target.id);
                last_error = Some(error);
            }
        }
    }

    if stage == Stage::Review && delta.reviews.is_empty() {
        return Err(match last_error {
            Some(error) => StageFailure::Capability(error),
            None => StageFailure::NoOutput("no review produced".to_string()),
        });
    }

    delta.metrics += RunMetrics {
        reviews_completed: delta.reviews.len(),
        reviews_incomplete: delta.incomplete_reviews.len(),
        capability_calls: calls,
        ..RunMetrics::default()
    };
    Ok(delta)
}

/// Classify unreflected targets against the literature
async fn reflect(
    ctx: StageContext<'_>,
    stage: Stage,
    state: &WorkflowState,
    reflector: &dyn Reflector,
    literature: &LiteratureContext,
    targets: &mut [ReviewTarget],
    delta: &mut StageDelta,
) {
    let iteration = state.iteration();
    let goal = state.research_goal();
    let pending: Vec<usize> = (0..targets.len())
        .filter(|&i| targets[i].reflection.is_none())
        .collect();
    if pending.is_empty() {
        return;
    }

    let view: &[ReviewTarget] = targets;
    let results = join_all(pending.iter().map(|&i| {
        bounded(
            Capability::Reflection,
            ctx.call_timeout(),
            reflector.reflect(goal, literature, &view[i].text),
        )
    }))
    .await;

    delta.metrics += RunMetrics::calls(pending.len());
    for (i, result) in pending.into_iter().zip(results) {
        let target = &mut targets[i];
        match result {
            Ok(note) => {
                debug!(stage = %stage, iteration, hypothesis = %target.id, class = note.classification.name(), "reflected");
                delta.reflections.push((target.id, note.clone()));
                target.reflection = Some(note);
            }
            Err(error) => {
                warn!(stage = %stage, iteration, hypothesis = %target.id, %error, "reflection failed");
                delta.diagnostics.push(
                    Diagnostic::warning(stage, iteration, format!("reflection failed: {error}"))
                        .with_subjects([target.id])
                        .with_capability(Capability::Reflection),
                );
            }
        }
    }
}

fn request(state: &WorkflowState, targets: Vec<ReviewTarget>, mode: ReviewMode) -> ReviewRequest {
    ReviewRequest {
        goal: state.research_goal().to_string(),
        targets,
        mode,
        meta_review: state.meta_review().cloned(),
        guidance: state.guidance().cloned(),
    }
}

async fn call(
    ctx: StageContext<'_>,
    request: &ReviewRequest,
) -> Result<Vec<Option<Review>>, CapabilityError> {
    bounded(
        Capability::Review,
        ctx.call_timeout(),
        ctx.capabilities.reviewer.review(request),
    )
    .await
}

/// One outcome per target: a call failure fails every target, a missing
/// entry fails its own target
fn expand(
    result: Result<Vec<Option<Review>>, CapabilityError>,
    targets: usize,
) -> Vec<Result<Review, CapabilityError>> {
    match result {
        Ok(mut reviews) => {
            reviews.resize(targets, None);
            reviews
                .into_iter()
                .map(|entry| {
                    entry.ok_or_else(|| {
                        CapabilityError::malformed(Capability::Review, "no review returned for hypothesis")
                    })
                })
                .collect()
        }
        Err(error) => vec![Err(error); targets],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosci_core::ReviewScores;

    #[test]
    fn expand_pads_missing_entries() {
        let review = Review::new(ReviewScores::new().with("novelty", 2.0));
        let outcomes = expand(Ok(vec![Some(review.clone()), None]), 3);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0], Ok(review));
        assert!(outcomes[1].is_err());
        assert!(outcomes[2].is_err());
    }

    #[test]
    fn expand_truncates_extra_entries() {
        let review = Review::default();
        assert_eq!(expand(Ok(vec![Some(review.clone()), Some(review)]), 1).len(), 1);
    }

    #[test]
    fn expand_spreads_call_failure() {
        let error = CapabilityError::permanent(Capability::Review, "down");
        assert_eq!(expand(Err(error.clone()), 2), vec![Err(error.clone()), Err(error)]);
    }
}
