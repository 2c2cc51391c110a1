//! Stage transition rules
//!
//! `Init → Generate → Review → Rank`, then either `Terminal` (no refinement
//! iterations) or the refinement loop
//! `MetaReview → Evolve → ReReview → ReRank → Deduplicate`, which returns to
//! `MetaReview` until the iteration bound is reached. Any non-terminal stage
//! may move to `Cancelled`.

use crate::error::WorkflowError;
use cosci_core::Stage;

/// Stages reachable from `from`
#[must_use]
pub fn allowed_transitions(from: Stage) -> Vec<Stage> {
    use Stage::{
        Cancelled, Deduplicate, Evolve, Generate, Init, MetaReview, Rank, ReRank, ReReview,
        Review, Terminal,
    };
    match from {
        Init => vec![Generate, Cancelled],
        Generate => vec![Review, Cancelled],
        Review => vec![Rank, Cancelled],
        Rank => vec![Terminal, MetaReview, Cancelled],
        MetaReview => vec![Evolve, Cancelled],
        Evolve => vec![ReReview, Cancelled],
        ReReview => vec![ReRank, Cancelled],
        ReRank => vec![Deduplicate, Cancelled],
        Deduplicate => vec![MetaReview, Terminal, Cancelled],
        Terminal | Cancelled => vec![],
    }
}

/// Validate a transition
///
/// # Errors
/// `IllegalTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), WorkflowError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

/// Stage that follows a successfully completed `current`
///
/// `iteration` is the counter before the transition; the caller increments
/// it when `Deduplicate` loops back to `MetaReview`.
#[must_use]
pub fn next_stage(current: Stage, iteration: u32, max_iterations: u32) -> Stage {
    match current {
        Stage::Init => Stage::Generate,
        Stage::Generate => Stage::Review,
        Stage::Review => Stage::Rank,
        Stage::Rank if max_iterations == 0 => Stage::Terminal,
        Stage::Rank => Stage::MetaReview,
        Stage::MetaReview => Stage::Evolve,
        Stage::Evolve => Stage::ReReview,
        Stage::ReReview => Stage::ReRank,
        Stage::ReRank => Stage::Deduplicate,
        Stage::Deduplicate if iteration.saturating_add(1) < max_iterations => Stage::MetaReview,
        Stage::Deduplicate | Stage::Terminal => Stage::Terminal,
        Stage::Cancelled => Stage::Cancelled,
    }
}
