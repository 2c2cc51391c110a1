//! Stage executors
//!
//! Every stage reads the workflow state by reference and returns a
//! [`StageDelta`]. Concurrent work inside a stage completes before the
//! delta is built, so a delta is never partial.

mod deduplicate;
mod evolve;
mod generate;
mod meta_review;
mod rank;
mod review;

use crate::capabilities::Capabilities;
use crate::error::StageFailure;
use crate::state::{StageDelta, WorkflowState};
use cosci_core::{Stage, WorkflowConfig};
use std::time::Duration;

/// Shared inputs of every stage
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageContext<'a> {
    pub(crate) capabilities: &'a Capabilities,
    pub(crate) config: &'a WorkflowConfig,
}

impl StageContext<'_> {
    pub(crate) fn call_timeout(&self) -> Duration {
        self.config.call_timeout()
    }
}

/// Run one stage against the current state
pub(crate) async fn execute(
    stage: Stage,
    ctx: StageContext<'_>,
    state: &WorkflowState,
) -> Result<StageDelta, StageFailure> {
    match stage {
        Stage::Generate => generate::run(ctx, state).await,
        Stage::Review | Stage::ReReview => review::run(ctx, stage, state).await,
        Stage::Rank | Stage::ReRank => rank::run(ctx, stage, state).await,
        Stage::MetaReview => Ok(meta_review::run(ctx, state).await),
        Stage::Evolve => Ok(evolve::run(ctx, state).await),
        Stage::Deduplicate => deduplicate::run(ctx, state).await,
        Stage::Init | Stage::Terminal | Stage::Cancelled => Ok(StageDelta::new()),
    }
}

/// Trimmed text, or `None` if nothing is left
fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == text.len() {
        Some(text)
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::non_blank;

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank("  idea ".to_string()), Some("idea".to_string()));
        assert_eq!(non_blank("idea".to_string()), Some("idea".to_string()));
        assert_eq!(non_blank(" \n ".to_string()), None);
    }
}
