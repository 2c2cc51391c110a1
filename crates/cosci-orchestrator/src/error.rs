//! Workflow errors
//!
//! Only fatal conditions become a [`WorkflowError`]. Recoverable failures
//! are recorded as diagnostics on the workflow state instead.

use cosci_core::{CapabilityError, ConfigError, PopulationError, Stage};
use cosci_proximity::DedupError;
use cosci_tournament::TournamentError;

/// Why a stage could not produce a result
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StageFailure {
    /// Capability failure with no usable output
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Tournament could not be played
    #[error(transparent)]
    Tournament(#[from] TournamentError),

    /// Deduplication could not be planned
    #[error(transparent)]
    Dedup(#[from] DedupError),

    /// Stage ran but produced nothing it is required to produce
    #[error("{0}")]
    NoOutput(String),
}

/// Fatal workflow errors
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Configuration rejected before the run started
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The research goal is empty
    #[error("research goal must not be empty")]
    EmptyGoal,

    /// A load-bearing stage failed
    #[error("stage `{stage}` failed in iteration {iteration}: {cause}")]
    StageFailed {
        /// Failing stage
        stage: Stage,
        /// Iteration at the time of failure
        iteration: u32,
        /// Underlying cause
        #[source]
        cause: StageFailure,
    },

    /// Merging a stage result into the population failed
    #[error("population update failed: {0}")]
    Population(#[from] PopulationError),

    /// The state machine was asked to make an illegal move
    #[error("illegal stage transition: {from} -> {to}")]
    IllegalTransition {
        /// Current stage
        from: Stage,
        /// Requested stage
        to: Stage,
    },
}

impl WorkflowError {
    /// Create a stage failure
    #[inline]
    pub fn stage_failed(stage: Stage, iteration: u32, cause: impl Into<StageFailure>) -> Self {
        Self::StageFailed {
            stage,
            iteration,
            cause: cause.into(),
        }
    }

    /// Stage the error is attributed to, if any
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            Self::IllegalTransition { from, .. } => Some(*from),
            _ => None,
        }
    }
}
