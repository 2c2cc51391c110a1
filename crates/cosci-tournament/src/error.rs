//! Tournament errors

use cosci_core::{CapabilityError, HypothesisId};

/// Tournament failures
///
/// A single judging failure never produces one of these; it skips the
/// match instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TournamentError {
    /// A planned pair references a hypothesis that is not active
    #[error("hypothesis {0} is not in the active population")]
    UnknownHypothesis(HypothesisId),

    /// A planned pair matches a hypothesis against itself
    #[error("hypothesis {0} cannot play itself")]
    SelfMatch(HypothesisId),

    /// Every planned match was skipped
    #[error("all {planned} planned matches were skipped; last cause: {last}")]
    AllMatchesSkipped {
        /// Number of planned matches
        planned: usize,
        /// Judging error of the final skipped match
        last: CapabilityError,
    },
}
