//! Deduplication errors

use cosci_core::PopulationError;

/// Deduplication failures
///
/// Similarity oracle failures are not errors here: a pair that cannot be
/// scored counts as dissimilar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DedupError {
    /// Duplicate threshold does not dominate the proximity threshold
    #[error("duplicate threshold ({duplicate}) must be strictly greater than proximity threshold ({proximity})")]
    ThresholdOrder {
        /// Configured duplicate threshold
        duplicate: f64,
        /// Configured proximity threshold
        proximity: f64,
    },

    /// Applying a fold to the population failed
    #[error("population update failed: {0}")]
    Population(#[from] PopulationError),
}
