//! Error types for the Co-Scientist core
//!
//! Provides error handling for:
//! - Population store mutations
//! - Workflow configuration validation
//! - External capability calls (generation, judging, review, similarity, ...)
//! - Recoverable failures recorded as diagnostics

use crate::types::{HypothesisId, Stage, Status};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Population store errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PopulationError {
    /// A record with this id already exists
    #[error("duplicate hypothesis id: {0}")]
    DuplicateId(HypothesisId),

    /// No record with this id
    #[error("hypothesis not found: {0}")]
    NotFound(HypothesisId),

    /// Status may only move away from `active`
    #[error("illegal status transition for {id}: {from} -> {to}")]
    IllegalStatusTransition {
        /// Affected hypothesis
        id: HypothesisId,
        /// Current status
        from: Status,
        /// Requested status
        to: Status,
    },

    /// Review scores failed boundary validation
    #[error("invalid review scores for {id}: {reason}")]
    InvalidReviewScores {
        /// Affected hypothesis
        id: HypothesisId,
        /// Why the scores were rejected
        reason: String,
    },

    /// Rating change was computed against a rating that is no longer current
    #[error("stale rating change for {id}: expected {expected}, found {found}")]
    StaleRating {
        /// Affected hypothesis
        id: HypothesisId,
        /// Rating the change was computed from
        expected: f64,
        /// Rating currently stored
        found: f64,
    },

    /// A hypothesis cannot be folded into itself
    #[error("hypothesis {0} cannot be its own representative")]
    SelfRepresentative(HypothesisId),
}

/// Configuration errors
///
/// All configuration errors are fatal: a run never starts with an invalid
/// configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds a value outside its domain
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Dotted field path
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Duplicate threshold must dominate the proximity threshold
    #[error("duplicate threshold ({duplicate}) must be strictly greater than proximity threshold ({proximity})")]
    ThresholdOrder {
        /// Configured duplicate threshold
        duplicate: f64,
        /// Configured proximity threshold
        proximity: f64,
    },

    /// Configuration document could not be parsed
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// Configuration file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create an invalid value error
    #[inline]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// External capability kinds consumed by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Hypothesis text generation
    Generation,
    /// Pairwise judging for tournament matches
    Judging,
    /// Per-hypothesis review scoring
    Review,
    /// Pairwise text similarity
    Similarity,
    /// Population-level meta-review synthesis
    MetaReview,
    /// Hypothesis refinement
    Evolution,
    /// Literature grounding
    Literature,
    /// Research plan produced before generation
    Supervision,
    /// Per-hypothesis analysis against the literature
    Reflection,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Generation => "generation",
            Self::Judging => "judging",
            Self::Review => "review",
            Self::Similarity => "similarity",
            Self::MetaReview => "meta-review",
            Self::Evolution => "evolution",
            Self::Literature => "literature",
            Self::Supervision => "supervision",
            Self::Reflection => "reflection",
        };
        f.write_str(name)
    }
}

/// Error returned by an external capability
///
/// `GenerationError` and `JudgingError` are this type tagged with
/// [`Capability::Generation`] and [`Capability::Judging`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CapabilityError {
    /// The collaborator reported a failure
    #[error("{capability} failed: {message}")]
    Failed {
        /// Which capability failed
        capability: Capability,
        /// Collaborator-provided cause
        message: String,
        /// Whether another attempt may succeed
        retryable: bool,
    },

    /// The call exceeded its time bound
    #[error("{capability} timed out after {after_ms}ms")]
    Timeout {
        /// Which capability timed out
        capability: Capability,
        /// Elapsed bound in milliseconds
        after_ms: u64,
    },

    /// The collaborator answered with something unusable
    #[error("{capability} returned a malformed response: {message}")]
    Malformed {
        /// Which capability misbehaved
        capability: Capability,
        /// What was wrong with the response
        message: String,
    },

    /// The capability is not configured for this run
    #[error("{0} capability unavailable")]
    Unavailable(Capability),
}

impl CapabilityError {
    /// Create a retryable failure
    #[inline]
    pub fn transient(capability: Capability, message: impl Into<String>) -> Self {
        Self::Failed {
            capability,
            message: message.into(),
            retryable: true,
        }
    }

    /// Create a non-retryable failure
    #[inline]
    pub fn permanent(capability: Capability, message: impl Into<String>) -> Self {
        Self::Failed {
            capability,
            message: message.into(),
            retryable: false,
        }
    }

    /// Create a malformed-response error
    #[inline]
    pub fn malformed(capability: Capability, message: impl Into<String>) -> Self {
        Self::Malformed {
            capability,
            message: message.into(),
        }
    }

    /// Capability that produced this error
    #[inline]
    #[must_use]
    pub fn capability(&self) -> Capability {
        match self {
            Self::Failed { capability, .. }
            | Self::Timeout { capability, .. }
            | Self::Malformed { capability, .. } => *capability,
            Self::Unavailable(capability) => *capability,
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Failed { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            Self::Malformed { .. } | Self::Unavailable(_) => false,
        }
    }
}

/// Severity of a recorded diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational
    Info,
    /// Recoverable failure absorbed into state
    Warning,
    /// Failure that ended the run
    Fatal,
}

/// Diagnostic record for a recoverable (or terminal) condition
///
/// Recoverable errors never surface as run failures; they are kept here
/// for the diagnostics channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity classification
    pub severity: Severity,
    /// Stage that produced the diagnostic
    pub stage: Stage,
    /// Iteration at the time of the diagnostic
    pub iteration: u32,
    /// Hypotheses involved, if any
    pub subjects: Vec<HypothesisId>,
    /// Capability involved, if any
    pub capability: Option<Capability>,
    /// Human-readable message
    pub message: String,
}

impl Diagnostic {
    /// Create a warning diagnostic
    #[inline]
    #[must_use]
    pub fn warning(stage: Stage, iteration: u32, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            stage,
            iteration,
            subjects: Vec::new(),
            capability: None,
            message: message.into(),
        }
    }

    /// Create an informational diagnostic
    #[inline]
    #[must_use]
    pub fn info(stage: Stage, iteration: u32, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::warning(stage, iteration, message)
        }
    }

    /// Attach subject hypotheses
    #[inline]
    #[must_use]
    pub fn with_subjects(mut self, subjects: impl IntoIterator<Item = HypothesisId>) -> Self {
        self.subjects.extend(subjects);
        self
    }

    /// Attach the capability involved
    #[inline]
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = Some(capability);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_error_display() {
        let err = CapabilityError::transient(Capability::Judging, "rate limited");
        assert_eq!(err.to_string(), "judging failed: rate limited");
    }

    #[test]
    fn capability_error_is_retryable() {
        assert!(CapabilityError::transient(Capability::Generation, "x").is_retryable());
        assert!(CapabilityError::Timeout {
            capability: Capability::Review,
            after_ms: 10
        }
        .is_retryable());
        assert!(!CapabilityError::permanent(Capability::Generation, "x").is_retryable());
        assert!(!CapabilityError::malformed(Capability::Judging, "no winner").is_retryable());
        assert!(!CapabilityError::Unavailable(Capability::Literature).is_retryable());
    }

    #[test]
    fn capability_error_reports_capability() {
        let err = CapabilityError::Timeout {
            capability: Capability::Similarity,
            after_ms: 5,
        };
        assert_eq!(err.capability(), Capability::Similarity);
    }

    #[test]
    fn config_error_threshold_order_display() {
        let err = ConfigError::ThresholdOrder {
            duplicate: 0.8,
            proximity: 0.9,
        };
        assert!(err.to_string().contains("strictly greater"));
    }

    #[test]
    fn diagnostic_builder() {
        let diag = Diagnostic::warning(Stage::Rank, 2, "match skipped")
            .with_subjects([HypothesisId::new(1), HypothesisId::new(2)])
            .with_capability(Capability::Judging);

        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.subjects.len(), 2);
        assert_eq!(diag.capability, Some(Capability::Judging));
    }
}
