//! Co-Scientist Core
//!
//! Shared foundation for the hypothesis workflow:
//! - Hypothesis records, ids and lifecycle status
//! - Elo scoring primitives
//! - The population store through which all mutations flow
//! - Workflow configuration and its validation
//! - Contracts for the external capabilities the workflow consumes
//!
//! # Example
//!
//! ```rust
//! use cosci_core::{HypothesisDraft, MatchOutcome, PopulationStore};
//!
//! let mut store = PopulationStore::new(1200.0);
//! let a = store.add(HypothesisDraft::generated("gut flora modulate sleep"), 0).unwrap();
//! let b = store.add(HypothesisDraft::generated("sleep modulates gut flora"), 0).unwrap();
//!
//! store.apply_match(a, b, MatchOutcome::AWins, 24.0).unwrap();
//! assert_eq!(store.ranked_active()[0].id(), a);
//! ```

pub mod capability;
pub mod config;
pub mod elo;
pub mod error;
pub mod review;
pub mod store;
pub mod types;

pub use capability::{
    bounded, EvolutionRequest, Evolver, GenerationContext, Generator, Judge, LiteratureContext,
    LiteratureSource, MetaReviewer, Reflector, ReviewMode, ReviewRequest, ReviewTarget,
    ReviewedHypothesis, Reviewer, SimilarityOracle, Supervisor, SupervisorGuidance, Verdict,
};
pub use config::{
    EloConfig, LiteratureConfig, ProximityConfig, RetryConfig, ReviewConfig, TournamentConfig,
    WorkflowConfig,
};
pub use elo::{EloAdjustment, MatchOutcome, RatingChange};
pub use error::{
    Capability, CapabilityError, ConfigError, Diagnostic, PopulationError, Severity,
};
pub use review::{
    MetaReview, ReflectionClass, ReflectionNote, Review, ReviewRecord, ReviewScores,
};
pub use store::{HypothesisPatch, PopulationStore};
pub use types::{rank_order, Hypothesis, HypothesisDraft, HypothesisId, RunId, Stage, Status};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the Co-Scientist core
    pub use crate::{
        Capability, CapabilityError, Hypothesis, HypothesisDraft, HypothesisId, MatchOutcome,
        PopulationStore, Stage, Status, WorkflowConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
