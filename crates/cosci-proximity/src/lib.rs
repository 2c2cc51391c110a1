//! Co-Scientist Proximity Deduplicator
//!
//! Prunes redundancy from the active population:
//! - Candidate pair selection and the similarity matrix ([`matrix`])
//! - Deterministic duplicate folding and cluster trimming ([`fold`])
//! - Oracle-driven scoring and application ([`deduplicator`])
//! - A lexical similarity oracle ([`lexical`])
//!
//! A pair the oracle cannot score counts as dissimilar, so failures never
//! merge hypotheses.

pub mod deduplicator;
pub mod error;
pub mod fold;
pub mod lexical;
pub mod matrix;

pub use deduplicator::{apply_plan, DedupOutcome, Deduplicator, Scoring, SimilarityFailure};
pub use error::DedupError;
pub use fold::{fold_clusters, DedupPlan, Fold, FoldReason, FoldSettings};
pub use lexical::LexicalSimilarity;
pub use matrix::{candidate_pairs, normalize_score, SimilarityMatrix};
