//! External capability contracts
//!
//! The workflow consumes generation, judging, review, similarity,
//! meta-review, evolution, literature, supervision and reflection through
//! these narrow traits.
//! Implementations own their own prompting and transport; the core only
//! sees typed requests and typed results.
//!
//! Every trait is implemented for `Arc<T>` so adapters (retry, cache) can
//! wrap shared trait objects.

use crate::elo::MatchOutcome;
use crate::error::{Capability, CapabilityError};
use crate::review::{MetaReview, ReflectionNote, Review, ReviewRecord};
use crate::types::HypothesisId;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Await a capability call, failing with `CapabilityError::Timeout` once
/// `limit` elapses
///
/// # Errors
/// The call's own error, or a timeout tagged with `capability`.
pub async fn bounded<T, F>(capability: Capability, limit: Duration, call: F) -> Result<T, CapabilityError>
where
    F: Future<Output = Result<T, CapabilityError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CapabilityError::Timeout {
            capability,
            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Literature context used to ground generation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiteratureContext {
    /// Condensed findings relevant to the goal
    pub summary: String,
    /// Citation strings
    pub references: Vec<String>,
}

/// Research plan produced once per run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SupervisorGuidance {
    /// Key research areas identified in the goal
    pub key_areas: Vec<String>,
    /// Areas generation should concentrate on
    pub focus_areas: Vec<String>,
    /// How varied the generated hypotheses should be
    pub diversity_targets: String,
}

impl SupervisorGuidance {
    /// Check if the plan carries no guidance
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_areas.is_empty() && self.focus_areas.is_empty() && self.diversity_targets.trim().is_empty()
    }
}

/// Input to one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationContext {
    /// Research goal
    pub goal: String,
    /// Literature grounding, absent in degraded mode
    pub literature: Option<LiteratureContext>,
    /// Position of this call within the generation batch
    pub index: usize,
    /// Latest meta-review, if any
    pub meta_review: Option<MetaReview>,
    /// Supervisor's research plan, if one was produced
    pub guidance: Option<SupervisorGuidance>,
}

/// Hypothesis text generation
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Produce one hypothesis text
    async fn generate(&self, context: &GenerationContext) -> Result<String, CapabilityError>;
}

/// Judge decision for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Preferred side
    pub outcome: MatchOutcome,
    /// Free-text justification
    pub rationale: String,
}

impl Verdict {
    /// Verdict without rationale
    #[inline]
    #[must_use]
    pub fn new(outcome: MatchOutcome) -> Self {
        Self {
            outcome,
            rationale: String::new(),
        }
    }
}

/// Pairwise judging for tournament matches
#[async_trait::async_trait]
pub trait Judge: Send + Sync {
    /// Decide between `text_a` and `text_b` for `goal`
    async fn judge(&self, goal: &str, text_a: &str, text_b: &str) -> Result<Verdict, CapabilityError>;
}

/// How a review call covers its targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    /// All targets in one call, scored relative to each other
    Comparative,
    /// One target per call
    Individual,
}

/// One hypothesis submitted for review
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewTarget {
    /// Hypothesis id
    pub id: HypothesisId,
    /// Hypothesis text
    pub text: String,
    /// Reflection against the literature, if one was made
    pub reflection: Option<ReflectionNote>,
}

/// Input to one review call
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRequest {
    /// Research goal
    pub goal: String,
    /// Hypotheses to review
    pub targets: Vec<ReviewTarget>,
    /// Review strategy
    pub mode: ReviewMode,
    /// Latest meta-review, if any
    pub meta_review: Option<MetaReview>,
    /// Supervisor's research plan, if one was produced
    pub guidance: Option<SupervisorGuidance>,
}

/// Per-hypothesis review scoring
#[async_trait::async_trait]
pub trait Reviewer: Send + Sync {
    /// Review every target
    ///
    /// The result is positionally aligned with `request.targets`. A `None`
    /// entry, or a missing trailing entry, means the reviewer produced
    /// nothing usable for that target.
    async fn review(&self, request: &ReviewRequest) -> Result<Vec<Option<Review>>, CapabilityError>;
}

/// Pairwise text similarity
///
/// Scores must be symmetric and lie in `[0, 1]`; callers clamp anything
/// outside that range.
#[async_trait::async_trait]
pub trait SimilarityOracle: Send + Sync {
    /// Similarity of two texts
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, CapabilityError>;

    /// Score many pairs, returning results in input order
    ///
    /// The default issues up to `concurrency` calls at a time.
    async fn similarity_batch(
        &self,
        pairs: &[(&str, &str)],
        concurrency: usize,
    ) -> Vec<Result<f64, CapabilityError>> {
        let calls: Vec<_> = pairs.iter().map(|&(a, b)| self.similarity(a, b)).collect();
        stream::iter(calls)
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

/// Reviewed hypothesis summary handed to the meta-reviewer
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewedHypothesis {
    /// Hypothesis id
    pub id: HypothesisId,
    /// Hypothesis text
    pub text: String,
    /// Current rating
    pub rating: f64,
    /// Latest review
    pub review: Option<ReviewRecord>,
}

/// Population-level synthesis
#[async_trait::async_trait]
pub trait MetaReviewer: Send + Sync {
    /// Synthesize insight from the ranked population
    async fn meta_review(
        &self,
        goal: &str,
        ranked: &[ReviewedHypothesis],
    ) -> Result<MetaReview, CapabilityError>;
}

/// Input to one evolution call
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionRequest {
    /// Research goal
    pub goal: String,
    /// Parent hypothesis
    pub parent: HypothesisId,
    /// Parent text
    pub text: String,
    /// Parent's latest review feedback
    pub feedback: Option<String>,
    /// Latest meta-review, if any
    pub meta_review: Option<MetaReview>,
}

/// Hypothesis refinement
#[async_trait::async_trait]
pub trait Evolver: Send + Sync {
    /// Produce a refined descendant text
    async fn evolve(&self, request: &EvolutionRequest) -> Result<String, CapabilityError>;
}

/// Literature grounding
#[async_trait::async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Gather literature relevant to `goal`
    async fn search(&self, goal: &str) -> Result<LiteratureContext, CapabilityError>;
}

/// Research planning ahead of generation
#[async_trait::async_trait]
pub trait Supervisor: Send + Sync {
    /// Analyse `goal` and produce a plan for the run
    async fn plan(&self, goal: &str) -> Result<SupervisorGuidance, CapabilityError>;
}

/// Per-hypothesis analysis against literature observations
#[async_trait::async_trait]
pub trait Reflector: Send + Sync {
    /// Classify `text` against the observations in `literature`
    async fn reflect(
        &self,
        goal: &str,
        literature: &LiteratureContext,
        text: &str,
    ) -> Result<ReflectionNote, CapabilityError>;
}

#[async_trait::async_trait]
impl<T: Generator + ?Sized> Generator for Arc<T> {
    async fn generate(&self, context: &GenerationContext) -> Result<String, CapabilityError> {
        (**self).generate(context).await
    }
}

#[async_trait::async_trait]
impl<T: Judge + ?Sized> Judge for Arc<T> {
    async fn judge(&self, goal: &str, text_a: &str, text_b: &str) -> Result<Verdict, CapabilityError> {
        (**self).judge(goal, text_a, text_b).await
    }
}

#[async_trait::async_trait]
impl<T: Reviewer + ?Sized> Reviewer for Arc<T> {
    async fn review(&self, request: &ReviewRequest) -> Result<Vec<Option<Review>>, CapabilityError> {
        (**self).review(request).await
    }
}

#[async_trait::async_trait]
impl<T: SimilarityOracle + ?Sized> SimilarityOracle for Arc<T> {
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, CapabilityError> {
        (**self).similarity(text_a, text_b).await
    }

    async fn similarity_batch(
        &self,
        pairs: &[(&str, &str)],
        concurrency: usize,
    ) -> Vec<Result<f64, CapabilityError>> {
        (**self).similarity_batch(pairs, concurrency).await
    }
}

#[async_trait::async_trait]
impl<T: MetaReviewer + ?Sized> MetaReviewer for Arc<T> {
    async fn meta_review(
        &self,
        goal: &str,
        ranked: &[ReviewedHypothesis],
    ) -> Result<MetaReview, CapabilityError> {
        (**self).meta_review(goal, ranked).await
    }
}

#[async_trait::async_trait]
impl<T: Evolver + ?Sized> Evolver for Arc<T> {
    async fn evolve(&self, request: &EvolutionRequest) -> Result<String, CapabilityError> {
        (**self).evolve(request).await
    }
}

#[async_trait::async_trait]
impl<T: LiteratureSource + ?Sized> LiteratureSource for Arc<T> {
    async fn search(&self, goal: &str) -> Result<LiteratureContext, CapabilityError> {
        (**self).search(goal).await
    }
}

#[async_trait::async_trait]
impl<T: Supervisor + ?Sized> Supervisor for Arc<T> {
    async fn plan(&self, goal: &str) -> Result<SupervisorGuidance, CapabilityError> {
        (**self).plan(goal).await
    }
}

#[async_trait::async_trait]
impl<T: Reflector + ?Sized> Reflector for Arc<T> {
    async fn reflect(
        &self,
        goal: &str,
        literature: &LiteratureContext,
        text: &str,
    ) -> Result<ReflectionNote, CapabilityError> {
        (**self).reflect(goal, literature, text).await
    }
}
