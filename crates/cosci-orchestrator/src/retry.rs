//! Retry policy for capability adapters
//!
//! Retries are an adapter concern: [`Retrying`] wraps any capability and
//! re-issues calls that fail with a retryable [`CapabilityError`], sleeping
//! on an exponential schedule between attempts. Stages never retry on their
//! own.

use cosci_core::{
    CapabilityError, EvolutionRequest, Evolver, GenerationContext, Generator, Judge,
    LiteratureContext, LiteratureSource, MetaReview, MetaReviewer, ReflectionNote, Reflector,
    RetryConfig, Review, ReviewRequest, ReviewedHypothesis, Reviewer, SimilarityOracle,
    Supervisor, SupervisorGuidance, Verdict,
};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Attempt budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Create policy
    ///
    /// `max_attempts` counts the first call; it is raised to 1 if zero.
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }

    /// Policy that never retries
    #[must_use]
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// With backoff multiplier
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// With backoff ceiling
    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Total attempts per call
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (1-based)
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(scaled)
    }

    /// Run `call` until it succeeds, fails permanently, or the budget is spent
    ///
    /// # Errors
    /// The last error returned by `call`.
    pub async fn run<T, F, Fut>(&self, mut call: F) -> Result<T, CapabilityError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CapabilityError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        capability = %error.capability(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %error,
                        "retrying capability call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.initial_backoff_ms))
            .with_multiplier(config.multiplier)
            .with_max_backoff(Duration::from_millis(config.max_backoff_ms))
    }
}

/// Capability wrapped in a retry policy
#[derive(Debug, Clone)]
pub struct Retrying<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> Retrying<C> {
    /// Wrap a capability
    #[must_use]
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Wrapped capability
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<C: Generator> Generator for Retrying<C> {
    async fn generate(&self, context: &GenerationContext) -> Result<String, CapabilityError> {
        self.policy.run(move || self.inner.generate(context)).await
    }
}

#[async_trait::async_trait]
impl<C: Judge> Judge for Retrying<C> {
    async fn judge(&self, goal: &str, text_a: &str, text_b: &str) -> Result<Verdict, CapabilityError> {
        self.policy.run(move || self.inner.judge(goal, text_a, text_b)).await
    }
}

#[async_trait::async_trait]
impl<C: Reviewer> Reviewer for Retrying<C> {
    async fn review(&self, request: &ReviewRequest) -> Result<Vec<Option<Review>>, CapabilityError> {
        self.policy.run(move || self.inner.review(request)).await
    }
}

#[async_trait::async_trait]
impl<C: SimilarityOracle> SimilarityOracle for Retrying<C> {
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, CapabilityError> {
        self.policy.run(move || self.inner.similarity(text_a, text_b)).await
    }

    async fn similarity_batch(
        &self,
        pairs: &[(&str, &str)],
        concurrency: usize,
    ) -> Vec<Result<f64, CapabilityError>> {
        let mut results = self.inner.similarity_batch(pairs, concurrency).await;
        for (result, (a, b)) in results.iter_mut().zip(pairs) {
            if matches!(result, Err(error) if error.is_retryable()) {
                *result = self.similarity(a, b).await;
            }
        }
        results
    }
}

#[async_trait::async_trait]
impl<C: MetaReviewer> MetaReviewer for Retrying<C> {
    async fn meta_review(
        &self,
        goal: &str,
        ranked: &[ReviewedHypothesis],
    ) -> Result<MetaReview, CapabilityError> {
        self.policy.run(move || self.inner.meta_review(goal, ranked)).await
    }
}

#[async_trait::async_trait]
impl<C: Evolver> Evolver for Retrying<C> {
    async fn evolve(&self, request: &EvolutionRequest) -> Result<String, CapabilityError> {
        self.policy.run(move || self.inner.evolve(request)).await
    }
}

#[async_trait::async_trait]
impl<C: LiteratureSource> LiteratureSource for Retrying<C> {
    async fn search(&self, goal: &str) -> Result<LiteratureContext, CapabilityError> {
        self.policy.run(move || self.inner.search(goal)).await
    }
}

#[async_trait::async_trait]
impl<C: Supervisor> Supervisor for Retrying<C> {
    async fn plan(&self, goal: &str) -> Result<SupervisorGuidance, CapabilityError> {
        self.policy.run(move || self.inner.plan(goal)).await
    }
}

#[async_trait::async_trait]
impl<C: Reflector> Reflector for Retrying<C> {
    async fn reflect(
        &self,
        goal: &str,
        literature: &LiteratureContext,
        text: &str,
    ) -> Result<ReflectionNote, CapabilityError> {
        self.policy.run(move || self.inner.reflect(goal, literature, text)).await
    }
}
