//! Response cache for pure capabilities using moka
//!
//! Judging and similarity results depend only on their inputs, and the
//! tournament's seeded pairing makes repeated runs ask the same questions.
//! Responses are keyed by a BLAKE3 digest of the inputs; failures are never
//! cached.

use cosci_core::{CapabilityError, Judge, SimilarityOracle, Verdict};
use moka::future::Cache;
use std::future::Future;
use tracing::debug;

/// Digest of a capability call's inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallKey([u8; 32]);

impl CallKey {
    /// Digest a domain tag and ordered input parts
    ///
    /// Parts are length-prefixed so `("ab", "c")` and `("a", "bc")` differ.
    #[must_use]
    pub fn digest(domain: &str, parts: &[&str]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }
}

/// Keyed store of successful responses
#[derive(Debug, Clone)]
pub struct ResponseCache<V: Clone + Send + Sync + 'static> {
    inner: Cache<CallKey, V>,
}

impl<V: Clone + Send + Sync + 'static> ResponseCache<V> {
    /// Create cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Cached response
    #[inline]
    pub async fn get(&self, key: &CallKey) -> Option<V> {
        self.inner.get(key).await
    }

    /// Store a response
    #[inline]
    pub async fn insert(&self, key: CallKey, value: V) {
        self.inner.insert(key, value).await;
    }

    /// Cached response, or the result of `call` stored on success
    ///
    /// # Errors
    /// The error returned by `call`; errors are not cached.
    pub async fn try_get_or_insert_with<F, Fut>(&self, key: CallKey, call: F) -> Result<V, CapabilityError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, CapabilityError>>,
    {
        if let Some(cached) = self.get(&key).await {
            debug!("capability response served from cache");
            return Ok(cached);
        }
        let value = call().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

/// Default capacity (10,000 responses)
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Judge with memoized verdicts
///
/// Keyed on goal and both texts in side order, since swapping sides is a
/// different question.
#[derive(Debug, Clone)]
pub struct CachedJudge<J> {
    inner: J,
    cache: ResponseCache<Verdict>,
}

impl<J: Judge> CachedJudge<J> {
    /// Wrap a judge
    #[must_use]
    pub fn new(inner: J, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: ResponseCache::new(max_capacity),
        }
    }

    /// Underlying cache
    #[must_use]
    pub fn cache(&self) -> &ResponseCache<Verdict> {
        &self.cache
    }
}

#[async_trait::async_trait]
impl<J: Judge> Judge for CachedJudge<J> {
    async fn judge(&self, goal: &str, text_a: &str, text_b: &str) -> Result<Verdict, CapabilityError> {
        let key = CallKey::digest("judge", &[goal, text_a, text_b]);
        self.cache
            .try_get_or_insert_with(key, || self.inner.judge(goal, text_a, text_b))
            .await
    }
}

/// Similarity oracle with memoized scores
///
/// The key is order-independent because similarity is symmetric.
#[derive(Debug, Clone)]
pub struct CachedSimilarity<S> {
    inner: S,
    cache: ResponseCache<f64>,
}

impl<S: SimilarityOracle> CachedSimilarity<S> {
    /// Wrap an oracle
    #[must_use]
    pub fn new(inner: S, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: ResponseCache::new(max_capacity),
        }
    }

    /// Underlying cache
    #[must_use]
    pub fn cache(&self) -> &ResponseCache<f64> {
        &self.cache
    }

    fn key(text_a: &str, text_b: &str) -> CallKey {
        let (low, high) = if text_a <= text_b {
            (text_a, text_b)
        } else {
            (text_b, text_a)
        };
        CallKey::digest("similarity", &[low, high])
    }
}

#[async_trait::async_trait]
impl<S: SimilarityOracle> SimilarityOracle for CachedSimilarity<S> {
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, CapabilityError> {
        self.cache
            .try_get_or_insert_with(Self::key(text_a, text_b), || {
                self.inner.similarity(text_a, text_b)
            })
            .await
    }

    async fn similarity_batch(
        &self,
        pairs: &[(&str, &str)],
        concurrency: usize,
    ) -> Vec<Result<f64, CapabilityError>> {
        let mut results: Vec<Option<Result<f64, CapabilityError>>> = Vec::with_capacity(pairs.len());
        let mut misses = Vec::new();
        for (i, (a, b)) in pairs.iter().enumerate() {
            match self.cache.get(&Self::key(a, b)).await {
                Some(score) => results.push(Some(Ok(score))),
                None => {
                    results.push(None);
                    misses.push(i);
                }
            }
        }

        if !misses.is_empty() {
            let uncached: Vec<(&str, &str)> = misses.iter().map(|&i| pairs[i]).collect();
            let scored = self.inner.similarity_batch(&uncached, concurrency).await;
            for (&i, result) in misses.iter().zip(scored) {
                if let Ok(score) = &result {
                    let (a, b) = pairs[i];
                    self.cache.insert(Self::key(a, b), *score).await;
                }
                results[i] = Some(result);
            }
        }

        results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(CapabilityError::malformed(
                        cosci_core::Capability::Similarity,
                        "batch response shorter than request",
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosci_core::MatchOutcome;
    use cosci_test_utils::{FailingJudge, ScriptedJudge, TableSimilarity};

    #[test]
    fn digest_separates_parts() {
        assert_ne!(
            CallKey::digest("judge", &["ab", "c"]),
            CallKey::digest("judge", &["a", "bc"])
        );
        assert_ne!(
            CallKey::digest("judge", &["a"]),
            CallKey::digest("similarity", &["a"])
        );
        assert_eq!(
            CallKey::digest("judge", &["goal", "x"]),
            CallKey::digest("judge", &["goal", "x"])
        );
    }

    #[tokio::test]
    async fn repeated_verdicts_are_served_from_cache() {
        let judge = CachedJudge::new(ScriptedJudge::ranked(&["H1", "H2"]), 100);
        let first = judge.judge("goal", "H1", "H2").await.unwrap();
        let second = judge.judge("goal", "H1", "H2").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.outcome, MatchOutcome::AWins);
        assert_eq!(judge.inner.calls(), 1);

        judge.judge("goal", "H2", "H1").await.unwrap();
        assert_eq!(judge.inner.calls(), 2);
    }

    #[tokio::test]
    async fn invalidation_forces_fresh_verdicts() {
        let judge = CachedJudge::new(ScriptedJudge::ranked(&["H1", "H2"]), DEFAULT_CAPACITY);
        judge.judge("goal", "H1", "H2").await.unwrap();
        judge.cache().invalidate_all();
        judge.judge("goal", "H1", "H2").await.unwrap();
        assert_eq!(judge.inner.calls(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let judge = CachedJudge::new(FailingJudge::default(), 100);
        assert!(judge.judge("goal", "a", "b").await.is_err());
        assert!(judge.judge("goal", "a", "b").await.is_err());
        assert_eq!(judge.inner.calls(), 2);
    }

    #[tokio::test]
    async fn similarity_key_ignores_argument_order() {
        let oracle = CachedSimilarity::new(TableSimilarity::new().with("a", "b", 0.4), 100);
        assert_eq!(oracle.similarity("a", "b").await, Ok(0.4));
        assert_eq!(oracle.similarity("b", "a").await, Ok(0.4));
        assert_eq!(oracle.inner.calls(), 1);
    }

    #[tokio::test]
    async fn batch_only_scores_misses() {
        let oracle = CachedSimilarity::new(
            TableSimilarity::new().with("a", "b", 0.4).with("c", "d", 0.9),
            100,
        );
        oracle.similarity("a", "b").await.unwrap();

        let results = oracle.similarity_batch(&[("b", "a"), ("c", "d")], 2).await;
        assert_eq!(results, vec![Ok(0.4), Ok(0.9)]);
        assert_eq!(oracle.inner.calls(), 2);
    }
}
