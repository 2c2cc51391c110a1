//! Proximity deduplicator
//!
//! Scores candidate pairs through the similarity oracle (concurrently, in
//! bounded batches), then hands the matrix to the pure folding step.

use crate::error::DedupError;
use crate::fold::{fold_clusters, DedupPlan, FoldSettings};
use crate::matrix::{candidate_pairs, SimilarityMatrix};
use cosci_core::{
    bounded, Capability, CapabilityError, HypothesisId, PopulationStore, ProximityConfig,
    SimilarityOracle,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A pair the oracle could not score
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityFailure {
    /// First hypothesis
    pub a: HypothesisId,
    /// Second hypothesis
    pub b: HypothesisId,
    /// Oracle error
    pub error: CapabilityError,
}

/// Scores gathered for one pass
#[derive(Debug, Clone, Default)]
pub struct Scoring {
    /// Active ids in rank order
    pub ranked: Vec<HypothesisId>,
    /// Pair scores
    pub matrix: SimilarityMatrix,
    /// Pairs submitted to the oracle
    pub comparisons: usize,
    /// Pairs treated as dissimilar after a failure
    pub failures: Vec<SimilarityFailure>,
}

/// Result of planning one pass
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Folds to apply
    pub plan: DedupPlan,
    /// Pairs submitted to the oracle
    pub comparisons: usize,
    /// Pairs treated as dissimilar after a failure
    pub failures: Vec<SimilarityFailure>,
}

/// Similarity-based population pruning
#[derive(Debug, Clone)]
pub struct Deduplicator<S> {
    oracle: S,
    config: ProximityConfig,
    call_timeout: Duration,
}

impl<S: SimilarityOracle> Deduplicator<S> {
    /// Create deduplicator
    ///
    /// # Errors
    /// `ThresholdOrder` unless the duplicate threshold is strictly greater
    /// than the proximity threshold.
    pub fn new(oracle: S, config: ProximityConfig) -> Result<Self, DedupError> {
        if config.duplicate_threshold <= config.proximity_threshold {
            return Err(DedupError::ThresholdOrder {
                duplicate: config.duplicate_threshold,
                proximity: config.proximity_threshold,
            });
        }
        Ok(Self {
            oracle,
            config,
            call_timeout: Duration::from_secs(120),
        })
    }

    /// With per-batch timeout
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Score the candidate pairs of the active population
    pub async fn score(&self, store: &PopulationStore) -> Scoring {
        let ranked: Vec<HypothesisId> = store.ranked_active().iter().map(|h| h.id()).collect();
        let pairs = candidate_pairs(
            &ranked,
            self.config.max_full_comparison,
            self.config.comparison_window,
        );

        let mut matrix = SimilarityMatrix::new();
        let mut failures = Vec::new();
        let concurrency = self.config.concurrency.max(1);

        for chunk in pairs.chunks(concurrency) {
            let texts: Vec<(&str, &str)> = chunk
                .iter()
                .map(|&(a, b)| (text(store, a), text(store, b)))
                .collect();

            let batch = bounded(Capability::Similarity, self.call_timeout, async {
                Ok::<_, CapabilityError>(self.oracle.similarity_batch(&texts, concurrency).await)
            })
            .await;

            match batch {
                Ok(scores) => {
                    for (i, &(a, b)) in chunk.iter().enumerate() {
                        match scores.get(i) {
                            Some(Ok(score)) => matrix.insert(a, b, *score),
                            Some(Err(error)) => failures.push(SimilarityFailure {
                                a,
                                b,
                                error: error.clone(),
                            }),
                            None => failures.push(SimilarityFailure {
                                a,
                                b,
                                error: CapabilityError::malformed(
                                    Capability::Similarity,
                                    "batch response shorter than request",
                                ),
                            }),
                        }
                    }
                }
                Err(error) => failures.extend(chunk.iter().map(|&(a, b)| SimilarityFailure {
                    a,
                    b,
                    error: error.clone(),
                })),
            }
        }

        for failure in &failures {
            warn!(
                a = %failure.a,
                b = %failure.b,
                error = %failure.error,
                "similarity unavailable, treating pair as dissimilar"
            );
        }
        debug!(comparisons = pairs.len(), failures = failures.len(), "similarity scored");

        Scoring {
            ranked,
            matrix,
            comparisons: pairs.len(),
            failures,
        }
    }

    /// Decide the folds for the active population
    pub async fn plan(&self, store: &PopulationStore) -> DedupOutcome {
        let scoring = self.score(store).await;
        let plan = fold_clusters(&scoring.ranked, &scoring.matrix, &FoldSettings::from(&self.config));
        info!(
            active = scoring.ranked.len(),
            folded = plan.len(),
            "deduplication planned"
        );
        DedupOutcome {
            plan,
            comparisons: scoring.comparisons,
            failures: scoring.failures,
        }
    }

    /// Plan and apply one pass
    ///
    /// # Errors
    /// `Population` if a fold cannot be applied.
    pub async fn deduplicate(&self, store: &mut PopulationStore) -> Result<DedupOutcome, DedupError> {
        let outcome = self.plan(store).await;
        apply_plan(store, &outcome.plan)?;
        Ok(outcome)
    }
}

/// Mark every folded hypothesis duplicate
///
/// Returns the number of hypotheses folded.
///
/// # Errors
/// `Population` if a fold references an unknown or already removed id.
pub fn apply_plan(store: &mut PopulationStore, plan: &DedupPlan) -> Result<usize, DedupError> {
    for fold in &plan.folds {
        store.mark_duplicate(fold.id, fold.representative)?;
    }
    Ok(plan.len())
}

fn text(store: &PopulationStore, id: HypothesisId) -> &str {
    store.get(id).map_or("", |h| h.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosci_core::HypothesisDraft;

    struct Constant(f64);

    #[async_trait::async_trait]
    impl SimilarityOracle for Constant {
        async fn similarity(&self, _: &str, _: &str) -> Result<f64, CapabilityError> {
            Ok(self.0)
        }
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let config = ProximityConfig {
            duplicate_threshold: 0.7,
            proximity_threshold: 0.9,
            ..ProximityConfig::default()
        };
        assert!(matches!(
            Deduplicator::new(Constant(0.0), config),
            Err(DedupError::ThresholdOrder { .. })
        ));
    }

    #[tokio::test]
    async fn dissimilar_population_is_untouched() {
        let mut store = PopulationStore::default();
        for text in ["a", "b", "c"] {
            store.add(HypothesisDraft::generated(text), 0).unwrap();
        }
        let dedup = Deduplicator::new(Constant(0.1), ProximityConfig::default()).unwrap();
        let outcome = dedup.deduplicate(&mut store).await.unwrap();

        assert!(outcome.plan.is_empty());
        assert_eq!(outcome.comparisons, 3);
        assert_eq!(store.active_count(), 3);
    }

    #[tokio::test]
    async fn out_of_range_scores_are_clamped() {
        let mut store = PopulationStore::default();
        for text in ["a", "b"] {
            store.add(HypothesisDraft::generated(text), 0).unwrap();
        }
        let dedup = Deduplicator::new(Constant(3.0), ProximityConfig::default()).unwrap();
        let outcome = dedup.deduplicate(&mut store).await.unwrap();
        assert_eq!(outcome.plan.len(), 1);
        assert_eq!(store.active_count(), 1);
    }
}
