//! Lexical similarity oracle
//!
//! Jaccard overlap of lowercase word tokens. Symmetric and bounded in
//! `[0, 1]`, which is all the deduplicator requires. Batches are scored in
//! parallel on the rayon pool.

use cosci_core::{CapabilityError, SimilarityOracle};
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;

const DEFAULT_TOKEN_PATTERN: &str = r"[\p{L}\p{N}]+";

/// Token-overlap similarity
#[derive(Debug, Clone)]
pub struct LexicalSimilarity {
    token: Regex,
}

impl LexicalSimilarity {
    /// Create oracle with the default word pattern
    ///
    /// # Errors
    /// Only if the built-in pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_pattern(DEFAULT_TOKEN_PATTERN)
    }

    /// Create oracle with a custom token pattern
    ///
    /// # Errors
    /// Returns the regex error for an invalid pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            token: Regex::new(pattern)?,
        })
    }

    fn tokens(&self, text: &str) -> HashSet<String> {
        self.token
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    /// Jaccard similarity of two texts
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self, text_a: &str, text_b: &str) -> f64 {
        let a = self.tokens(text_a);
        let b = self.tokens(text_b);
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        let shared = a.intersection(&b).count();
        let total = a.union(&b).count();
        shared as f64 / total as f64
    }
}

#[async_trait::async_trait]
impl SimilarityOracle for LexicalSimilarity {
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, CapabilityError> {
        Ok(self.score(text_a, text_b))
    }

    async fn similarity_batch(
        &self,
        pairs: &[(&str, &str)],
        _concurrency: usize,
    ) -> Vec<Result<f64, CapabilityError>> {
        pairs
            .par_iter()
            .map(|(a, b)| Ok(self.score(a, b)))
            .collect()
    }
}
