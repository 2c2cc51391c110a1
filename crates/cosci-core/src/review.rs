//! Review score types
//!
//! Criterion scores are an explicit ordered mapping validated at the
//! population store boundary, not a free-form document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Criterion name -> numeric score
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewScores(IndexMap<String, f64>);

impl ReviewScores {
    /// Create empty scores
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a criterion score
    #[inline]
    #[must_use]
    pub fn with(mut self, criterion: impl Into<String>, score: f64) -> Self {
        self.0.insert(criterion.into(), score);
        self
    }

    /// Insert or replace a criterion score
    #[inline]
    pub fn insert(&mut self, criterion: impl Into<String>, score: f64) {
        self.0.insert(criterion.into(), score);
    }

    /// Score for a criterion
    #[inline]
    #[must_use]
    pub fn get(&self, criterion: &str) -> Option<f64> {
        self.0.get(criterion).copied()
    }

    /// Number of criteria
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no criteria were scored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate criteria in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Mean of the criterion scores (0.0 when empty)
    #[must_use]
    pub fn overall(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.0.len() as f64;
        self.0.values().sum::<f64>() / count
    }

    /// Validate scores
    ///
    /// # Errors
    /// Returns a reason when a criterion name is blank or a score is
    /// non-finite or negative.
    pub fn validate(&self) -> Result<(), String> {
        for (criterion, score) in &self.0 {
            if criterion.trim().is_empty() {
                return Err("blank criterion name".to_string());
            }
            if !score.is_finite() {
                return Err(format!("criterion `{criterion}` has non-finite score"));
            }
            if *score < 0.0 {
                return Err(format!("criterion `{criterion}` has negative score {score}"));
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, f64)> for ReviewScores {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Review content returned by the review capability for one hypothesis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Review {
    /// Criterion scores
    pub scores: ReviewScores,
    /// Short summary
    pub summary: String,
    /// Constructive feedback consumed by evolution
    pub feedback: String,
}

impl Review {
    /// Create review from scores
    #[inline]
    #[must_use]
    pub fn new(scores: ReviewScores) -> Self {
        Self {
            scores,
            ..Self::default()
        }
    }

    /// With feedback text
    #[inline]
    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }

    /// With summary text
    #[inline]
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }
}

/// Review stored on a hypothesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Criterion scores
    pub scores: ReviewScores,
    /// Mean of criterion scores
    pub overall_score: f64,
    /// Short summary
    pub summary: String,
    /// Constructive feedback
    pub feedback: String,
    /// Iteration in which the review was produced
    pub reviewed_at_iteration: u32,
}

impl ReviewRecord {
    /// Build a record from a capability review
    #[must_use]
    pub fn from_review(review: Review, iteration: u32) -> Self {
        let overall_score = review.scores.overall();
        Self {
            scores: review.scores,
            overall_score,
            summary: review.summary,
            feedback: review.feedback,
            reviewed_at_iteration: iteration,
        }
    }
}

/// How a hypothesis relates to the observations in the literature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionClass {
    /// The observations are already explained by known mechanisms
    AlreadyExplained,
    /// Other explanations fit the observations better
    OtherExplanationsMoreLikely,
    /// The hypothesis supplies a missing causal piece
    MissingPiece,
    /// No clear relation either way
    Neutral,
    /// The observations contradict the hypothesis
    Disproved,
}

impl ReflectionClass {
    /// Stable class name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AlreadyExplained => "already_explained",
            Self::OtherExplanationsMoreLikely => "other_explanations_more_likely",
            Self::MissingPiece => "missing_piece",
            Self::Neutral => "neutral",
            Self::Disproved => "disproved",
        }
    }
}

/// Reflection stored on a hypothesis and shown to later reviews
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionNote {
    /// Classification against the literature observations
    pub classification: ReflectionClass,
    /// Free-text reasoning behind the classification
    pub reasoning: String,
}

impl ReflectionNote {
    /// Create note
    #[inline]
    #[must_use]
    pub fn new(classification: ReflectionClass, reasoning: impl Into<String>) -> Self {
        Self {
            classification,
            reasoning: reasoning.into(),
        }
    }
}

/// Population-level synthesis used to steer evolution and later reviews
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetaReview {
    /// Strengths shared by strong hypotheses
    pub common_strengths: Vec<String>,
    /// Recurring weaknesses
    pub common_weaknesses: Vec<String>,
    /// Recommendations for the next refinement round
    pub strategic_recommendations: Vec<String>,
}

impl MetaReview {
    /// Check if the meta-review carries no insight
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.common_strengths.is_empty()
            && self.common_weaknesses.is_empty()
            && self.strategic_recommendations.is_empty()
    }
}
