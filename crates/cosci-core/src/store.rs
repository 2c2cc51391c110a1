//! Population store
//!
//! The authoritative, insertion-ordered hypothesis set for one run. All
//! mutations go through [`PopulationStore::update`] (or the helpers built on
//! it), which validates the patch before touching the record.

use crate::elo::{self, EloAdjustment, MatchOutcome, RatingChange};
use crate::error::PopulationError;
use crate::review::{ReflectionNote, ReviewRecord};
use crate::types::{rank_order, Hypothesis, HypothesisDraft, HypothesisId, Status};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tolerance used when checking that a rating change is current
const RATING_EPSILON: f64 = 1e-9;

/// Partial update applied to one hypothesis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HypothesisPatch {
    /// Elo rating transition
    pub rating: Option<RatingChange>,
    /// New review
    pub review: Option<ReviewRecord>,
    /// Review-incomplete flag
    pub review_incomplete: Option<bool>,
    /// Reflection against the literature
    pub reflection: Option<ReflectionNote>,
    /// New status
    pub status: Option<Status>,
}

impl HypothesisPatch {
    /// Create empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a rating change
    #[inline]
    #[must_use]
    pub fn rating(mut self, change: RatingChange) -> Self {
        self.rating = Some(change);
        self
    }

    /// With a completed review (clears the incomplete flag)
    #[inline]
    #[must_use]
    pub fn review(mut self, review: ReviewRecord) -> Self {
        self.review = Some(review);
        self.review_incomplete = Some(false);
        self
    }

    /// Flag the latest review attempt as incomplete
    #[inline]
    #[must_use]
    pub fn review_incomplete(mut self) -> Self {
        self.review_incomplete = Some(true);
        self
    }

    /// With a reflection note
    #[inline]
    #[must_use]
    pub fn reflection(mut self, note: ReflectionNote) -> Self {
        self.reflection = Some(note);
        self
    }

    /// With a status change
    #[inline]
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }
}

/// In-memory ordered hypothesis collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationStore {
    records: IndexMap<HypothesisId, Hypothesis>,
    next_id: u64,
    initial_rating: f64,
}

impl PopulationStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new(initial_rating: f64) -> Self {
        Self {
            records: IndexMap::new(),
            next_id: 1,
            initial_rating,
        }
    }

    /// Rating assigned to new hypotheses
    #[inline]
    #[must_use]
    pub fn initial_rating(&self) -> f64 {
        self.initial_rating
    }

    /// Append a new hypothesis with a fresh id
    ///
    /// # Errors
    /// `PopulationError::DuplicateId` if the minted id is already present,
    /// which only happens if the sequence was corrupted.
    pub fn add(&mut self, draft: HypothesisDraft, iteration: u32) -> Result<HypothesisId, PopulationError> {
        let id = HypothesisId::new(self.next_id);
        let hypothesis = Hypothesis::new(id, draft, self.initial_rating, iteration);
        self.insert(hypothesis)?;
        Ok(id)
    }

    /// Append a fully built hypothesis
    ///
    /// # Errors
    /// `PopulationError::DuplicateId` if the id already exists.
    pub fn insert(&mut self, hypothesis: Hypothesis) -> Result<(), PopulationError> {
        let id = hypothesis.id();
        if self.records.contains_key(&id) {
            return Err(PopulationError::DuplicateId(id));
        }
        self.next_id = self.next_id.max(id.get() + 1);
        self.records.insert(id, hypothesis);
        Ok(())
    }

    /// Look up a hypothesis
    #[inline]
    #[must_use]
    pub fn get(&self, id: HypothesisId) -> Option<&Hypothesis> {
        self.records.get(&id)
    }

    /// Check if an id is present
    #[inline]
    #[must_use]
    pub fn contains(&self, id: HypothesisId) -> bool {
        self.records.contains_key(&id)
    }

    /// Total number of records (any status)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate all records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Hypothesis> {
        self.records.values()
    }

    /// Active hypotheses in insertion order
    #[must_use]
    pub fn get_active(&self) -> Vec<&Hypothesis> {
        self.records.values().filter(|h| h.is_active()).collect()
    }

    /// Number of active hypotheses
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.records.values().filter(|h| h.is_active()).count()
    }

    /// Active hypotheses in rank order
    ///
    /// Descending rating, ties broken by earliest creation iteration and
    /// then by id.
    #[must_use]
    pub fn ranked_active(&self) -> Vec<&Hypothesis> {
        let mut active = self.get_active();
        active.sort_by(|a, b| rank_order(a, b));
        active
    }

    /// Apply a partial update
    ///
    /// The patch is validated in full before any field changes.
    ///
    /// # Errors
    /// - `NotFound` if `id` is absent
    /// - `StaleRating` if the rating change was computed from another rating
    /// - `InvalidReviewScores` if review scores fail validation
    /// - `IllegalStatusTransition` if the status change is not permitted
    pub fn update(&mut self, id: HypothesisId, patch: HypothesisPatch) -> Result<(), PopulationError> {
        let record = self.records.get_mut(&id).ok_or(PopulationError::NotFound(id))?;

        if let Some(change) = &patch.rating {
            if (change.before() - record.rating()).abs() > RATING_EPSILON {
                return Err(PopulationError::StaleRating {
                    id,
                    expected: change.before(),
                    found: record.rating(),
                });
            }
        }
        if let Some(review) = &patch.review {
            review
                .scores
                .validate()
                .map_err(|reason| PopulationError::InvalidReviewScores { id, reason })?;
        }
        if let Some(status) = patch.status {
            if !record.status().can_transition_to(status) {
                return Err(PopulationError::IllegalStatusTransition {
                    id,
                    from: record.status(),
                    to: status,
                });
            }
        }

        if let Some(change) = patch.rating {
            record.set_rating(change.after());
        }
        if let Some(review) = patch.review {
            record.set_review(review);
        }
        if let Some(incomplete) = patch.review_incomplete {
            record.set_review_incomplete(incomplete);
        }
        if let Some(note) = patch.reflection {
            record.set_reflection(note);
        }
        if let Some(status) = patch.status {
            record.set_status(status);
        }
        Ok(())
    }

    /// Fold a hypothesis into its representative
    ///
    /// # Errors
    /// `NotFound` if either id is absent, `SelfRepresentative` if they are
    /// equal, `IllegalStatusTransition` if `id` is already eliminated.
    pub fn mark_duplicate(
        &mut self,
        id: HypothesisId,
        representative_id: HypothesisId,
    ) -> Result<(), PopulationError> {
        if id == representative_id {
            return Err(PopulationError::SelfRepresentative(id));
        }
        if !self.contains(representative_id) {
            return Err(PopulationError::NotFound(representative_id));
        }
        self.update(id, HypothesisPatch::new().status(Status::Duplicate))?;
        if let Some(record) = self.records.get_mut(&id) {
            record.set_folded_into(representative_id);
        }
        Ok(())
    }

    /// Remove a hypothesis from the active population
    ///
    /// # Errors
    /// `NotFound` if absent, `IllegalStatusTransition` if already duplicate.
    pub fn eliminate(&mut self, id: HypothesisId) -> Result<(), PopulationError> {
        self.update(id, HypothesisPatch::new().status(Status::Eliminated))
    }

    /// Record a match result through the Elo update
    ///
    /// Both ratings are read before either is written.
    ///
    /// # Errors
    /// `NotFound` if either id is absent.
    pub fn apply_match(
        &mut self,
        a: HypothesisId,
        b: HypothesisId,
        outcome: MatchOutcome,
        k_factor: f64,
    ) -> Result<EloAdjustment, PopulationError> {
        let rating_a = self.get(a).ok_or(PopulationError::NotFound(a))?.rating();
        let rating_b = self.get(b).ok_or(PopulationError::NotFound(b))?.rating();

        let adjustment = elo::update(rating_a, rating_b, outcome, k_factor);
        self.update(a, HypothesisPatch::new().rating(adjustment.a))?;
        self.update(b, HypothesisPatch::new().rating(adjustment.b))?;
        Ok(adjustment)
    }
}

impl Default for PopulationStore {
    fn default() -> Self {
        Self::new(elo::DEFAULT_INITIAL_RATING)
    }
}
