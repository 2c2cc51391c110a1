//! Core types for the Co-Scientist workflow
//!
//! Defines the fundamental vocabulary shared by every crate:
//! - Hypothesis and run identifiers
//! - Hypothesis status and records
//! - Workflow stage names

use crate::review::{ReflectionNote, ReviewRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique hypothesis identifier
///
/// Assigned by the population store from a monotonically increasing
/// sequence, so ids are never reused within a run and order by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HypothesisId(u64);

impl HypothesisId {
    /// Wrap a raw sequence number
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw sequence number
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HypothesisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.0)
    }
}

/// Unique run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a hypothesis
///
/// Only `Active` hypotheses participate in ranking, evolution and emission.
/// `Duplicate` and `Eliminated` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Participates in the workflow
    #[default]
    Active,
    /// Folded into a representative by deduplication
    Duplicate,
    /// Removed by population culling
    Eliminated,
}

impl Status {
    /// Check if a transition to `to` is permitted
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, to: Status) -> bool {
        self == to || self == Status::Active
    }

    /// Check if the status is `Active`
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Status::Active
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Duplicate => "duplicate",
            Self::Eliminated => "eliminated",
        };
        f.write_str(name)
    }
}

/// Workflow stage names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Inputs validated, nothing executed yet
    Init,
    /// Initial hypothesis generation
    Generate,
    /// Initial review
    Review,
    /// Initial tournament
    Rank,
    /// Population-level synthesis
    MetaReview,
    /// Refinement of top hypotheses
    Evolve,
    /// Review of newly evolved hypotheses
    ReReview,
    /// Tournament over the refined population
    ReRank,
    /// Proximity deduplication
    Deduplicate,
    /// Run completed
    Terminal,
    /// Run cancelled
    Cancelled,
}

impl Stage {
    /// Stable stage name
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Generate => "generate",
            Self::Review => "review",
            Self::Rank => "rank",
            Self::MetaReview => "meta_review",
            Self::Evolve => "evolve",
            Self::ReReview => "re_review",
            Self::ReRank => "re_rank",
            Self::Deduplicate => "deduplicate",
            Self::Terminal => "terminal",
            Self::Cancelled => "cancelled",
        }
    }

    /// Check if the run ends in this stage
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal | Self::Cancelled)
    }

    /// Check if a failure in this stage aborts the run
    #[inline]
    #[must_use]
    pub fn is_load_bearing(self) -> bool {
        matches!(
            self,
            Self::Generate | Self::Review | Self::Rank | Self::ReRank
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hypothesis content submitted for insertion
///
/// The population store assigns the id, initial rating and creation
/// iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisDraft {
    /// Artifact content
    pub text: String,
    /// Parent hypotheses (empty for generated hypotheses)
    pub lineage: Vec<HypothesisId>,
    /// Produced without literature grounding
    #[serde(default)]
    pub ungrounded: bool,
}

impl HypothesisDraft {
    /// Draft for an originally generated hypothesis
    #[inline]
    #[must_use]
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lineage: Vec::new(),
            ungrounded: false,
        }
    }

    /// Draft for an evolved descendant
    #[inline]
    #[must_use]
    pub fn evolved(text: impl Into<String>, parents: impl IntoIterator<Item = HypothesisId>) -> Self {
        let mut lineage: Vec<HypothesisId> = Vec::new();
        for parent in parents {
            if !lineage.contains(&parent) {
                lineage.push(parent);
            }
        }
        Self {
            text: text.into(),
            lineage,
            ungrounded: false,
        }
    }

    /// Mark the draft as produced without literature grounding
    #[inline]
    #[must_use]
    pub fn without_grounding(mut self) -> Self {
        self.ungrounded = true;
        self
    }
}

/// A candidate artifact under evaluation
///
/// Rating and status are private: ratings change only through Elo
/// adjustments and status only through validated transitions, both
/// applied by the population store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    id: HypothesisId,
    text: String,
    rating: f64,
    review: Option<ReviewRecord>,
    review_incomplete: bool,
    reflection: Option<ReflectionNote>,
    lineage: Vec<HypothesisId>,
    ungrounded: bool,
    status: Status,
    created_at_iteration: u32,
    folded_into: Option<HypothesisId>,
}

impl Hypothesis {
    /// Create a new active hypothesis at its initial rating
    #[must_use]
    pub fn new(id: HypothesisId, draft: HypothesisDraft, initial_rating: f64, iteration: u32) -> Self {
        Self {
            id,
            text: draft.text,
            rating: initial_rating,
            review: None,
            review_incomplete: false,
            reflection: None,
            lineage: draft.lineage,
            ungrounded: draft.ungrounded,
            status: Status::Active,
            created_at_iteration: iteration,
            folded_into: None,
        }
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> HypothesisId {
        self.id
    }

    /// Artifact content
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current Elo rating
    #[inline]
    #[must_use]
    pub fn rating(&self) -> f64 {
        self.rating
    }

    /// Latest review, if the hypothesis has been reviewed
    #[inline]
    #[must_use]
    pub fn review(&self) -> Option<&ReviewRecord> {
        self.review.as_ref()
    }

    /// Latest criterion scores, if reviewed
    #[inline]
    #[must_use]
    pub fn review_scores(&self) -> Option<&crate::review::ReviewScores> {
        self.review.as_ref().map(|r| &r.scores)
    }

    /// Whether the last review attempt failed for this hypothesis
    #[inline]
    #[must_use]
    pub fn review_incomplete(&self) -> bool {
        self.review_incomplete
    }

    /// Reflection against the literature, if one was made
    #[inline]
    #[must_use]
    pub fn reflection(&self) -> Option<&ReflectionNote> {
        self.reflection.as_ref()
    }

    /// Check if the hypothesis was produced without literature grounding
    #[inline]
    #[must_use]
    pub fn is_ungrounded(&self) -> bool {
        self.ungrounded
    }

    /// Parent ids
    #[inline]
    #[must_use]
    pub fn lineage(&self) -> &[HypothesisId] {
        &self.lineage
    }

    /// Lifecycle status
    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Check if active
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Iteration at which the hypothesis entered the population
    #[inline]
    #[must_use]
    pub fn created_at_iteration(&self) -> u32 {
        self.created_at_iteration
    }

    /// Representative this hypothesis was folded into, if duplicate
    #[inline]
    #[must_use]
    pub fn folded_into(&self) -> Option<HypothesisId> {
        self.folded_into
    }

    pub(crate) fn set_rating(&mut self, rating: f64) {
        self.rating = rating;
    }

    pub(crate) fn set_review(&mut self, review: ReviewRecord) {
        self.review = Some(review);
    }

    pub(crate) fn set_review_incomplete(&mut self, incomplete: bool) {
        self.review_incomplete = incomplete;
    }

    pub(crate) fn set_reflection(&mut self, note: ReflectionNote) {
        self.reflection = Some(note);
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub(crate) fn set_folded_into(&mut self, representative: HypothesisId) {
        self.folded_into = Some(representative);
    }
}

/// Rank order over hypotheses
///
/// Descending rating, then earliest `created_at_iteration`, then ascending id.
#[must_use]
pub fn rank_order(a: &Hypothesis, b: &Hypothesis) -> std::cmp::Ordering {
    b.rating
        .total_cmp(&a.rating)
        .then_with(|| a.created_at_iteration.cmp(&b.created_at_iteration))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hypothesis_id_display() {
        assert_eq!(HypothesisId::new(7).to_string(), "H7");
    }

    #[test]
    fn run_id_generation() {
        let id1 = RunId::new();
        let id2 = RunId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn status_transitions_are_absorbing() {
        assert!(Status::Active.can_transition_to(Status::Duplicate));
        assert!(Status::Active.can_transition_to(Status::Eliminated));
        assert!(!Status::Duplicate.can_transition_to(Status::Active));
        assert!(!Status::Eliminated.can_transition_to(Status::Active));
        assert!(!Status::Duplicate.can_transition_to(Status::Eliminated));
    }

    #[test]
    fn stage_classification() {
        assert!(Stage::Generate.is_load_bearing());
        assert!(Stage::Rank.is_load_bearing());
        assert!(!Stage::MetaReview.is_load_bearing());
        assert!(!Stage::Evolve.is_load_bearing());
        assert!(!Stage::ReReview.is_load_bearing());
        assert!(Stage::Terminal.is_terminal());
        assert!(Stage::Cancelled.is_terminal());
        assert!(!Stage::Deduplicate.is_terminal());
    }

    #[test]
    fn evolved_draft_deduplicates_parents() {
        let p = HypothesisId::new(3);
        let draft = HypothesisDraft::evolved("child", [p, p]);
        assert_eq!(draft.lineage, vec![p]);
    }

    #[test]
    fn ungrounded_flag_carries_into_hypothesis() {
        let draft = HypothesisDraft::generated("latent knowledge only").without_grounding();
        let hypothesis = Hypothesis::new(HypothesisId::new(1), draft, 1200.0, 0);
        assert!(hypothesis.is_ungrounded());
        assert!(hypothesis.reflection().is_none());

        let grounded = Hypothesis::new(HypothesisId::new(2), HypothesisDraft::generated("x"), 1200.0, 0);
        assert!(!grounded.is_ungrounded());
    }

    #[test]
    fn rank_order_breaks_ties() {
        let mut a = Hypothesis::new(HypothesisId::new(2), HypothesisDraft::generated("a"), 1200.0, 0);
        let b = Hypothesis::new(HypothesisId::new(1), HypothesisDraft::generated("b"), 1200.0, 1);
        let c = Hypothesis::new(HypothesisId::new(3), HypothesisDraft::generated("c"), 1200.0, 0);

        // same rating: earlier iteration first, then lower id
        assert_eq!(rank_order(&a, &b), std::cmp::Ordering::Less);
        assert_eq!(rank_order(&a, &c), std::cmp::Ordering::Less);

        a.set_rating(1100.0);
        assert_eq!(rank_order(&a, &b), std::cmp::Ordering::Greater);
    }
}
