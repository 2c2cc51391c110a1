//! Deterministic duplicate folding
//!
//! Given the active ids in rank order and a similarity matrix, decide which
//! hypotheses fold into which representative. Pure and single-threaded:
//! the same inputs always yield the same plan.
//!
//! 1. Link every pair above the duplicate threshold. Each linked group keeps
//!    its best-ranked member; the rest fold into it.
//! 2. Among the survivors, link every pair above the proximity threshold.
//!    A cluster larger than `max_per_cluster` keeps its best-ranked members
//!    and folds the rest into the cluster's top member.
//!
//! Every representative in the resulting plan stays active.

use cosci_core::{HypothesisId, ProximityConfig};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::matrix::SimilarityMatrix;

/// Thresholds used by [`fold_clusters`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldSettings {
    /// Near-identical cutoff
    pub duplicate_threshold: f64,
    /// Cluster cutoff
    pub proximity_threshold: f64,
    /// Members kept per proximity cluster
    pub max_per_cluster: usize,
}

impl From<&ProximityConfig> for FoldSettings {
    fn from(config: &ProximityConfig) -> Self {
        Self {
            duplicate_threshold: config.duplicate_threshold,
            proximity_threshold: config.proximity_threshold,
            max_per_cluster: config.max_per_cluster,
        }
    }
}

/// Why a hypothesis was folded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldReason {
    /// Above the duplicate threshold with a better-ranked hypothesis
    Duplicate,
    /// Beyond the per-cluster limit of its proximity cluster
    ClusterTrim,
}

/// One hypothesis to mark duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    /// Hypothesis leaving the active population
    pub id: HypothesisId,
    /// Hypothesis it folds into
    pub representative: HypothesisId,
    /// Folding rule that applied
    pub reason: FoldReason,
}

/// Folds decided for one deduplication pass, in rank order of the folded ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupPlan {
    /// Folds to apply
    pub folds: Vec<Fold>,
}

impl DedupPlan {
    /// Check if nothing folds
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// Number of folds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    /// Fold for `id`, if any
    #[must_use]
    pub fn fold_for(&self, id: HypothesisId) -> Option<&Fold> {
        self.folds.iter().find(|f| f.id == id)
    }
}

/// Group `members` connected by edges above `threshold`
///
/// Groups are returned in order of their best-ranked member; members
/// within a group keep rank order. Representatives of duplicate groups
/// therefore come out in rank order as well.
fn components(
    members: &[HypothesisId],
    matrix: &SimilarityMatrix,
    threshold: f64,
) -> Vec<Vec<HypothesisId>> {
    let mut sets = UnionFind::<usize>::new(members.len());
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            if matrix.get(members[i], members[j]) > threshold {
                sets.union(i, j);
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<HypothesisId>> = BTreeMap::new();
    let mut first_seen: BTreeMap<usize, usize> = BTreeMap::new();
    for (position, id) in members.iter().enumerate() {
        let root = sets.find(position);
        let leader = *first_seen.entry(root).or_insert(position);
        groups.entry(leader).or_default().push(*id);
    }
    groups.into_values().collect()
}

/// Decide the folds for a population given in rank order
#[must_use]
pub fn fold_clusters(
    ranked: &[HypothesisId],
    matrix: &SimilarityMatrix,
    settings: &FoldSettings,
) -> DedupPlan {
    let mut folds = Vec::new();

    let mut survivors = Vec::with_capacity(ranked.len());
    for group in components(ranked, matrix, settings.duplicate_threshold) {
        let representative = group[0];
        survivors.push(representative);
        folds.extend(group[1..].iter().map(|&id| Fold {
            id,
            representative,
            reason: FoldReason::Duplicate,
        }));
    }

    let keep = settings.max_per_cluster.max(1);
    for cluster in components(&survivors, matrix, settings.proximity_threshold) {
        if cluster.len() <= keep {
            continue;
        }
        let representative = cluster[0];
        folds.extend(cluster[keep..].iter().map(|&id| Fold {
            id,
            representative,
            reason: FoldReason::ClusterTrim,
        }));
    }

    // a duplicate representative may itself be trimmed; point at the survivor
    let folded: BTreeMap<HypothesisId, HypothesisId> =
        folds.iter().map(|f| (f.id, f.representative)).collect();
    for fold in &mut folds {
        while let Some(&next) = folded.get(&fold.representative) {
            fold.representative = next;
        }
    }

    let position: BTreeMap<HypothesisId, usize> =
        ranked.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    folds.sort_by_key(|f| position.get(&f.id).copied().unwrap_or(usize::MAX));
    DedupPlan { folds }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u64) -> Vec<HypothesisId> {
        (1..=n).map(HypothesisId::new).collect()
    }

    fn settings() -> FoldSettings {
        FoldSettings {
            duplicate_threshold: 0.95,
            proximity_threshold: 0.80,
            max_per_cluster: 2,
        }
    }

    #[test]
    fn near_identical_pair_keeps_better_ranked() {
        let r = ids(4);
        let matrix = SimilarityMatrix::new().with(r[0], r[1], 0.97);
        let plan = fold_clusters(&r, &matrix, &settings());

        assert_eq!(
            plan.folds,
            vec![Fold {
                id: r[1],
                representative: r[0],
                reason: FoldReason::Duplicate
            }]
        );
    }

    #[test]
    fn duplicate_chains_fold_into_one_representative() {
        let r = ids(3);
        // r0~r1 and r1~r2 are duplicates; r0~r2 is not directly linked
        let matrix = SimilarityMatrix::new().with(r[0], r[1], 0.96).with(r[1], r[2], 0.99);
        let plan = fold_clusters(&r, &matrix, &settings());

        assert_eq!(plan.len(), 2);
        assert!(plan.folds.iter().all(|f| f.representative == r[0]));
    }

    #[test]
    fn oversized_cluster_is_trimmed_to_top_members() {
        let r = ids(4);
        let matrix = SimilarityMatrix::new()
            .with(r[0], r[1], 0.85)
            .with(r[1], r[2], 0.85)
            .with(r[2], r[3], 0.85);
        let plan = fold_clusters(&r, &matrix, &settings());

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.fold_for(r[2]).map(|f| f.reason), Some(FoldReason::ClusterTrim));
        assert_eq!(plan.fold_for(r[3]).map(|f| f.representative), Some(r[0]));
        assert!(plan.fold_for(r[0]).is_none());
        assert!(plan.fold_for(r[1]).is_none());
    }

    #[test]
    fn trimmed_representative_is_resolved_to_survivor() {
        let r = ids(4);
        // r2 absorbs r3 as a duplicate, then is trimmed from the r0-r1-r2 cluster
        let matrix = SimilarityMatrix::new()
            .with(r[0], r[1], 0.85)
            .with(r[1], r[2], 0.85)
            .with(r[2], r[3], 0.99);
        let plan = fold_clusters(&r, &matrix, &settings());

        assert_eq!(plan.fold_for(r[2]).map(|f| f.representative), Some(r[0]));
        assert_eq!(plan.fold_for(r[3]).map(|f| f.representative), Some(r[0]));
        assert_eq!(plan.fold_for(r[3]).map(|f| f.reason), Some(FoldReason::Duplicate));
    }

    #[test]
    fn cluster_within_limit_is_untouched() {
        let r = ids(3);
        let matrix = SimilarityMatrix::new().with(r[0], r[2], 0.9);
        assert!(fold_clusters(&r, &matrix, &settings()).is_empty());
    }

    #[test]
    fn thresholds_are_strict() {
        let r = ids(2);
        let matrix = SimilarityMatrix::new().with(r[0], r[1], 0.95);
        let plan = fold_clusters(&r, &matrix, &FoldSettings {
            max_per_cluster: 1,
            ..settings()
        });
        // exactly at the duplicate threshold: only a proximity link
        assert_eq!(plan.folds[0].reason, FoldReason::ClusterTrim);
    }

    #[test]
    fn folding_survivors_again_changes_nothing() {
        let r = ids(6);
        let matrix = SimilarityMatrix::new()
            .with(r[0], r[3], 0.99)
            .with(r[1], r[2], 0.9)
            .with(r[2], r[4], 0.9)
            .with(r[4], r[5], 0.9);
        let first = fold_clusters(&r, &matrix, &settings());
        assert!(!first.is_empty());

        let survivors: Vec<HypothesisId> = r
            .iter()
            .copied()
            .filter(|id| first.fold_for(*id).is_none())
            .collect();
        assert!(fold_clusters(&survivors, &matrix, &settings()).is_empty());
    }
}
