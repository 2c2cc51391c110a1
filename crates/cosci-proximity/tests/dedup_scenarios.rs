use cosci_core::{
    Hypothesis, HypothesisDraft, HypothesisId, PopulationStore, ProximityConfig, Status,
};
use cosci_proximity::{
    fold_clusters, DedupPlan, Deduplicator, FoldReason, FoldSettings, LexicalSimilarity,
    SimilarityMatrix,
};
use cosci_test_utils::TableSimilarity;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Store with explicit starting ratings
fn rated(entries: &[(&str, f64)]) -> (PopulationStore, Vec<HypothesisId>) {
    let mut store = PopulationStore::default();
    let ids = entries
        .iter()
        .enumerate()
        .map(|(i, (text, rating))| {
            let id = HypothesisId::new(u64::try_from(i).unwrap() + 1);
            store
                .insert(Hypothesis::new(id, HypothesisDraft::generated(*text), *rating, 0))
                .unwrap();
            id
        })
        .collect();
    (store, ids)
}

#[tokio::test]
async fn near_identical_pair_folds_into_higher_rated() {
    let (mut store, ids) = rated(&[
        ("H1", 1300.0),
        ("H2", 1250.0),
        ("H3", 1200.0),
        ("H4", 1100.0),
    ]);
    let oracle = TableSimilarity::new().with("H1", "H2", 0.97).with("H3", "H4", 0.2);
    let dedup = Deduplicator::new(oracle, ProximityConfig::default()).unwrap();

    let outcome = dedup.deduplicate(&mut store).await.unwrap();

    assert_eq!(outcome.plan.len(), 1);
    assert_eq!(outcome.plan.folds[0].reason, FoldReason::Duplicate);
    assert_eq!(store.get(ids[1]).unwrap().status(), Status::Duplicate);
    assert_eq!(store.get(ids[1]).unwrap().folded_into(), Some(ids[0]));
    assert!(store.get(ids[0]).unwrap().is_active());
    assert_eq!(store.active_count(), 3);
}

#[tokio::test]
async fn representative_is_chosen_by_rating_not_insertion() {
    let (mut store, ids) = rated(&[("H1", 1150.0), ("H2", 1250.0)]);
    let oracle = TableSimilarity::new().with("H1", "H2", 0.99);
    let dedup = Deduplicator::new(oracle, ProximityConfig::default()).unwrap();

    dedup.deduplicate(&mut store).await.unwrap();
    assert_eq!(store.get(ids[0]).unwrap().status(), Status::Duplicate);
    assert!(store.get(ids[1]).unwrap().is_active());
}

#[tokio::test]
async fn second_pass_changes_nothing() {
    let (mut store, _) = rated(&[
        ("H1", 1300.0),
        ("H2", 1280.0),
        ("H3", 1260.0),
        ("H4", 1240.0),
        ("H5", 1220.0),
    ]);
    let oracle = TableSimilarity::new()
        .with("H1", "H5", 0.96)
        .with("H2", "H3", 0.85)
        .with("H3", "H4", 0.85);
    let dedup = Deduplicator::new(oracle, ProximityConfig::default()).unwrap();

    let first = dedup.deduplicate(&mut store).await.unwrap();
    assert_eq!(first.plan.len(), 2);
    let snapshot: Vec<(HypothesisId, Status)> = store.iter().map(|h| (h.id(), h.status())).collect();

    let second = dedup.deduplicate(&mut store).await.unwrap();
    assert!(second.plan.is_empty());
    let after: Vec<(HypothesisId, Status)> = store.iter().map(|h| (h.id(), h.status())).collect();
    assert_eq!(snapshot, after);
}

#[tokio::test]
async fn oracle_failure_counts_as_dissimilar() {
    let (mut store, _) = rated(&[("H1", 1300.0), ("H2", 1250.0), ("H3", 1200.0)]);
    let oracle = TableSimilarity::new().with("H1", "H2", 0.99).fail_on("H1", "H2");
    let dedup = Deduplicator::new(oracle, ProximityConfig::default()).unwrap();

    let outcome = dedup.deduplicate(&mut store).await.unwrap();
    assert!(outcome.plan.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.comparisons, 3);
    assert_eq!(store.active_count(), 3);
}

#[tokio::test]
async fn lexical_oracle_folds_reworded_copies() {
    let (mut store, ids) = rated(&[
        ("Gut microbiome diversity regulates sleep quality", 1300.0),
        ("gut microbiome diversity regulates sleep quality", 1200.0),
        ("Dietary fibre alters circadian gene expression", 1250.0),
    ]);
    let dedup = Deduplicator::new(LexicalSimilarity::new().unwrap(), ProximityConfig::default()).unwrap();

    dedup.deduplicate(&mut store).await.unwrap();
    assert_eq!(store.get(ids[1]).unwrap().folded_into(), Some(ids[0]));
    assert!(store.get(ids[2]).unwrap().is_active());
}

fn survivors(ranked: &[HypothesisId], plan: &DedupPlan) -> Vec<HypothesisId> {
    ranked
        .iter()
        .copied()
        .filter(|id| plan.fold_for(*id).is_none())
        .collect()
}

proptest! {
    #[test]
    fn prop_fold_is_dominant_and_idempotent(
        n in 1..9u64,
        scores in proptest::collection::vec(0.0..1.0f64, 36),
        max_per_cluster in 1..4usize,
    ) {
        let ranked: Vec<HypothesisId> = (1..=n).map(HypothesisId::new).collect();
        let mut matrix = SimilarityMatrix::new();
        let mut k = 0;
        for i in 0..ranked.len() {
            for j in (i + 1)..ranked.len() {
                matrix.insert(ranked[i], ranked[j], scores[k]);
                k += 1;
            }
        }
        let settings = FoldSettings {
            duplicate_threshold: 0.9,
            proximity_threshold: 0.6,
            max_per_cluster,
        };

        let plan = fold_clusters(&ranked, &matrix, &settings);
        let kept = survivors(&ranked, &plan);

        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                prop_assert!(matrix.get(kept[i], kept[j]) <= settings.duplicate_threshold);
            }
        }
        for fold in &plan.folds {
            prop_assert!(kept.contains(&fold.representative));
        }
        prop_assert!(fold_clusters(&kept, &matrix, &settings).is_empty());
    }
}
