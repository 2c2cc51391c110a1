use cosci_core::{HypothesisId, PopulationStore, Stage};
use cosci_test_utils::{numbered_population, FailingJudge, ScriptedJudge};
use cosci_tournament::{match_count, plan_matches, MatchPlan, TournamentError, TournamentRanker};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn text_of(store: &PopulationStore, id: HypothesisId) -> String {
    store.get(id).unwrap().text().to_string()
}

#[tokio::test]
async fn winner_of_every_match_tops_the_table() {
    let (mut store, ids) = numbered_population(6);
    let judge = ScriptedJudge::ranked(&["H1"]);
    let ranker = TournamentRanker::new(judge).with_k_factor(24.0);

    let plan = MatchPlan::fixed(ids[1..].iter().map(|&opponent| (ids[0], opponent)).collect());
    let outcome = ranker
        .play("goal", Stage::Rank, 0, &store, plan)
        .await
        .unwrap();
    assert_eq!(outcome.records.len(), 5);

    for record in &outcome.records {
        let adjustment = store
            .apply_match(record.a, record.b, record.outcome, ranker.k_factor())
            .unwrap();
        assert!((adjustment.a.delta() - record.delta_a).abs() < 1e-9);
    }

    let h1 = store.get(ids[0]).unwrap().rating();
    assert!(h1 > 1200.0);
    for &opponent in &ids[1..] {
        assert!(h1 > store.get(opponent).unwrap().rating());
    }
    assert_eq!(store.ranked_active()[0].id(), ids[0]);
    assert_eq!(outcome.standings.rating(ids[0]), Some(h1));
}

#[tokio::test]
async fn failed_judgement_skips_exactly_one_match() {
    let (store, ids) = numbered_population(5);
    let planner = TournamentRanker::new(ScriptedJudge::ties()).with_matches_per_hypothesis(4);
    let plan = planner.plan("goal", 0, &store);
    assert_eq!(plan.len(), 10);

    let (skip_a, skip_b) = plan.pairs[3];
    let judge = ScriptedJudge::ranked(&["H5", "H4", "H3", "H2", "H1"])
        .fail_on(&text_of(&store, skip_a), &text_of(&store, skip_b));
    let ranker = TournamentRanker::new(judge).with_matches_per_hypothesis(4);

    let outcome = ranker.run("goal", Stage::Rank, 0, &store).await.unwrap();
    assert_eq!(outcome.records.len(), 9);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].sequence, 3);
    assert!(outcome
        .records
        .iter()
        .all(|r| !(r.a == skip_a && r.b == skip_b) && !(r.a == skip_b && r.b == skip_a)));

    let total: f64 = ids.iter().map(|id| outcome.standings.rating(*id).unwrap()).sum();
    assert!((total - 5.0 * 1200.0).abs() < 1e-6);
}

#[tokio::test]
async fn every_match_failing_fails_the_pass() {
    let (store, _) = numbered_population(4);
    let judge = FailingJudge::default();
    let ranker = TournamentRanker::new(judge);

    let err = ranker.run("goal", Stage::Rank, 0, &store).await.unwrap_err();
    assert!(matches!(err, TournamentError::AllMatchesSkipped { planned: 6, .. }));
}

#[tokio::test]
async fn identical_inputs_replay_identically() {
    let (store, _) = numbered_population(6);

    let first = Arc::new(ScriptedJudge::ranked(&["H3", "H1", "H6"]));
    let second = Arc::new(ScriptedJudge::ranked(&["H3", "H1", "H6"]));
    let run_first = TournamentRanker::new(Arc::clone(&first))
        .run("microbiome and sleep", Stage::Rank, 2, &store)
        .await
        .unwrap();
    let run_second = TournamentRanker::new(Arc::clone(&second))
        .run("microbiome and sleep", Stage::Rank, 2, &store)
        .await
        .unwrap();

    assert_eq!(run_first.plan, run_second.plan);
    assert_eq!(run_first.records, run_second.records);
    assert_eq!(first.log(), second.log());

    let other_goal = TournamentRanker::new(ScriptedJudge::ties()).plan("another goal", 2, &store);
    assert_ne!(run_first.plan.pairs, other_goal.pairs);
}

proptest! {
    #[test]
    fn prop_plans_are_well_formed(n in 0..12u64, k in 1..5u32, seed in any::<u64>()) {
        let ids: Vec<HypothesisId> = (1..=n).map(HypothesisId::new).collect();
        let plan = plan_matches(&ids, k, seed);
        let population = usize::try_from(n).unwrap();

        prop_assert_eq!(plan.len(), match_count(population, k));
        prop_assert!(plan.pairs.iter().all(|(a, b)| a != b));

        let distinct_pairs = population * population.saturating_sub(1) / 2;
        if plan.len() <= distinct_pairs {
            let seen: HashSet<(HypothesisId, HypothesisId)> = plan
                .pairs
                .iter()
                .map(|&(a, b)| (a.min(b), a.max(b)))
                .collect();
            prop_assert_eq!(seen.len(), plan.len());
        }
    }

    #[test]
    fn prop_plan_is_deterministic(n in 2..10u64, seed in any::<u64>()) {
        let ids: Vec<HypothesisId> = (1..=n).map(HypothesisId::new).collect();
        prop_assert_eq!(plan_matches(&ids, 3, seed), plan_matches(&ids, 3, seed));
    }
}
