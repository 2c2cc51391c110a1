use cosci_core::Stage;
use cosci_orchestrator::{allowed_transitions, next_stage, validate_transition};
use proptest::prelude::*;

/// Walk the state machine the way the orchestrator does
fn walk(max_iterations: u32) -> Vec<Stage> {
    let mut stage = Stage::Init;
    let mut iteration = 0;
    let mut path = vec![stage];
    while !stage.is_terminal() {
        let next = next_stage(stage, iteration, max_iterations);
        validate_transition(stage, next).unwrap();
        if stage == Stage::Deduplicate && next == Stage::MetaReview {
            iteration += 1;
        }
        stage = next;
        path.push(stage);
    }
    path
}

proptest! {
    #[test]
    fn prop_every_run_terminates_legally(max_iterations in 0..12u32) {
        let path = walk(max_iterations);
        prop_assert_eq!(path.last().copied(), Some(Stage::Terminal));
        // Init, three linear stages, five per iteration, Terminal
        prop_assert_eq!(path.len(), 5 + 5 * max_iterations as usize);
        let meta_reviews = path.iter().filter(|s| **s == Stage::MetaReview).count();
        prop_assert_eq!(meta_reviews, max_iterations as usize);
    }

    #[test]
    fn prop_cancellation_reachable_until_terminal(max_iterations in 0..6u32) {
        for stage in walk(max_iterations) {
            prop_assert_eq!(
                allowed_transitions(stage).contains(&Stage::Cancelled),
                !stage.is_terminal()
            );
        }
    }
}
