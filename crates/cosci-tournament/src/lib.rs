//! Co-Scientist Tournament Ranker
//!
//! Orders the active population through repeated pairwise comparison:
//! - Seeded, reproducible pair selection ([`planner`])
//! - Sequential match play with Elo updates ([`ranker`])
//! - Working ratings for a pass ([`standings`])
//!
//! Judging failures skip a match; they never abort the pass unless every
//! planned match was skipped.

pub mod error;
pub mod planner;
pub mod ranker;
pub mod standings;

pub use error::TournamentError;
pub use planner::{match_count, plan_matches, tournament_seed, MatchPlan};
pub use ranker::{MatchRecord, SkippedMatch, TournamentOutcome, TournamentRanker};
pub use standings::Standings;
