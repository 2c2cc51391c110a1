//! Offline capabilities for simulated runs
//!
//! Every response is a pure function of the seed and the request, so a
//! simulated run is reproducible end to end.

use async_trait::async_trait;
use cosci_core::{
    CapabilityError, EvolutionRequest, Evolver, GenerationContext, Generator, Judge,
    LiteratureContext, LiteratureSource, MatchOutcome, MetaReview, MetaReviewer,
    ReflectionClass, ReflectionNote, Reflector, Review, ReviewRequest, ReviewScores,
    ReviewedHypothesis, Reviewer, Supervisor, SupervisorGuidance, Verdict,
};
use cosci_orchestrator::Capabilities;
use cosci_proximity::LexicalSimilarity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const AGENTS: &[&str] = &[
    "Short-chain fatty acids",
    "Microglial priming",
    "Vagal afferent signalling",
    "Tryptophan metabolism",
    "Bile acid recycling",
    "Mucosal barrier integrity",
    "Circadian clock genes",
    "Histamine release",
];

const EFFECTS: &[&str] = &[
    "shift",
    "stabilise",
    "gate",
    "amplify",
    "entrain",
    "suppress",
];

const TARGETS: &[&str] = &[
    "slow-wave sleep onset",
    "REM fragmentation",
    "melatonin synthesis",
    "hypothalamic orexin tone",
    "nocturnal cortisol",
    "sleep spindle density",
];

const CONTROLS: &[&str] = &[
    "a germ-free cohort",
    "antibiotic depletion",
    "a crossover diet",
    "faecal transfer",
];

/// Deterministic stream for `(seed, parts)`
fn stream(seed: u64, parts: &[&str]) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    StdRng::seed_from_u64(u64::from_le_bytes(bytes))
}

fn pick<'a>(rng: &mut StdRng, options: &[&'a str]) -> &'a str {
    options[rng.random_range(0..options.len())]
}

/// Hidden merit of a text in `[0, 1)`; each refinement adds a bonus
fn merit(seed: u64, text: &str) -> f64 {
    let base: f64 = stream(seed, &["merit", text]).random();
    #[allow(clippy::cast_precision_loss)]
    let refinements = text.matches("controlled by").count() as f64;
    (base + 0.15 * refinements).min(0.999)
}

/// Template generator
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatedGenerator {
    seed: u64,
}

#[async_trait]
impl Generator for SimulatedGenerator {
    async fn generate(&self, context: &GenerationContext) -> Result<String, CapabilityError> {
        let index = context.index.to_string();
        let mut rng = stream(self.seed, &["generate", &context.goal, &index]);
        let agent = match &context.guidance {
            Some(guidance) if !guidance.key_areas.is_empty() => {
                guidance.key_areas[context.index % guidance.key_areas.len()].as_str()
            }
            _ => pick(&mut rng, AGENTS),
        };
        let mut text = format!(
            "{agent} {} {}",
            pick(&mut rng, EFFECTS),
            pick(&mut rng, TARGETS)
        );
        if context.literature.is_some() {
            text.push_str(" in line with prior cohort findings");
        }
        Ok(text)
    }
}

/// Scores derived from hidden merit
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatedReviewer {
    seed: u64,
}

#[async_trait]
impl Reviewer for SimulatedReviewer {
    async fn review(&self, request: &ReviewRequest) -> Result<Vec<Option<Review>>, CapabilityError> {
        Ok(request
            .targets
            .iter()
            .map(|target| {
                let merit = merit(self.seed, &target.text);
                let mut rng = stream(self.seed, &["review", &target.text]);
                let jitter = |rng: &mut StdRng| -> f64 { rng.random_range(-0.5..0.5) };
                let scores = ReviewScores::new()
                    .with("novelty", (1.0 + 4.0 * merit + jitter(&mut rng)).clamp(0.0, 5.0))
                    .with("feasibility", (2.0 + 3.0 * merit + jitter(&mut rng)).clamp(0.0, 5.0))
                    .with("testability", (1.5 + 3.5 * merit + jitter(&mut rng)).clamp(0.0, 5.0));
                Some(
                    Review::new(scores)
                        .with_summary(format!("merit estimate {merit:.2}"))
                        .with_feedback(format!(
                            "controlled by {}",
                            pick(&mut rng, CONTROLS)
                        )),
                )
            })
            .collect())
    }
}

/// Judge preferring the text with higher hidden merit
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatedJudge {
    seed: u64,
}

#[async_trait]
impl Judge for SimulatedJudge {
    async fn judge(&self, _goal: &str, text_a: &str, text_b: &str) -> Result<Verdict, CapabilityError> {
        let (a, b) = (merit(self.seed, text_a), merit(self.seed, text_b));
        let outcome = if (a - b).abs() < 0.02 {
            MatchOutcome::Tie
        } else if a > b {
            MatchOutcome::AWins
        } else {
            MatchOutcome::BWins
        };
        Ok(Verdict {
            outcome,
            rationale: format!("merit {a:.2} vs {b:.2}"),
        })
    }
}

/// Appends the reviewer's suggested control
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatedEvolver;

#[async_trait]
impl Evolver for SimulatedEvolver {
    async fn evolve(&self, request: &EvolutionRequest) -> Result<String, CapabilityError> {
        let feedback = request
            .feedback
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or("controlled by a matched placebo arm");
        Ok(format!("{}, {feedback}", request.text))
    }
}

/// Summarises the leading hypotheses
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatedMetaReviewer;

#[async_trait]
impl MetaReviewer for SimulatedMetaReviewer {
    async fn meta_review(
        &self,
        _goal: &str,
        ranked: &[ReviewedHypothesis],
    ) -> Result<MetaReview, CapabilityError> {
        let strengths = ranked
            .iter()
            .take(2)
            .map(|h| format!("{} leads at {:.0}", h.id, h.rating))
            .collect();
        let weaknesses = ranked
            .iter()
            .filter(|h| h.review.is_none())
            .map(|h| format!("{} lacks a review", h.id))
            .collect();
        Ok(MetaReview {
            common_strengths: strengths,
            common_weaknesses: weaknesses,
            strategic_recommendations: vec!["add an explicit control arm".to_string()],
        })
    }
}

/// Fixed literature context
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatedLiterature;

#[async_trait]
impl LiteratureSource for SimulatedLiterature {
    async fn search(&self, goal: &str) -> Result<LiteratureContext, CapabilityError> {
        Ok(LiteratureContext {
            summary: format!("simulated survey for `{goal}`"),
            references: vec!["Simulated et al. (offline)".to_string()],
        })
    }
}

/// Plans around a seeded subset of agents
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatedSupervisor {
    seed: u64,
}

#[async_trait]
impl Supervisor for SimulatedSupervisor {
    async fn plan(&self, goal: &str) -> Result<SupervisorGuidance, CapabilityError> {
        let mut rng = stream(self.seed, &["plan", goal]);
        let mut key_areas: Vec<String> = Vec::new();
        while key_areas.len() < 4 {
            let agent = pick(&mut rng, AGENTS);
            if !key_areas.iter().any(|a| a == agent) {
                key_areas.push(agent.to_string());
            }
        }
        Ok(SupervisorGuidance {
            key_areas,
            focus_areas: vec![pick(&mut rng, TARGETS).to_string()],
            diversity_targets: "cover host and microbial mechanisms".to_string(),
        })
    }
}

/// Classifies a hypothesis from its hidden merit
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatedReflector {
    seed: u64,
}

#[async_trait]
impl Reflector for SimulatedReflector {
    async fn reflect(
        &self,
        _goal: &str,
        literature: &LiteratureContext,
        text: &str,
    ) -> Result<ReflectionNote, CapabilityError> {
        let merit = merit(self.seed, text);
        let classification = match merit {
            m if m >= 0.8 => ReflectionClass::MissingPiece,
            m if m >= 0.5 => ReflectionClass::Neutral,
            m if m >= 0.3 => ReflectionClass::OtherExplanationsMoreLikely,
            m if m >= 0.1 => ReflectionClass::AlreadyExplained,
            _ => ReflectionClass::Disproved,
        };
        Ok(ReflectionNote::new(
            classification,
            format!("merit {merit:.2} against {}", literature.summary),
        ))
    }
}

/// Full simulated bundle
///
/// # Errors
/// Only if the lexical similarity pattern fails to compile.
pub(crate) fn capabilities(seed: u64) -> anyhow::Result<Capabilities> {
    Ok(Capabilities::new(
        SimulatedGenerator { seed },
        SimulatedReviewer { seed },
        SimulatedJudge { seed },
        LexicalSimilarity::new()?,
        SimulatedEvolver,
    )
    .with_meta_reviewer(SimulatedMetaReviewer)
    .with_literature(SimulatedLiterature)
    .with_supervisor(SimulatedSupervisor { seed })
    .with_reflector(SimulatedReflector { seed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosci_core::{ReviewMode, ReviewTarget, WorkflowConfig};
    use cosci_orchestrator::{Orchestrator, RunStatus};

    fn context(index: usize) -> GenerationContext {
        GenerationContext {
            goal: "sleep".to_string(),
            literature: None,
            index,
            meta_review: None,
            guidance: None,
        }
    }

    #[tokio::test]
    async fn generation_is_seeded() {
        let a = SimulatedGenerator { seed: 7 };
        let b = SimulatedGenerator { seed: 7 };
        assert_eq!(
            a.generate(&context(3)).await.unwrap(),
            b.generate(&context(3)).await.unwrap()
        );
    }

    #[test]
    fn merit_is_bounded_and_stable() {
        let text = "Histamine release gate REM fragmentation";
        let refined = format!("{text}, controlled by a germ-free cohort, controlled by faecal transfer");
        for t in [text, refined.as_str()] {
            assert!((0.0..1.0).contains(&merit(1, t)));
            assert_eq!(merit(1, t).to_bits(), merit(1, t).to_bits());
        }
    }

    #[tokio::test]
    async fn judge_is_antisymmetric() {
        let judge = SimulatedJudge { seed: 3 };
        let ab = judge.judge("g", "alpha", "beta").await.unwrap().outcome;
        let ba = judge.judge("g", "beta", "alpha").await.unwrap().outcome;
        assert_eq!(ab, ba.swapped());
    }

    #[tokio::test]
    async fn reviewer_scores_every_target() {
        let reviewer = SimulatedReviewer { seed: 5 };
        let request = ReviewRequest {
            goal: "g".to_string(),
            targets: vec![
                ReviewTarget {
                    id: cosci_core::HypothesisId::new(1),
                    text: "one".to_string(),
                    reflection: None,
                },
                ReviewTarget {
                    id: cosci_core::HypothesisId::new(2),
                    text: "two".to_string(),
                    reflection: None,
                },
            ],
            mode: ReviewMode::Comparative,
            meta_review: None,
            guidance: None,
        };
        let reviews = reviewer.review(&request).await.unwrap();
        assert_eq!(reviews.len(), 2);
        for review in reviews.into_iter().flatten() {
            assert!(review.scores.validate().is_ok());
            assert!(review.feedback.starts_with("controlled by"));
        }
    }

    #[tokio::test]
    async fn planned_generation_draws_on_key_areas() {
        let plan = SimulatedSupervisor { seed: 2 }.plan("sleep").await.unwrap();
        assert_eq!(plan.key_areas.len(), 4);
        let generator = SimulatedGenerator { seed: 2 };
        let mut planned = context(5);
        planned.guidance = Some(plan.clone());
        let text = generator.generate(&planned).await.unwrap();
        assert!(text.starts_with(&plan.key_areas[1]));
    }

    #[tokio::test]
    async fn reflection_follows_merit() {
        let reflector = SimulatedReflector { seed: 9 };
        let literature = LiteratureContext {
            summary: "survey".to_string(),
            references: Vec::new(),
        };
        let text = "Bile acid recycling gate nocturnal cortisol";
        let note = reflector.reflect("g", &literature, text).await.unwrap();
        let again = reflector.reflect("g", &literature, text).await.unwrap();
        assert_eq!(note, again);
        assert!(note.reasoning.ends_with("against survey"));
    }

    async fn run(config: &WorkflowConfig) -> cosci_orchestrator::RunReport {
        Orchestrator::new(config.clone(), capabilities(11).unwrap())
            .unwrap()
            .run("How does the gut microbiome shape sleep?")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn simulated_run_completes_and_replays() {
        let config = WorkflowConfig::default().with_max_iterations(2);
        let first = run(&config).await;
        let second = run(&config).await;

        assert_eq!(first.status, RunStatus::Completed);
        assert!(!first.ranked().is_empty());
        assert!(first.state.guidance().is_some());
        assert!(first.state.population().iter().all(|h| h.reflection().is_some()));
        assert_eq!(first.state.match_history(), second.state.match_history());
    }
}
