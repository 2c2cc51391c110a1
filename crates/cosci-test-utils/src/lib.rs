//! Testing utilities for the Co-Scientist workspace
//!
//! Scripted capabilities and population fixtures. Every mock counts its
//! calls so tests can assert on how often a capability was consulted.

#![allow(missing_docs)]

use cosci_core::{
    Capability, CapabilityError, EvolutionRequest, Evolver, GenerationContext, Generator,
    HypothesisDraft, HypothesisId, Judge, LiteratureContext, LiteratureSource, MatchOutcome,
    MetaReview, MetaReviewer, PopulationStore, ReflectionClass, ReflectionNote, Reflector,
    Review, ReviewRequest, ReviewScores, ReviewedHypothesis, Reviewer, SimilarityOracle,
    Supervisor, SupervisorGuidance, Verdict,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Store holding one active hypothesis per text, ids in text order
pub fn population(texts: &[&str]) -> (PopulationStore, Vec<HypothesisId>) {
    let mut store = PopulationStore::default();
    let ids = texts
        .iter()
        .map(|text| store.add(HypothesisDraft::generated(*text), 0).unwrap())
        .collect();
    (store, ids)
}

/// Store with `n` hypotheses named `H1..Hn`
pub fn numbered_population(n: usize) -> (PopulationStore, Vec<HypothesisId>) {
    let texts: Vec<String> = (1..=n).map(|i| format!("H{i}")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    population(&refs)
}

fn unordered(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

type JudgeRule = dyn Fn(&str, &str) -> MatchOutcome + Send + Sync;

/// Judge driven by a rule over the two texts
pub struct ScriptedJudge {
    rule: Box<JudgeRule>,
    failing: HashSet<(String, String)>,
    calls: AtomicUsize,
    log: Mutex<Vec<(String, String)>>,
}

impl ScriptedJudge {
    pub fn new(rule: impl Fn(&str, &str) -> MatchOutcome + Send + Sync + 'static) -> Self {
        Self {
            rule: Box::new(rule),
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Prefers whichever text appears earlier in `order`; unknown texts lose
    pub fn ranked(order: &[&str]) -> Self {
        let order: Vec<String> = order.iter().map(|s| (*s).to_string()).collect();
        Self::new(move |a, b| {
            let pos = |t: &str| order.iter().position(|o| o == t).unwrap_or(usize::MAX);
            match pos(a).cmp(&pos(b)) {
                std::cmp::Ordering::Less => MatchOutcome::AWins,
                std::cmp::Ordering::Greater => MatchOutcome::BWins,
                std::cmp::Ordering::Equal => MatchOutcome::Tie,
            }
        })
    }

    /// Always declares a tie
    pub fn ties() -> Self {
        Self::new(|_, _| MatchOutcome::Tie)
    }

    /// Fail whenever these two texts meet, in either order
    #[must_use]
    pub fn fail_on(mut self, a: &str, b: &str) -> Self {
        self.failing.insert(unordered(a, b));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Text pairs in the order they were judged
    pub fn log(&self) -> Vec<(String, String)> {
        self.log.lock().clone()
    }
}

#[async_trait::async_trait]
impl Judge for ScriptedJudge {
    async fn judge(&self, _goal: &str, text_a: &str, text_b: &str) -> Result<Verdict, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push((text_a.to_string(), text_b.to_string()));
        if self.failing.contains(&unordered(text_a, text_b)) {
            return Err(CapabilityError::permanent(Capability::Judging, "no decision"));
        }
        Ok(Verdict::new((self.rule)(text_a, text_b)))
    }
}

/// Judge that always fails
#[derive(Default)]
pub struct FailingJudge {
    calls: AtomicUsize,
}

impl FailingJudge {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Judge for FailingJudge {
    async fn judge(&self, _: &str, _: &str, _: &str) -> Result<Verdict, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CapabilityError::transient(Capability::Judging, "judge unavailable"))
    }
}

/// Similarity from a lookup table over unordered text pairs
///
/// Identical texts score 1.0, unknown pairs 0.0.
#[derive(Default)]
pub struct TableSimilarity {
    scores: HashMap<(String, String), f64>,
    failing: HashSet<(String, String)>,
    calls: AtomicUsize,
}

impl TableSimilarity {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, a: &str, b: &str, score: f64) -> Self {
        self.scores.insert(unordered(a, b), score);
        self
    }

    #[must_use]
    pub fn fail_on(mut self, a: &str, b: &str) -> Self {
        self.failing.insert(unordered(a, b));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SimilarityOracle for TableSimilarity {
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = unordered(text_a, text_b);
        if self.failing.contains(&key) {
            return Err(CapabilityError::transient(Capability::Similarity, "oracle error"));
        }
        if text_a == text_b {
            return Ok(1.0);
        }
        Ok(self.scores.get(&key).copied().unwrap_or(0.0))
    }
}

/// Generator producing `"{prefix} {index}"`
pub struct MockGenerator {
    prefix: String,
    failing: HashSet<usize>,
    fail_all: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    contexts: Mutex<Vec<GenerationContext>>,
}

impl MockGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            failing: HashSet::new(),
            fail_all: false,
            delay: None,
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn fail_on(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new("unused")
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Contexts received so far
    pub fn contexts(&self) -> Vec<GenerationContext> {
        self.contexts.lock().clone()
    }
}

#[async_trait::async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, context: &GenerationContext) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().push(context.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all || self.failing.contains(&context.index) {
            return Err(CapabilityError::permanent(Capability::Generation, "model refused"));
        }
        Ok(format!("{} {}", self.prefix, context.index))
    }
}

/// Reviewer scoring every target with the same criteria
pub struct MockReviewer {
    scores: ReviewScores,
    failing: HashSet<String>,
    omitted: HashSet<String>,
    fail_all: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<ReviewRequest>>,
}

impl MockReviewer {
    pub fn new() -> Self {
        Self {
            scores: ReviewScores::new()
                .with("novelty", 3.0)
                .with("feasibility", 4.0)
                .with("testability", 3.5),
            failing: HashSet::new(),
            omitted: HashSet::new(),
            fail_all: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    /// Calls that include this text fail
    #[must_use]
    pub fn fail_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Responses leave this text's entry empty
    #[must_use]
    pub fn omit(mut self, text: &str) -> Self {
        self.omitted.insert(text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ReviewRequest> {
        self.requests.lock().clone()
    }
}

impl Default for MockReviewer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Reviewer for MockReviewer {
    async fn review(&self, request: &ReviewRequest) -> Result<Vec<Option<Review>>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        if self.fail_all || request.targets.iter().any(|t| self.failing.contains(&t.text)) {
            return Err(CapabilityError::permanent(Capability::Review, "review failed"));
        }
        Ok(request
            .targets
            .iter()
            .map(|target| {
                if self.omitted.contains(&target.text) {
                    None
                } else {
                    Some(
                        Review::new(self.scores.clone())
                            .with_feedback(format!("sharpen the mechanism in `{}`", target.text)),
                    )
                }
            })
            .collect())
    }
}

/// Evolver appending `" (refined)"`
#[derive(Default)]
pub struct MockEvolver {
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl MockEvolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fail_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Evolver for MockEvolver {
    async fn evolve(&self, request: &EvolutionRequest) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&request.text) {
            return Err(CapabilityError::permanent(Capability::Evolution, "refinement failed"));
        }
        Ok(format!("{} (refined)", request.text))
    }
}

/// Meta-reviewer returning a fixed synthesis
pub struct MockMetaReviewer {
    result: Result<MetaReview, CapabilityError>,
    calls: AtomicUsize,
}

impl MockMetaReviewer {
    pub fn new() -> Self {
        Self {
            result: Ok(MetaReview {
                common_strengths: vec!["clear mechanism".to_string()],
                common_weaknesses: vec!["weak controls".to_string()],
                strategic_recommendations: vec!["add a falsification test".to_string()],
            }),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            result: Err(CapabilityError::permanent(Capability::MetaReview, "synthesis failed")),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockMetaReviewer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MetaReviewer for MockMetaReviewer {
    async fn meta_review(
        &self,
        _goal: &str,
        _ranked: &[ReviewedHypothesis],
    ) -> Result<MetaReview, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Literature source returning a fixed context or failing
pub struct MockLiterature {
    result: Result<LiteratureContext, CapabilityError>,
    calls: AtomicUsize,
}

impl MockLiterature {
    pub fn new(summary: &str) -> Self {
        Self {
            result: Ok(LiteratureContext {
                summary: summary.to_string(),
                references: vec!["Doe et al. 2021".to_string()],
            }),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            result: Err(CapabilityError::Unavailable(Capability::Literature)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LiteratureSource for MockLiterature {
    async fn search(&self, _goal: &str) -> Result<LiteratureContext, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Supervisor returning a fixed plan
pub struct MockSupervisor {
    result: Result<SupervisorGuidance, CapabilityError>,
    calls: AtomicUsize,
}

impl MockSupervisor {
    pub fn new(key_areas: &[&str]) -> Self {
        Self {
            result: Ok(SupervisorGuidance {
                key_areas: key_areas.iter().map(ToString::to_string).collect(),
                focus_areas: vec!["mechanism".to_string()],
                diversity_targets: "span host and microbial factors".to_string(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            result: Err(CapabilityError::permanent(Capability::Supervision, "planner offline")),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Supervisor for MockSupervisor {
    async fn plan(&self, _goal: &str) -> Result<SupervisorGuidance, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Reflector assigning one class to every text
pub struct MockReflector {
    classification: ReflectionClass,
    failing: HashSet<String>,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl MockReflector {
    pub fn new(classification: ReflectionClass) -> Self {
        Self {
            classification,
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    /// Reflecting on this text fails
    #[must_use]
    pub fn fail_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts reflected on, in call order
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().clone()
    }
}

#[async_trait::async_trait]
impl Reflector for MockReflector {
    async fn reflect(
        &self,
        _goal: &str,
        literature: &LiteratureContext,
        text: &str,
    ) -> Result<ReflectionNote, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().push(text.to_string());
        if self.failing.contains(text) {
            return Err(CapabilityError::permanent(Capability::Reflection, "reflection refused"));
        }
        Ok(ReflectionNote::new(
            self.classification,
            format!("weighed against {}", literature.summary),
        ))
    }
}
