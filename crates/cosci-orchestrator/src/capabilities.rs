//! Capability bundle handed to the orchestrator

use crate::cache::{CachedJudge, CachedSimilarity};
use crate::retry::{RetryPolicy, Retrying};
use cosci_core::{
    Evolver, Generator, Judge, LiteratureSource, MetaReviewer, Reflector, Reviewer,
    SimilarityOracle, Supervisor,
};
use std::sync::Arc;

/// External collaborators consumed by the stages
///
/// Meta-review, literature, supervision and reflection are optional
/// enrichments; without them the run keeps the previous meta-review,
/// continues ungrounded, generates without a plan, or reviews without
/// reflection notes.
#[derive(Clone)]
pub struct Capabilities {
    /// Hypothesis generation
    pub generator: Arc<dyn Generator>,
    /// Review scoring
    pub reviewer: Arc<dyn Reviewer>,
    /// Tournament judging
    pub judge: Arc<dyn Judge>,
    /// Pairwise similarity
    pub similarity: Arc<dyn SimilarityOracle>,
    /// Refinement
    pub evolver: Arc<dyn Evolver>,
    /// Population synthesis
    pub meta_reviewer: Option<Arc<dyn MetaReviewer>>,
    /// Literature grounding
    pub literature: Option<Arc<dyn LiteratureSource>>,
    /// Research planning
    pub supervisor: Option<Arc<dyn Supervisor>>,
    /// Literature reflection
    pub reflector: Option<Arc<dyn Reflector>>,
}

impl Capabilities {
    /// Bundle the required capabilities
    pub fn new(
        generator: impl Generator + 'static,
        reviewer: impl Reviewer + 'static,
        judge: impl Judge + 'static,
        similarity: impl SimilarityOracle + 'static,
        evolver: impl Evolver + 'static,
    ) -> Self {
        Self {
            generator: Arc::new(generator),
            reviewer: Arc::new(reviewer),
            judge: Arc::new(judge),
            similarity: Arc::new(similarity),
            evolver: Arc::new(evolver),
            meta_reviewer: None,
            literature: None,
            supervisor: None,
            reflector: None,
        }
    }

    /// With a meta-reviewer
    #[must_use]
    pub fn with_meta_reviewer(mut self, meta_reviewer: impl MetaReviewer + 'static) -> Self {
        self.meta_reviewer = Some(Arc::new(meta_reviewer));
        self
    }

    /// With a literature source
    #[must_use]
    pub fn with_literature(mut self, literature: impl LiteratureSource + 'static) -> Self {
        self.literature = Some(Arc::new(literature));
        self
    }

    /// With a supervisor
    #[must_use]
    pub fn with_supervisor(mut self, supervisor: impl Supervisor + 'static) -> Self {
        self.supervisor = Some(Arc::new(supervisor));
        self
    }

    /// With a reflector
    #[must_use]
    pub fn with_reflector(mut self, reflector: impl Reflector + 'static) -> Self {
        self.reflector = Some(Arc::new(reflector));
        self
    }

    /// Wrap every capability in a retry policy
    #[must_use]
    pub fn with_retry(self, policy: RetryPolicy) -> Self {
        Self {
            generator: Arc::new(Retrying::new(self.generator, policy)),
            reviewer: Arc::new(Retrying::new(self.reviewer, policy)),
            judge: Arc::new(Retrying::new(self.judge, policy)),
            similarity: Arc::new(Retrying::new(self.similarity, policy)),
            evolver: Arc::new(Retrying::new(self.evolver, policy)),
            meta_reviewer: self
                .meta_reviewer
                .map(|m| Arc::new(Retrying::new(m, policy)) as Arc<dyn MetaReviewer>),
            literature: self
                .literature
                .map(|l| Arc::new(Retrying::new(l, policy)) as Arc<dyn LiteratureSource>),
            supervisor: self
                .supervisor
                .map(|s| Arc::new(Retrying::new(s, policy)) as Arc<dyn Supervisor>),
            reflector: self
                .reflector
                .map(|r| Arc::new(Retrying::new(r, policy)) as Arc<dyn Reflector>),
        }
    }

    /// Memoize judging and similarity responses
    #[must_use]
    pub fn with_response_cache(mut self, max_capacity: u64) -> Self {
        self.judge = Arc::new(CachedJudge::new(self.judge, max_capacity));
        self.similarity = Arc::new(CachedSimilarity::new(self.similarity, max_capacity));
        self
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("meta_reviewer", &self.meta_reviewer.is_some())
            .field("literature", &self.literature.is_some())
            .field("supervisor", &self.supervisor.is_some())
            .field("reflector", &self.reflector.is_some())
            .finish_non_exhaustive()
    }
}
