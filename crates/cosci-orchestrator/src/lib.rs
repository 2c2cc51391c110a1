//! Co-Scientist Orchestrator
//!
//! Drives the iteration state machine
//! `Init → Generate → Review → Rank → (Terminal | MetaReview → Evolve →
//! ReReview → ReRank → Deduplicate → ...)`:
//! - Stage transition rules ([`transition`])
//! - Workflow state and stage deltas ([`state`])
//! - Stage executors over the external capabilities
//! - Snapshot events and cancellation ([`events`], [`cancel`])
//! - Retry and response-cache adapters ([`retry`], [`cache`])
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo(capabilities: cosci_orchestrator::Capabilities) -> Result<(), cosci_orchestrator::WorkflowError> {
//! use cosci_core::WorkflowConfig;
//! use cosci_orchestrator::{event_channel, Orchestrator};
//!
//! let (sender, mut events) = event_channel(16);
//! let orchestrator = Orchestrator::new(WorkflowConfig::default(), capabilities)?.with_events(sender);
//!
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("{} done ({} active)", event.stage, event.snapshot.population().active_count());
//!     }
//! });
//! let report = orchestrator.run("How does gut flora shape sleep?").await?;
//! println!("best: {}", report.ranked()[0].text());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cancel;
pub mod capabilities;
pub mod error;
pub mod events;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
mod stages;
pub mod state;
pub mod transition;

pub use cache::{CachedJudge, CachedSimilarity, CallKey, ResponseCache, DEFAULT_CAPACITY};
pub use cancel::{CancellationHandle, CancellationSignal};
pub use capabilities::Capabilities;
pub use error::{StageFailure, WorkflowError};
pub use events::{event_channel, EventReceiver, EventSender, StageEvent};
pub use metrics::RunMetrics;
pub use orchestrator::{Orchestrator, RunReport, RunStatus};
pub use retry::{RetryPolicy, Retrying};
pub use state::{StageDelta, WorkflowState};
pub use transition::{allowed_transitions, next_stage, validate_transition};
