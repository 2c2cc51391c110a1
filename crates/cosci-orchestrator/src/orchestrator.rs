//! Iteration state machine driver
//!
//! Owns the run's [`WorkflowState`]. Each stage is raced against the
//! cancellation signal; a completed stage's delta is merged, a snapshot is
//! emitted, and the transition rules pick the next stage.

use crate::cancel::CancellationSignal;
use crate::capabilities::Capabilities;
use crate::error::WorkflowError;
use crate::events::{EventSender, StageEvent};
use crate::stages::{self, StageContext};
use crate::state::{StageDelta, WorkflowState};
use crate::transition::{next_stage, validate_transition};
use cosci_core::{Diagnostic, Hypothesis, Stage, WorkflowConfig};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Reached `Terminal`
    Completed,
    /// Stopped by the cancellation signal
    Cancelled,
}

/// Final state of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Terminal status
    pub status: RunStatus,
    /// State at the end of the run
    pub state: WorkflowState,
}

impl RunReport {
    /// Active hypotheses, best first
    #[must_use]
    pub fn ranked(&self) -> Vec<&Hypothesis> {
        self.state.population().ranked_active()
    }
}

/// Runs the hypothesis workflow
#[derive(Debug)]
pub struct Orchestrator {
    config: WorkflowConfig,
    capabilities: Capabilities,
    events: Option<EventSender>,
    cancellation: CancellationSignal,
}

impl Orchestrator {
    /// Create orchestrator
    ///
    /// # Errors
    /// `Config` if the configuration fails validation.
    pub fn new(config: WorkflowConfig, capabilities: Capabilities) -> Result<Self, WorkflowError> {
        config.validate()?;
        Ok(Self {
            config,
            capabilities,
            events: None,
            cancellation: CancellationSignal::never(),
        })
    }

    /// Emit a [`StageEvent`] after every stage
    #[must_use]
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Observe a cancellation signal
    #[must_use]
    pub fn with_cancellation(mut self, signal: CancellationSignal) -> Self {
        self.cancellation = signal;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run the workflow for `research_goal`
    ///
    /// # Errors
    /// - `EmptyGoal` for a blank goal
    /// - `StageFailed` when `Generate`, `Review`, `Rank` or `ReRank` cannot
    ///   produce a result
    /// - `Population` if a stage delta cannot be merged
    pub async fn run(&self, research_goal: &str) -> Result<RunReport, WorkflowError> {
        if research_goal.trim().is_empty() {
            return Err(WorkflowError::EmptyGoal);
        }

        let mut state = WorkflowState::new(research_goal, &self.config);
        info!(
            run_id = %state.run_id(),
            max_iterations = state.max_iterations(),
            "workflow run started"
        );

        let mut stage = next_stage(Stage::Init, 0, state.max_iterations());
        validate_transition(Stage::Init, stage)?;

        loop {
            if self.cancellation.is_cancelled() {
                return Ok(Self::cancel(state));
            }
            state.set_stage(stage);
            let iteration = state.iteration();
            info!(stage = %stage, iteration, "stage started");

            let ctx = StageContext {
                capabilities: &self.capabilities,
                config: &self.config,
            };
            let result = tokio::select! {
                biased;
                () = self.cancellation.cancelled() => None,
                result = stages::execute(stage, ctx, &state) => Some(result),
            };
            let Some(result) = result else {
                return Ok(Self::cancel(state));
            };

            let delta = match result {
                Ok(delta) => delta,
                Err(cause) if stage.is_load_bearing() => {
                    error!(stage = %stage, iteration, %cause, "stage failed, aborting run");
                    return Err(WorkflowError::stage_failed(stage, iteration, cause));
                }
                Err(cause) => {
                    warn!(stage = %stage, iteration, %cause, "optional stage failed, continuing");
                    state.record(Diagnostic::warning(stage, iteration, format!("stage skipped: {cause}")));
                    StageDelta::new()
                }
            };
            state.merge(delta, self.config.elo.k_factor)?;
            info!(
                stage = %stage,
                iteration,
                active = state.population().active_count(),
                "stage completed"
            );
            self.emit(stage, &state).await;

            let next = next_stage(stage, iteration, state.max_iterations());
            validate_transition(stage, next)?;
            if next == Stage::Terminal {
                state.set_stage(Stage::Terminal);
                info!(
                    run_id = %state.run_id(),
                    iterations = state.iteration(),
                    active = state.population().active_count(),
                    "workflow run completed"
                );
                return Ok(RunReport {
                    status: RunStatus::Completed,
                    state,
                });
            }
            if stage == Stage::Deduplicate {
                state.advance_iteration();
            }
            stage = next;
        }
    }

    fn cancel(mut state: WorkflowState) -> RunReport {
        let (stage, iteration) = (state.stage(), state.iteration());
        warn!(stage = %stage, iteration, "workflow run cancelled");
        state.record(Diagnostic::info(stage, iteration, "run cancelled; in-flight stage discarded"));
        state.set_stage(Stage::Cancelled);
        RunReport {
            status: RunStatus::Cancelled,
            state,
        }
    }

    async fn emit(&self, stage: Stage, state: &WorkflowState) {
        let Some(sender) = &self.events else {
            return;
        };
        if sender.send(StageEvent::capture(stage, state)).await.is_err() {
            debug!(stage = %stage, "event receiver dropped");
        }
    }
}
