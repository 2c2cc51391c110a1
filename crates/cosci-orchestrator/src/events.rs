//! Stage completion events

use crate::state::WorkflowState;
use chrono::{DateTime, Utc};
use cosci_core::Stage;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Snapshot emitted after a stage completes
#[derive(Debug, Clone)]
pub struct StageEvent {
    /// Completed stage
    pub stage: Stage,
    /// Iteration the stage ran in
    pub iteration: u32,
    /// Read-only copy of the state after the merge
    pub snapshot: Arc<WorkflowState>,
    /// Emission time
    pub emitted_at: DateTime<Utc>,
}

impl StageEvent {
    pub(crate) fn capture(stage: Stage, state: &WorkflowState) -> Self {
        Self {
            stage,
            iteration: state.iteration(),
            snapshot: Arc::new(state.clone()),
            emitted_at: Utc::now(),
        }
    }
}

/// Receiving half of an event stream
pub type EventReceiver = mpsc::Receiver<StageEvent>;

/// Sending half of an event stream
pub type EventSender = mpsc::Sender<StageEvent>;

/// Create an event channel
#[must_use]
pub fn event_channel(buffer: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(buffer.max(1))
}
