//! Per-task context handed to task bodies

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{TaskError, TaskOutcome};
use crate::domain::{TaskId, TaskSlot};

/// Event sent from a running task back to the lifecycle manager
///
/// Tasks never touch slots themselves; they report, and the manager decides
/// whether the sender is still the current occupant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Progress {
        slot: TaskSlot,
        id: TaskId,
        label: String,
    },
    Finished {
        slot: TaskSlot,
        id: TaskId,
        outcome: TaskOutcome,
    },
}

/// Handle a task body uses to observe cancellation and report progress
#[derive(Debug, Clone)]
pub struct TaskContext {
    id: TaskId,
    slot: TaskSlot,
    token: CancellationToken,
    events: mpsc::UnboundedSender<TaskEvent>,
}

impl TaskContext {
    pub fn new(id: TaskId, slot: TaskSlot, token: CancellationToken, events: mpsc::UnboundedSender<TaskEvent>) -> Self {
        Self {
            id,
            slot,
            token,
            events,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Cancellation-aware delay
    pub async fn sleep(&self, duration: Duration) -> Result<(), TaskError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!(id = %self.id, slot = %self.slot, "TaskContext::sleep: cancelled");
                Err(TaskError::Cancelled)
            }
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Report a progress label; dropped by the manager if this task is stale
    pub fn progress(&self, label: impl Into<String>) {
        let _ = self.events.send(TaskEvent::Progress {
            slot: self.slot,
            id: self.id,
            label: label.into(),
        });
    }
}
