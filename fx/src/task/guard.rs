//! Guaranteed slot release

use tokio::sync::mpsc;
use tracing::debug;

use super::{TaskEvent, TaskOutcome};
use crate::domain::{TaskId, TaskSlot};

/// Reports a task's terminal outcome to its slot owner when dropped
///
/// Runs on every exit path of the task future. If the future is dropped
/// before [`SlotGuard::finish`] is called (abort, panic, runtime shutdown)
/// the outcome is reported as cancelled.
pub struct SlotGuard {
    slot: TaskSlot,
    id: TaskId,
    events: mpsc::UnboundedSender<TaskEvent>,
    outcome: Option<TaskOutcome>,
}

impl SlotGuard {
    pub fn new(slot: TaskSlot, id: TaskId, events: mpsc::UnboundedSender<TaskEvent>) -> Self {
        Self {
            slot,
            id,
            events,
            outcome: None,
        }
    }

    /// Record the outcome that will be reported on drop
    pub fn finish(&mut self, outcome: TaskOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or(TaskOutcome::Cancelled);
        debug!(id = %self.id, slot = %self.slot, ?outcome, "SlotGuard::drop: releasing slot");
        // Receiver gone means the manager already shut down
        let _ = self.events.send(TaskEvent::Finished {
            slot: self.slot,
            id: self.id,
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_without_finish_reports_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(SlotGuard::new(TaskSlot::Effect, TaskId::new(3), tx));

        assert_eq!(
            rx.try_recv().unwrap(),
            TaskEvent::Finished {
                slot: TaskSlot::Effect,
                id: TaskId::new(3),
                outcome: TaskOutcome::Cancelled,
            }
        );
    }

    #[test]
    fn test_finish_reports_recorded_outcome_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut guard = SlotGuard::new(TaskSlot::AdHoc, TaskId::new(4), tx);
        guard.finish(TaskOutcome::Completed("done".to_string()));
        drop(guard);

        assert!(matches!(
            rx.try_recv().unwrap(),
            TaskEvent::Finished {
                outcome: TaskOutcome::Completed(_),
                ..
            }
        ));
        assert!(rx.try_recv().is_err());
    }
}
