//! Spawning wrapped task bodies

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{SlotGuard, TaskContext, TaskError, TaskEvent, TaskOutcome};
use crate::domain::{TaskId, TaskSlot};

/// A task body: resolves to a completion label or a [`TaskError`]
pub type TaskFuture = BoxFuture<'static, Result<String, TaskError>>;

/// One-shot work for the ad-hoc slot
pub type TaskWork = Box<dyn FnOnce(TaskContext) -> TaskFuture + Send + 'static>;

/// Work factory for the effect slot, invoked once per observed key
pub type EffectWork<K> = Arc<dyn Fn(K, TaskContext) -> TaskFuture + Send + Sync + 'static>;

/// Spawn `work` so that cancellation and slot release happen on every path
///
/// The body is raced against `token`; once cancellation is requested the body
/// is dropped at its current suspension point and the outcome is
/// `Cancelled`. The [`SlotGuard`] reports the outcome to `events` before the
/// join handle resolves.
pub fn spawn_task(
    slot: TaskSlot,
    id: TaskId,
    token: CancellationToken,
    events: mpsc::UnboundedSender<TaskEvent>,
    work: TaskFuture,
) -> JoinHandle<TaskOutcome> {
    debug!(%id, %slot, "spawn_task: called");
    tokio::spawn(async move {
        let mut guard = SlotGuard::new(slot, id, events);

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(TaskError::Cancelled),
            result = work => result,
        };

        let outcome = TaskOutcome::from_result(result);
        debug!(%id, %slot, ?outcome, "spawn_task: body finished");
        guard.finish(outcome.clone());
        outcome
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::api::ApiError;

    #[tokio::test]
    async fn test_completed_body_reports_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_task(
            TaskSlot::AdHoc,
            TaskId::new(1),
            CancellationToken::new(),
            tx,
            Box::pin(async { Ok::<_, TaskError>("done".to_string()) }),
        );

        assert_eq!(handle.await.unwrap(), TaskOutcome::Completed("done".to_string()));
        assert_eq!(
            rx.recv().await.unwrap(),
            TaskEvent::Finished {
                slot: TaskSlot::AdHoc,
                id: TaskId::new(1),
                outcome: TaskOutcome::Completed("done".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_failed_body_reports_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_task(
            TaskSlot::AdHoc,
            TaskId::new(2),
            CancellationToken::new(),
            tx,
            Box::pin(async { Err::<String, _>(TaskError::Api(ApiError::Decode("bad json".to_string()))) }),
        );

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, TaskOutcome::Failed("Decode error: bad json".to_string()));
        assert!(matches!(rx.recv().await.unwrap(), TaskEvent::Finished { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_body_at_suspension_point() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let handle = spawn_task(
            TaskSlot::Effect,
            TaskId::new(3),
            token.clone(),
            tx,
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, TaskError>("never".to_string())
            }),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        assert_eq!(handle.await.unwrap(), TaskOutcome::Cancelled);
        assert!(matches!(
            rx.recv().await.unwrap(),
            TaskEvent::Finished {
                outcome: TaskOutcome::Cancelled,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_still_releases_slot() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_task(
            TaskSlot::Effect,
            TaskId::new(4),
            CancellationToken::new(),
            tx,
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, TaskError>("never".to_string())
            }),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        assert!(matches!(
            rx.recv().await.unwrap(),
            TaskEvent::Finished {
                outcome: TaskOutcome::Cancelled,
                ..
            }
        ));
    }
}
