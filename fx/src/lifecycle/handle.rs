//! LifecycleHandle - client interface to the TaskLifecycleManager actor

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

use super::manager::EffectKey;
use super::messages::{LifecycleCommand, LifecycleError, LifecycleResponse, LifecycleSnapshot};
use crate::domain::{Status, TaskId};
use crate::task::TaskWork;

/// Handle for talking to the TaskLifecycleManager actor
///
/// Cheap to clone. All mutation goes through the actor; the current status is
/// readable without a round trip.
#[derive(Clone)]
pub struct LifecycleHandle<K> {
    tx: mpsc::Sender<LifecycleCommand<K>>,
    status_rx: watch::Receiver<Status>,
    changes_tx: broadcast::Sender<Status>,
}

impl<K: EffectKey> LifecycleHandle<K> {
    pub(super) fn new(
        tx: mpsc::Sender<LifecycleCommand<K>>,
        status_rx: watch::Receiver<Status>,
        changes_tx: broadcast::Sender<Status>,
    ) -> Self {
        Self {
            tx,
            status_rx,
            changes_tx,
        }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> LifecycleCommand<K>) -> LifecycleResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| LifecycleError::ChannelClosed)?;
        reply_rx.await.map_err(|_| LifecycleError::ChannelClosed)
    }

    /// Observe a key; the effect task restarts even when the key is unchanged
    pub async fn on_key_changed(&self, key: K) -> LifecycleResponse<TaskId> {
        debug!(?key, "LifecycleHandle::on_key_changed: called");
        self.request(|reply| LifecycleCommand::KeyChanged { key, reply }).await
    }

    /// Start ad-hoc work, superseding whatever ad-hoc task is running
    pub async fn start_ad_hoc_task(&self, label: impl Into<String>, work: TaskWork) -> LifecycleResponse<TaskId> {
        let label = label.into();
        debug!(%label, "LifecycleHandle::start_ad_hoc_task: called");
        self.request(|reply| LifecycleCommand::StartAdHoc { label, work, reply })
            .await
    }

    /// Request cancellation of the ad-hoc task
    ///
    /// Returns false when no ad-hoc task is active. The `Cancelled` status is
    /// published once the task acknowledges.
    pub async fn cancel_ad_hoc_task(&self) -> LifecycleResponse<bool> {
        debug!("LifecycleHandle::cancel_ad_hoc_task: called");
        self.request(|reply| LifecycleCommand::CancelAdHoc { reply }).await
    }

    /// Request cancellation of the effect task
    pub async fn cancel_effect_task(&self) -> LifecycleResponse<bool> {
        debug!("LifecycleHandle::cancel_effect_task: called");
        self.request(|reply| LifecycleCommand::CancelEffect { reply }).await
    }

    pub async fn snapshot(&self) -> LifecycleResponse<LifecycleSnapshot<K>> {
        self.request(|reply| LifecycleCommand::Snapshot { reply }).await
    }

    /// Latest published status
    pub fn status(&self) -> Status {
        self.status_rx.borrow().clone()
    }

    /// Receiver that always holds the latest status
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status_rx.clone()
    }

    /// Receiver for every status change, in publication order
    pub fn subscribe_changes(&self) -> broadcast::Receiver<Status> {
        self.changes_tx.subscribe()
    }

    /// Whether the actor is still accepting commands
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Cancel all tasks and stop the actor
    pub async fn shutdown(&self) -> LifecycleResponse<()> {
        debug!("LifecycleHandle::shutdown: called");
        self.tx
            .send(LifecycleCommand::Shutdown)
            .await
            .map_err(|_| LifecycleError::ChannelClosed)
    }
}
