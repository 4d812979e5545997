//! TaskLifecycleManager - single owner of the effect and ad-hoc slots
//!
//! The manager is responsible for:
//! - Restarting the effect task on every key observation
//! - Superseding the ad-hoc task on every explicit start
//! - Cancelling either slot on request
//! - Publishing status, but only for the task currently occupying a slot

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::LifecycleConfig;
use super::handle::LifecycleHandle;
use super::messages::{LifecycleCommand, LifecycleSnapshot, SlotInfo};
use crate::domain::{Status, TaskId, TaskSlot, TaskState};
use crate::task::{EffectWork, TaskContext, TaskEvent, TaskFuture, TaskOutcome, TaskWork, spawn_task};

/// Bounds required of an effect key
pub trait EffectKey: Clone + PartialEq + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static {}

impl<T> EffectKey for T where T: Clone + PartialEq + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static {}

/// A task occupying a slot
struct ActiveTask {
    id: TaskId,
    label: String,
    state: TaskState,
    token: CancellationToken,
    join: Option<JoinHandle<TaskOutcome>>,
}

impl ActiveTask {
    fn transition(&mut self, next: TaskState) {
        if self.state.can_transition_to(next) {
            debug!(id = %self.id, from = %self.state, to = %next, "ActiveTask::transition");
            self.state = next;
        } else {
            warn!(id = %self.id, from = %self.state, to = %next, "ActiveTask::transition: illegal transition ignored");
        }
    }

    fn is_active(&self) -> bool {
        !self.state.is_terminal()
            && !self.token.is_cancelled()
            && self.join.as_ref().is_none_or(|join| !join.is_finished())
    }

    fn info(&self) -> SlotInfo {
        SlotInfo {
            id: self.id,
            label: self.label.clone(),
            state: self.state,
            cancel_requested: self.token.is_cancelled(),
        }
    }
}

/// Actor owning both task slots and the published status
pub struct TaskLifecycleManager<K> {
    config: LifecycleConfig,
    effect_work: EffectWork<K>,
    current_key: Option<K>,
    effect: Option<ActiveTask>,
    ad_hoc: Option<ActiveTask>,
    next_id: u64,
    root: CancellationToken,
    status_tx: watch::Sender<Status>,
    changes_tx: broadcast::Sender<Status>,
    events_tx: mpsc::UnboundedSender<TaskEvent>,
    events_rx: mpsc::UnboundedReceiver<TaskEvent>,
    commands_rx: mpsc::Receiver<LifecycleCommand<K>>,
}

impl<K: EffectKey> TaskLifecycleManager<K> {
    /// Spawn a new TaskLifecycleManager actor
    ///
    /// `effect_work` builds the effect body for each observed key. No effect
    /// task runs until the first key is observed.
    pub fn spawn(config: LifecycleConfig, effect_work: EffectWork<K>) -> LifecycleHandle<K> {
        debug!(?config, "TaskLifecycleManager::spawn: called");
        let (manager, handle) = Self::new(config, effect_work);
        tokio::spawn(manager.run());
        info!("TaskLifecycleManager spawned");
        handle
    }

    fn new(config: LifecycleConfig, effect_work: EffectWork<K>) -> (Self, LifecycleHandle<K>) {
        let (tx, commands_rx) = mpsc::channel(config.command_buffer.max(1));
        let (status_tx, status_rx) = watch::channel(Status::Idle);
        let (changes_tx, _) = broadcast::channel(config.status_buffer.max(1));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let handle = LifecycleHandle::new(tx, status_rx, changes_tx.clone());
        let manager = Self {
            config,
            effect_work,
            current_key: None,
            effect: None,
            ad_hoc: None,
            next_id: 0,
            root: CancellationToken::new(),
            status_tx,
            changes_tx,
            events_tx,
            events_rx,
            commands_rx,
        };
        (manager, handle)
    }

    async fn run(mut self) {
        debug!("TaskLifecycleManager::run: called");
        loop {
            tokio::select! {
                // Drain task reports before acting on the next command
                biased;
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                command = self.commands_rx.recv() => match command {
                    Some(LifecycleCommand::Shutdown) | None => {
                        debug!("TaskLifecycleManager::run: shutdown requested");
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                },
            }
        }
        self.shutdown().await;
        debug!("TaskLifecycleManager::run: complete");
    }

    async fn handle_command(&mut self, command: LifecycleCommand<K>) {
        debug!(?command, "TaskLifecycleManager::handle_command: called");
        match command {
            LifecycleCommand::KeyChanged { key, reply } => {
                let id = self.on_key_changed(key).await;
                let _ = reply.send(id);
            }
            LifecycleCommand::StartAdHoc { label, work, reply } => {
                let id = self.start_ad_hoc(label, work);
                let _ = reply.send(id);
            }
            LifecycleCommand::CancelAdHoc { reply } => {
                let _ = reply.send(self.cancel_slot(TaskSlot::AdHoc));
            }
            LifecycleCommand::CancelEffect { reply } => {
                let _ = reply.send(self.cancel_slot(TaskSlot::Effect));
            }
            LifecycleCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            LifecycleCommand::Shutdown => {}
        }
    }

    /// Cancel the current effect task, wait (bounded) for it to acknowledge,
    /// then start a new one bound to `key`
    ///
    /// Re-observing the same key still restarts the task.
    async fn on_key_changed(&mut self, key: K) -> TaskId {
        debug!(?key, previous = ?self.current_key, "on_key_changed: called");

        let pending = self.effect.as_mut().map(|previous| {
            previous.token.cancel();
            (previous.id, previous.join.take())
        });

        if let Some((id, Some(mut join))) = pending {
            debug!(%id, "on_key_changed: awaiting cancellation acknowledgment");
            match tokio::time::timeout(self.config.cancel_ack_timeout(), &mut join).await {
                Ok(Ok(outcome)) => self.finish(TaskSlot::Effect, id, outcome),
                Ok(Err(e)) => {
                    warn!(%id, error = %e, "on_key_changed: previous effect task panicked");
                    self.finish(TaskSlot::Effect, id, TaskOutcome::Failed(e.to_string()));
                }
                Err(_) => {
                    warn!(%id, "on_key_changed: previous effect did not acknowledge cancellation in time, aborting");
                    join.abort();
                }
            }
        }

        if let Some(stale) = self.effect.take() {
            debug!(id = %stale.id, "on_key_changed: superseding unacknowledged effect task");
        }

        self.current_key = Some(key.clone());
        let label = format!("effect tick={}", key);
        let work = self.effect_work.clone();
        let id = self.install(TaskSlot::Effect, label, move |ctx| work(key, ctx));
        info!(%id, "Effect task restarted");
        id
    }

    /// Cancel the current ad-hoc task without waiting, then start `work`
    fn start_ad_hoc(&mut self, label: String, work: TaskWork) -> TaskId {
        debug!(%label, "start_ad_hoc: called");
        if let Some(previous) = self.ad_hoc.take() {
            debug!(id = %previous.id, "start_ad_hoc: superseding previous ad-hoc task");
            previous.token.cancel();
        }
        let id = self.install(TaskSlot::AdHoc, label, work);
        info!(%id, "Ad-hoc task started");
        id
    }

    /// Request cancellation of the slot's task; no-op when nothing is active
    fn cancel_slot(&mut self, slot: TaskSlot) -> bool {
        match self.slot_ref(slot) {
            Some(task) if task.is_active() => {
                info!(id = %task.id, %slot, "Cancellation requested");
                task.token.cancel();
                true
            }
            Some(task) => {
                debug!(id = %task.id, %slot, "cancel_slot: task no longer active");
                false
            }
            None => {
                debug!(%slot, "cancel_slot: slot empty");
                false
            }
        }
    }

    fn install(&mut self, slot: TaskSlot, label: String, work: impl FnOnce(TaskContext) -> TaskFuture) -> TaskId {
        self.next_id += 1;
        let id = TaskId::new(self.next_id);
        let token = self.root.child_token();
        debug!(%id, %slot, %label, "install: called");

        let ctx = TaskContext::new(id, slot, token.clone(), self.events_tx.clone());
        let mut task = ActiveTask {
            id,
            label: label.clone(),
            state: TaskState::Pending,
            token: token.clone(),
            join: None,
        };
        task.join = Some(spawn_task(slot, id, token, self.events_tx.clone(), work(ctx)));
        task.transition(TaskState::Running);

        *self.slot_mut(slot) = Some(task);
        self.publish(Status::Running(label));
        id
    }

    fn handle_event(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Progress { slot, id, label } => {
                let current = self
                    .slot_ref(slot)
                    .is_some_and(|task| task.id == id && !task.token.is_cancelled());
                if current {
                    self.publish(Status::Running(label));
                } else {
                    debug!(%id, %slot, "handle_event: dropping progress from stale task");
                }
            }
            TaskEvent::Finished { slot, id, outcome } => self.finish(slot, id, outcome),
        }
    }

    /// Clear the slot and publish the outcome, if `id` still occupies it
    fn finish(&mut self, slot: TaskSlot, id: TaskId, outcome: TaskOutcome) {
        if !self.slot_ref(slot).is_some_and(|task| task.id == id) {
            debug!(%id, %slot, ?outcome, "finish: stale task, ignoring");
            return;
        }
        if let Some(mut task) = self.slot_mut(slot).take() {
            task.transition(outcome.state());
            let status = outcome.to_status(&task.label);
            info!(%id, %slot, state = %task.state, "Task finished");
            self.publish(status);
        }
    }

    fn publish(&self, status: Status) {
        debug!(%status, "publish: called");
        self.status_tx.send_replace(status.clone());
        // No subscribers is fine
        let _ = self.changes_tx.send(status);
    }

    fn snapshot(&self) -> LifecycleSnapshot<K> {
        LifecycleSnapshot {
            current_key: self.current_key.clone(),
            effect: self.effect.as_ref().map(ActiveTask::info),
            ad_hoc: self.ad_hoc.as_ref().map(ActiveTask::info),
            status: self.status_tx.borrow().clone(),
        }
    }

    fn slot_ref(&self, slot: TaskSlot) -> Option<&ActiveTask> {
        match slot {
            TaskSlot::Effect => self.effect.as_ref(),
            TaskSlot::AdHoc => self.ad_hoc.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: TaskSlot) -> &mut Option<ActiveTask> {
        match slot {
            TaskSlot::Effect => &mut self.effect,
            TaskSlot::AdHoc => &mut self.ad_hoc,
        }
    }

    /// Cancel everything and give tasks a bounded chance to acknowledge
    async fn shutdown(&mut self) {
        info!("Shutting down TaskLifecycleManager");
        self.root.cancel();

        for slot in [TaskSlot::Effect, TaskSlot::AdHoc] {
            let Some(mut task) = self.slot_mut(slot).take() else {
                continue;
            };
            let Some(mut join) = task.join.take() else {
                continue;
            };
            match tokio::time::timeout(self.config.cancel_ack_timeout(), &mut join).await {
                Ok(Ok(outcome)) => {
                    task.transition(outcome.state());
                    self.publish(outcome.to_status(&task.label));
                }
                Ok(Err(e)) => warn!(id = %task.id, error = %e, "shutdown: task panicked"),
                Err(_) => {
                    warn!(id = %task.id, "shutdown: task did not stop in time, aborting");
                    join.abort();
                }
            }
        }
        info!("TaskLifecycleManager shutdown complete");
    }
}

/// Convenience for building an [`EffectWork`] from a closure
pub fn effect_work<K, F>(f: F) -> EffectWork<K>
where
    F: Fn(K, TaskContext) -> TaskFuture + Send + Sync + 'static,
{
    std::sync::Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::api::ApiError;
    use crate::task::TaskError;
    use crate::task::work::{AD_HOC_COMPLETED, multi_step, observe_key};

    fn config() -> LifecycleConfig {
        LifecycleConfig::default()
    }

    fn observing() -> EffectWork<u64> {
        effect_work(|key, ctx| observe_key(key, ctx, Duration::from_millis(1000)))
    }

    fn five_steps() -> TaskWork {
        Box::new(|ctx: TaskContext| multi_step(ctx, 5, Duration::from_millis(300)))
    }

    fn drain(rx: &mut broadcast::Receiver<Status>) -> Vec<Status> {
        let mut seen = Vec::new();
        while let Ok(status) = rx.try_recv() {
            seen.push(status);
        }
        seen
    }

    fn completed(label: &str) -> Status {
        Status::Completed(label.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_key_completes_after_delay() {
        let handle = TaskLifecycleManager::spawn(config(), observing());
        assert_eq!(handle.status(), Status::Idle);

        handle.on_key_changed(0).await.unwrap();
        assert_eq!(handle.status(), Status::Running("effect tick=0".to_string()));

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(handle.status(), completed("observed tick=0"));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_key, Some(0));
        assert!(snapshot.effect.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_change_cancels_previous_effect() {
        let handle = TaskLifecycleManager::spawn(config(), observing());
        let mut changes = handle.subscribe_changes();

        handle.on_key_changed(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.on_key_changed(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1001)).await;

        assert_eq!(handle.status(), completed("observed tick=1"));
        assert_eq!(
            drain(&mut changes),
            vec![
                Status::Running("effect tick=0".to_string()),
                Status::Cancelled("effect tick=0".to_string()),
                Status::Running("effect tick=1".to_string()),
                completed("observed tick=1"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_restarts_effect() {
        let handle = TaskLifecycleManager::spawn(config(), observing());

        let first = handle.on_key_changed(5).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let second = handle.on_key_changed(5).await.unwrap();
        assert_ne!(first, second);

        // The restarted task needs its full delay again
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(handle.status(), Status::Running("effect tick=5".to_string()));
        tokio::time::sleep(Duration::from_millis(401)).await;
        assert_eq!(handle.status(), completed("observed tick=5"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_ad_hoc_start_supersedes_first() {
        let handle = TaskLifecycleManager::spawn(config(), observing());
        let mut changes = handle.subscribe_changes();

        let first = handle.start_ad_hoc_task("ad-hoc work", five_steps()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = handle.start_ad_hoc_task("ad-hoc work", five_steps()).await.unwrap();
        assert_ne!(first, second);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        let seen = drain(&mut changes);

        let completions = seen.iter().filter(|s| matches!(s, Status::Completed(_))).count();
        assert_eq!(completions, 1);
        assert!(!seen.iter().any(|s| matches!(s, Status::Cancelled(_))));
        assert_eq!(seen.last(), Some(&completed(AD_HOC_COMPLETED)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ad_hoc_without_task_is_noop() {
        let handle = TaskLifecycleManager::spawn(config(), observing());
        let mut changes = handle.subscribe_changes();

        assert!(!handle.cancel_ad_hoc_task().await.unwrap());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.status(), Status::Idle);
        assert!(drain(&mut changes).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ad_hoc_while_active() {
        let handle = TaskLifecycleManager::spawn(config(), observing());
        let mut changes = handle.subscribe_changes();

        handle.start_ad_hoc_task("ad-hoc work", five_steps()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert!(handle.cancel_ad_hoc_task().await.unwrap());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.status(), Status::Cancelled("ad-hoc work".to_string()));
        assert!(handle.snapshot().await.unwrap().ad_hoc.is_none());

        // Waiting out the original duration produces nothing further
        tokio::time::sleep(Duration::from_millis(2000)).await;
        let seen = drain(&mut changes);
        assert!(!seen.iter().any(|s| matches!(s, Status::Completed(_))));
        assert_eq!(seen.last(), Some(&Status::Cancelled("ad-hoc work".to_string())));

        // Slot is free again
        handle.start_ad_hoc_task("ad-hoc work", five_steps()).await.unwrap();
        assert_eq!(handle.status(), Status::Running("ad-hoc work".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_effect() {
        let handle = TaskLifecycleManager::spawn(config(), observing());

        handle.on_key_changed(3).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.cancel_effect_task().await.unwrap());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.status(), Status::Cancelled("effect tick=3".to_string()));
        assert!(!handle.cancel_effect_task().await.unwrap());

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(handle.status(), Status::Cancelled("effect tick=3".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_effect_failure_is_reported() {
        let work = effect_work(|_key: u64, _ctx| {
            Box::pin(async { Err::<String, _>(TaskError::Api(ApiError::Network("connection refused".to_string()))) })
        });
        let handle = TaskLifecycleManager::spawn(config(), work);

        handle.on_key_changed(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            handle.status(),
            Status::Failed("Network error: connection refused".to_string())
        );
        assert!(handle.snapshot().await.unwrap().effect.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reports_are_ignored() {
        let (mut manager, handle) = TaskLifecycleManager::new(config(), observing());

        let stale = manager.start_ad_hoc("ad-hoc work".to_string(), five_steps());
        let current = manager.start_ad_hoc("ad-hoc work".to_string(), five_steps());

        manager.handle_event(TaskEvent::Progress {
            slot: TaskSlot::AdHoc,
            id: stale,
            label: "working step 5/5".to_string(),
        });
        manager.handle_event(TaskEvent::Finished {
            slot: TaskSlot::AdHoc,
            id: stale,
            outcome: TaskOutcome::Completed(AD_HOC_COMPLETED.to_string()),
        });

        assert_eq!(handle.status(), Status::Running("ad-hoc work".to_string()));
        assert_eq!(manager.ad_hoc.as_ref().map(|t| t.id), Some(current));

        // A report for the wrong slot is stale too
        manager.handle_event(TaskEvent::Finished {
            slot: TaskSlot::Effect,
            id: current,
            outcome: TaskOutcome::Cancelled,
        });
        assert_eq!(manager.ad_hoc.as_ref().map(|t| t.id), Some(current));
    }

    /// Effect body that blocks its worker thread for key 0 and ignores cancellation
    fn blocking_first_key() -> EffectWork<u64> {
        effect_work(|key: u64, ctx: TaskContext| -> TaskFuture {
            if key == 0 {
                Box::pin(async move {
                    std::thread::sleep(Duration::from_millis(1500));
                    Ok::<_, TaskError>(format!("observed tick={}", key))
                })
            } else {
                observe_key(key, ctx, Duration::from_millis(100))
            }
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_key_change_does_not_wait_past_ack_timeout() {
        let handle = TaskLifecycleManager::spawn(config(), blocking_first_key());
        let mut changes = handle.subscribe_changes();

        handle.on_key_changed(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = std::time::Instant::now();
        handle.on_key_changed(1).await.unwrap();
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(450), "waited {:?}", waited);
        assert!(waited < Duration::from_millis(1200), "waited {:?}", waited);

        // Let the blocked body finish and the new key complete
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(handle.status(), completed("observed tick=1"));
        assert_eq!(
            drain(&mut changes),
            vec![
                Status::Running("effect tick=0".to_string()),
                Status::Running("effect tick=1".to_string()),
                completed("observed tick=1"),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shutdown_does_not_wait_past_ack_timeout() {
        let handle = TaskLifecycleManager::spawn(config(), blocking_first_key());
        let mut changes = handle.subscribe_changes();

        handle.on_key_changed(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = std::time::Instant::now();
        handle.shutdown().await.unwrap();
        while handle.is_running() {
            assert!(
                started.elapsed() < Duration::from_millis(1200),
                "actor still running after {:?}",
                started.elapsed()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(started.elapsed() >= Duration::from_millis(450));

        // The blocked body finishes after the actor is gone; nothing is published
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(drain(&mut changes), vec![Status::Running("effect tick=0".to_string())]);
        assert_eq!(handle.status(), Status::Running("effect tick=0".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_handle() {
        let handle = TaskLifecycleManager::spawn(config(), observing());
        handle.start_ad_hoc_task("ad-hoc work", five_steps()).await.unwrap();

        handle.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.status(), Status::Cancelled("ad-hoc work".to_string()));
        assert!(handle.snapshot().await.is_err());
    }
}
