//! App - the user-facing operations, wired together by constructor injection

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::PostApi;
use crate::config::Config;
use crate::domain::{PostRequest, PostState, Status, TaskId};
use crate::lifecycle::{LifecycleError, LifecycleHandle, TaskLifecycleManager, effect_work};
use crate::periodic::{PeriodicAdapter, PeriodicPostJob, PeriodicScheduler, ScheduledJobInfo, SchedulerError};
use crate::post::PostController;
use crate::task::TaskContext;
use crate::task::work::{AD_HOC_COMPLETED, multi_step, observe_key};

/// Key the effect task is bound to on startup
const INITIAL_TICK: u64 = 0;

/// The demo application: one effect task keyed on a tick counter, one ad-hoc
/// task slot, a one-shot post and a periodic post schedule
pub struct App {
    config: Config,
    lifecycle: LifecycleHandle<u64>,
    posts: PostController,
    scheduler: Arc<dyn PeriodicScheduler>,
    tick: Mutex<u64>,
}

impl App {
    /// Wire everything up and observe the initial tick
    pub async fn start(
        config: Config,
        api: Arc<dyn PostApi>,
        scheduler: Arc<dyn PeriodicScheduler>,
    ) -> Result<Self, LifecycleError> {
        debug!(?config, "App::start: called");
        let effect_delay = config.lifecycle.effect_delay();
        let lifecycle = TaskLifecycleManager::spawn(
            config.lifecycle.clone(),
            effect_work(move |key: u64, ctx| observe_key(key, ctx, effect_delay)),
        );

        let job = Arc::new(PeriodicPostJob::new(api.clone(), config.post.user_id));
        let adapter = PeriodicAdapter::new(scheduler.clone(), job);
        let posts = PostController::new(api, adapter, config.periodic.job_name.clone());

        lifecycle.on_key_changed(INITIAL_TICK).await?;
        info!("App started");

        Ok(Self {
            config,
            lifecycle,
            posts,
            scheduler,
            tick: Mutex::new(INITIAL_TICK),
        })
    }

    /// Bump the tick; the effect task restarts for the new value
    pub async fn trigger_key_change(&self) -> Result<u64, LifecycleError> {
        let mut tick = self.tick.lock().await;
        let next = *tick + 1;
        debug!(next, "App::trigger_key_change: called");
        self.lifecycle.on_key_changed(next).await?;
        *tick = next;
        Ok(next)
    }

    /// Start the multi-step ad-hoc work, superseding any running one
    pub async fn start_ad_hoc_work(&self) -> Result<TaskId, LifecycleError> {
        let steps = self.config.lifecycle.ad_hoc_steps;
        let step = self.config.lifecycle.ad_hoc_step();
        self.lifecycle
            .start_ad_hoc_task(AD_HOC_COMPLETED, Box::new(move |ctx: TaskContext| multi_step(ctx, steps, step)))
            .await
    }

    pub async fn cancel_ad_hoc_work(&self) -> Result<bool, LifecycleError> {
        self.lifecycle.cancel_ad_hoc_task().await
    }

    pub async fn cancel_effect_work(&self) -> Result<bool, LifecycleError> {
        self.lifecycle.cancel_effect_task().await
    }

    /// Create one post; `None` while a previous one is still loading
    pub fn create_once_post(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
        user_id: i64,
    ) -> Option<JoinHandle<PostState>> {
        self.posts.create_once(PostRequest::new(title, body, user_id))
    }

    /// Create one post from the configured defaults
    pub fn create_default_post(&self) -> Option<JoinHandle<PostState>> {
        let defaults = &self.config.post;
        self.create_once_post(defaults.title.clone(), defaults.body.clone(), defaults.user_id)
    }

    pub async fn schedule_periodic(&self, interval_minutes: u64) -> Result<(), SchedulerError> {
        self.posts.schedule_periodic(interval_minutes).await
    }

    pub async fn scheduled_jobs(&self) -> Vec<ScheduledJobInfo> {
        self.scheduler.jobs().await
    }

    pub async fn tick(&self) -> u64 {
        *self.tick.lock().await
    }

    pub fn status(&self) -> Status {
        self.lifecycle.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Status> {
        self.lifecycle.subscribe()
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<Status> {
        self.lifecycle.subscribe_changes()
    }

    pub fn post_state(&self) -> PostState {
        self.posts.state()
    }

    pub fn subscribe_post_state(&self) -> watch::Receiver<PostState> {
        self.posts.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cancel the effect and ad-hoc tasks and stop the lifecycle actor
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        info!("App shutting down");
        self.lifecycle.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::api::client::mock::MockPostApi;
    use crate::periodic::InProcessScheduler;

    async fn app() -> App {
        let config = Config::default();
        let scheduler = Arc::new(InProcessScheduler::new(&config.periodic));
        App::start(config, Arc::new(MockPostApi::new(vec![])), scheduler)
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_observes_initial_tick() {
        let app = app().await;
        assert_eq!(app.status(), Status::Running("effect tick=0".to_string()));

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(app.status(), Status::Completed("observed tick=0".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_ticks_only_last_completes() {
        let app = app().await;
        let mut changes = app.subscribe_changes();

        assert_eq!(app.trigger_key_change().await.unwrap(), 1);
        assert_eq!(app.trigger_key_change().await.unwrap(), 2);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let mut completed = Vec::new();
        while let Ok(status) = changes.try_recv() {
            if let Status::Completed(label) = status {
                completed.push(label);
            }
        }
        assert_eq!(completed, vec!["observed tick=2".to_string()]);
        assert_eq!(app.tick().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ad_hoc_work_runs_to_completion() {
        let app = app().await;
        tokio::time::sleep(Duration::from_millis(1001)).await;

        app.start_ad_hoc_work().await.unwrap();
        assert_eq!(app.status(), Status::Running("ad-hoc work".to_string()));
        tokio::time::sleep(Duration::from_millis(650)).await;
        assert_eq!(app.status(), Status::Running("working step 2/5".to_string()));
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(app.status(), Status::Completed("ad-hoc work".to_string()));

        assert!(!app.cancel_ad_hoc_work().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_post_and_schedule() {
        let app = app().await;

        let state = app.create_default_post().unwrap().await.unwrap();
        assert_eq!(state, PostState::Success { id: 101 });
        assert_eq!(app.post_state(), PostState::Success { id: 101 });

        app.schedule_periodic(15).await.unwrap();
        app.schedule_periodic(20).await.unwrap();
        let jobs = app.scheduled_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].interval, Duration::from_secs(20 * 60));
    }
}
