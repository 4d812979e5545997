//! Periodic scheduler boundary and its in-process implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::PeriodicConfig;
use super::job::{JobResult, PeriodicJob};
use crate::domain::{ExistingPeriodicPolicy, MAX_INTERVAL_MINUTES, interval_from_minutes};

/// Errors from scheduling requests
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Job name must not be empty")]
    EmptyName,

    #[error("Interval must be between one minute and {max} minutes", max = MAX_INTERVAL_MINUTES)]
    InvalidInterval,

    #[error("Scheduler has been shut down")]
    Shutdown,
}

/// Point-in-time view of one registered job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJobInfo {
    pub name: String,
    pub interval: Duration,
    pub runs: u64,
    pub successes: u64,
    pub failures: u64,
}

/// Runs uniquely named jobs on a fixed interval
#[async_trait]
pub trait PeriodicScheduler: Send + Sync {
    /// Ensure `job` runs every `interval_minutes` under `name`
    ///
    /// Repeating the call for an existing name follows `policy`; it never
    /// creates a second job under the same name.
    async fn enqueue_unique_periodic(
        &self,
        name: &str,
        interval_minutes: u64,
        policy: ExistingPeriodicPolicy,
        job: Arc<dyn PeriodicJob>,
    ) -> Result<(), SchedulerError>;

    /// Stop and forget the job registered under `name`
    async fn cancel_unique(&self, name: &str) -> bool;

    /// Registered jobs, sorted by name
    async fn jobs(&self) -> Vec<ScheduledJobInfo>;
}

/// Current definition of a job; replaced in place by the update policy
#[derive(Clone)]
struct JobDefinition {
    interval: Duration,
    job: Arc<dyn PeriodicJob>,
}

#[derive(Debug, Default)]
struct JobStats {
    runs: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl JobStats {
    fn record(&self, result: JobResult) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match result {
            JobResult::Success => self.successes.fetch_add(1, Ordering::SeqCst),
            JobResult::Failure => self.failures.fetch_add(1, Ordering::SeqCst),
        };
    }
}

struct JobEntry {
    definition_tx: watch::Sender<JobDefinition>,
    token: CancellationToken,
    stats: Arc<JobStats>,
}

/// In-process stand-in for an OS-level periodic scheduler
///
/// Each unique name gets one tokio task. The first run happens immediately;
/// later runs are spaced by the current interval, measured from the start of
/// the previous run. Intervals below the configured minimum are clamped up.
pub struct InProcessScheduler {
    min_interval_minutes: u64,
    jobs: Mutex<HashMap<String, JobEntry>>,
    root: CancellationToken,
}

impl InProcessScheduler {
    pub fn new(config: &PeriodicConfig) -> Self {
        debug!(?config, "InProcessScheduler::new: called");
        Self {
            min_interval_minutes: config.min_interval_minutes,
            jobs: Mutex::new(HashMap::new()),
            root: CancellationToken::new(),
        }
    }

    fn clamp(&self, name: &str, interval_minutes: u64) -> Result<Duration, SchedulerError> {
        let minutes = if interval_minutes < self.min_interval_minutes {
            warn!(
                %name,
                requested = interval_minutes,
                minimum = self.min_interval_minutes,
                "InProcessScheduler: interval below minimum, clamping"
            );
            self.min_interval_minutes
        } else {
            interval_minutes
        };
        if minutes == 0 {
            return Err(SchedulerError::InvalidInterval);
        }
        interval_from_minutes(minutes).ok_or(SchedulerError::InvalidInterval)
    }

    fn start(&self, name: &str, definition: JobDefinition) -> JobEntry {
        let (definition_tx, definition_rx) = watch::channel(definition);
        let token = self.root.child_token();
        let stats = Arc::new(JobStats::default());
        tokio::spawn(run_job(name.to_string(), definition_rx, token.clone(), stats.clone()));
        JobEntry {
            definition_tx,
            token,
            stats,
        }
    }

    /// Stop every job; later enqueues fail with [`SchedulerError::Shutdown`]
    pub async fn shutdown(&self) {
        info!("Shutting down InProcessScheduler");
        self.root.cancel();
        self.jobs.lock().await.clear();
    }
}

#[async_trait]
impl PeriodicScheduler for InProcessScheduler {
    async fn enqueue_unique_periodic(
        &self,
        name: &str,
        interval_minutes: u64,
        policy: ExistingPeriodicPolicy,
        job: Arc<dyn PeriodicJob>,
    ) -> Result<(), SchedulerError> {
        debug!(%name, interval_minutes, %policy, "InProcessScheduler::enqueue_unique_periodic: called");
        if name.is_empty() {
            return Err(SchedulerError::EmptyName);
        }
        if self.root.is_cancelled() {
            return Err(SchedulerError::Shutdown);
        }
        let definition = JobDefinition {
            interval: self.clamp(name, interval_minutes)?,
            job,
        };

        let mut jobs = self.jobs.lock().await;
        match (jobs.get(name), policy) {
            (Some(_), ExistingPeriodicPolicy::Keep) => {
                debug!(%name, "InProcessScheduler: job exists, keeping");
                return Ok(());
            }
            (Some(entry), ExistingPeriodicPolicy::Update) => {
                info!(%name, interval = ?definition.interval, "Periodic job updated");
                entry.definition_tx.send_replace(definition);
                return Ok(());
            }
            _ => {}
        }

        if let Some(old) = jobs.remove(name) {
            info!(%name, "Periodic job cancelled for re-enqueue");
            old.token.cancel();
        }
        info!(%name, interval = ?definition.interval, "Periodic job enqueued");
        let entry = self.start(name, definition);
        jobs.insert(name.to_string(), entry);
        Ok(())
    }

    async fn cancel_unique(&self, name: &str) -> bool {
        debug!(%name, "InProcessScheduler::cancel_unique: called");
        match self.jobs.lock().await.remove(name) {
            Some(entry) => {
                entry.token.cancel();
                info!(%name, "Periodic job cancelled");
                true
            }
            None => false,
        }
    }

    async fn jobs(&self) -> Vec<ScheduledJobInfo> {
        let jobs = self.jobs.lock().await;
        let mut infos: Vec<_> = jobs
            .iter()
            .map(|(name, entry)| ScheduledJobInfo {
                name: name.clone(),
                interval: entry.definition_tx.borrow().interval,
                runs: entry.stats.runs.load(Ordering::SeqCst),
                successes: entry.stats.successes.load(Ordering::SeqCst),
                failures: entry.stats.failures.load(Ordering::SeqCst),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

async fn run_job(
    name: String,
    mut definition_rx: watch::Receiver<JobDefinition>,
    token: CancellationToken,
    stats: Arc<JobStats>,
) {
    debug!(%name, "run_job: called");
    let mut next_run = Instant::now();
    let mut last_run: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            changed = definition_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let interval = definition_rx.borrow_and_update().interval;
                if let Some(last) = last_run {
                    match last.checked_add(interval) {
                        Some(next) => next_run = next,
                        None => {
                            warn!(%name, ?interval, "run_job: next run out of range, stopping");
                            break;
                        }
                    }
                }
                debug!(%name, ?interval, "run_job: definition replaced");
                continue;
            }
            _ = tokio::time::sleep_until(next_run) => {}
        }

        let definition = definition_rx.borrow_and_update().clone();
        let started = Instant::now();
        last_run = Some(started);
        debug!(%name, "run_job: running");

        // An update does not interrupt a run in flight; a cancel does
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = definition.job.run() => result,
        };
        stats.record(result);
        debug!(%name, ?result, "run_job: finished");

        let interval = definition_rx.borrow().interval;
        match started.checked_add(interval) {
            Some(next) => next_run = next,
            None => {
                warn!(%name, ?interval, "run_job: next run out of range, stopping");
                break;
            }
        }
    }
    debug!(%name, "run_job: stopped");
}
