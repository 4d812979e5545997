//! Boundary between the application and the periodic scheduler

use std::sync::Arc;

use tracing::{debug, info};

use super::job::PeriodicJob;
use super::scheduler::{PeriodicScheduler, SchedulerError};
use crate::domain::PeriodicJobSpec;

/// Issues unique periodic schedules for one job body
///
/// Does not run the job itself. Scheduling the same name again replaces the
/// previous definition according to `spec.replace_policy`.
#[derive(Clone)]
pub struct PeriodicAdapter {
    scheduler: Arc<dyn PeriodicScheduler>,
    job: Arc<dyn PeriodicJob>,
}

impl PeriodicAdapter {
    pub fn new(scheduler: Arc<dyn PeriodicScheduler>, job: Arc<dyn PeriodicJob>) -> Self {
        Self { scheduler, job }
    }

    pub async fn schedule(&self, spec: PeriodicJobSpec) -> Result<(), SchedulerError> {
        debug!(?spec, "PeriodicAdapter::schedule: called");
        if spec.interval().is_none() {
            return Err(SchedulerError::InvalidInterval);
        }
        self.scheduler
            .enqueue_unique_periodic(&spec.name, spec.interval_minutes, spec.replace_policy, self.job.clone())
            .await?;
        info!(name = %spec.name, interval_minutes = spec.interval_minutes, "Periodic job scheduled");
        Ok(())
    }
}
