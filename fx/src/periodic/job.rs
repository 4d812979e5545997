//! Periodic job contract

use async_trait::async_trait;

/// Outcome reported back to the scheduler after one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobResult {
    Success,
    Failure,
}

/// Body executed by a [`PeriodicScheduler`](super::PeriodicScheduler) on every tick
#[async_trait]
pub trait PeriodicJob: Send + Sync {
    async fn run(&self) -> JobResult;
}
