//! Periodic background work
//!
//! The [`PeriodicScheduler`] trait is the boundary to whatever runs jobs on a
//! schedule. [`InProcessScheduler`] implements it with one tokio task per
//! unique job name. [`PeriodicAdapter`] is the only thing the rest of the
//! crate talks to.

mod adapter;
mod config;
mod job;
mod post_job;
mod scheduler;

pub use adapter::PeriodicAdapter;
pub use config::PeriodicConfig;
pub use job::{JobResult, PeriodicJob};
pub use post_job::PeriodicPostJob;
pub use scheduler::{InProcessScheduler, PeriodicScheduler, ScheduledJobInfo, SchedulerError};
