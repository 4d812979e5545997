//! sidefx - restart-on-change task lifecycle management
//!
//! Two task slots share one published [`Status`]:
//!
//! - **Effect slot**: bound to an observed key. Every key observation cancels
//!   the running effect task and starts a new one, so only the task for the
//!   latest key can complete.
//! - **Ad-hoc slot**: started explicitly. Each start supersedes the previous
//!   ad-hoc task; a superseded task never publishes anything.
//!
//! Slots are owned by a single actor ([`TaskLifecycleManager`]); a finishing
//! task only clears its slot, and only publishes, while it is still the
//! occupant.
//!
//! # Modules
//!
//! - [`domain`] - Status, task identity, post and periodic job types
//! - [`api`] - Remote create-post boundary and its HTTP implementation
//! - [`task`] - Cancellable task bodies and slot guards
//! - [`lifecycle`] - The lifecycle actor and its handle
//! - [`periodic`] - Periodic scheduler boundary and in-process scheduler
//! - [`post`] - One-shot post state and periodic post scheduling
//! - [`app`] - User-facing operations
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod lifecycle;
pub mod periodic;
pub mod post;
pub mod task;

// Re-export commonly used types
pub use api::{ApiError, HttpPostClient, PostApi};
pub use app::App;
pub use config::{ApiConfig, Config, PostDefaults};
pub use domain::{
    ExistingPeriodicPolicy, PeriodicJobSpec, PostRequest, PostResult, PostState, Status, TaskId, TaskSlot, TaskState,
};
pub use lifecycle::{LifecycleConfig, LifecycleError, LifecycleHandle, TaskLifecycleManager, effect_work};
pub use periodic::{
    InProcessScheduler, JobResult, PeriodicAdapter, PeriodicConfig, PeriodicJob, PeriodicPostJob, PeriodicScheduler,
    ScheduledJobInfo, SchedulerError,
};
pub use post::PostController;
pub use task::{TaskContext, TaskError, TaskOutcome, TaskWork};
