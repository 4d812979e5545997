//! Domain types for sidefx
//!
//! Value types shared by the lifecycle manager, the remote-call boundary and
//! the periodic scheduler. Nothing in here spawns tasks or performs I/O.

mod periodic;
mod post;
mod status;
mod task;

pub use periodic::{
    DEFAULT_JOB_NAME, ExistingPeriodicPolicy, MAX_INTERVAL_MINUTES, PeriodicJobSpec, interval_from_minutes,
};
pub use post::{MISSING_ID, PostRequest, PostResponse, PostResult, PostState};
pub use status::Status;
pub use task::{TaskId, TaskSlot, TaskState};
