//! Cancellable task primitives
//!
//! A task body is a boxed future that receives a [`TaskContext`]. The body is
//! wrapped by [`spawn_task`], which races it against its cancellation token and
//! holds a [`SlotGuard`] so the owning slot hears about every exit path:
//! completion, failure, cancellation, abort or panic.

mod context;
mod guard;
mod outcome;
mod runner;
pub mod work;

pub use context::{TaskContext, TaskEvent};
pub use guard::SlotGuard;
pub use outcome::{TaskError, TaskOutcome};
pub use runner::{EffectWork, TaskFuture, TaskWork, spawn_task};
