//! Task lifecycle management with the actor pattern
//!
//! [`TaskLifecycleManager`] owns the effect slot, the ad-hoc slot and the
//! published status. It runs as its own tokio task and is driven through the
//! cloneable [`LifecycleHandle`]; task bodies talk back to it with
//! [`TaskEvent`](crate::task::TaskEvent)s, never by touching slots.

mod config;
mod handle;
mod manager;
mod messages;

pub use config::LifecycleConfig;
pub use handle::LifecycleHandle;
pub use manager::{EffectKey, TaskLifecycleManager, effect_work};
pub use messages::{LifecycleCommand, LifecycleError, LifecycleSnapshot, SlotInfo};
