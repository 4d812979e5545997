//! Lifecycle manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{Status, TaskId, TaskState};
use crate::task::TaskWork;

/// Errors from lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Lifecycle manager is not running")]
    ChannelClosed,
}

/// Response from lifecycle operations
pub type LifecycleResponse<T> = Result<T, LifecycleError>;

/// Commands sent to the TaskLifecycleManager actor
pub enum LifecycleCommand<K> {
    /// Restart the effect task for `key`
    KeyChanged { key: K, reply: oneshot::Sender<TaskId> },
    /// Supersede the ad-hoc task with `work`
    StartAdHoc {
        label: String,
        work: TaskWork,
        reply: oneshot::Sender<TaskId>,
    },
    /// Request cancellation of the ad-hoc task; replies whether one was active
    CancelAdHoc { reply: oneshot::Sender<bool> },
    /// Request cancellation of the effect task; replies whether one was active
    CancelEffect { reply: oneshot::Sender<bool> },
    Snapshot { reply: oneshot::Sender<LifecycleSnapshot<K>> },
    Shutdown,
}

impl<K: std::fmt::Debug> std::fmt::Debug for LifecycleCommand<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyChanged { key, .. } => f.debug_struct("KeyChanged").field("key", key).finish(),
            Self::StartAdHoc { label, .. } => f.debug_struct("StartAdHoc").field("label", label).finish(),
            Self::CancelAdHoc { .. } => write!(f, "CancelAdHoc"),
            Self::CancelEffect { .. } => write!(f, "CancelEffect"),
            Self::Snapshot { .. } => write!(f, "Snapshot"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Occupant of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub id: TaskId,
    pub label: String,
    pub state: TaskState,
    pub cancel_requested: bool,
}

/// Point-in-time view of the manager
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleSnapshot<K> {
    pub current_key: Option<K>,
    pub effect: Option<SlotInfo>,
    pub ad_hoc: Option<SlotInfo>,
    pub status: Status,
}
