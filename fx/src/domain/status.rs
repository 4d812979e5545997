//! Published lifecycle status

use serde::{Deserialize, Serialize};

/// The single live status value observed by the UI layer
///
/// Overwritten, never queued: observers only ever see the most recent
/// progress or terminal event produced by a current slot occupant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "label", rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    Running(String),
    Completed(String),
    Cancelled(String),
    Failed(String),
}

impl Status {
    /// Label carried by the status, if any
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Running(l) | Self::Completed(l) | Self::Cancelled(l) | Self::Failed(l) => Some(l),
        }
    }

    /// True for Completed, Cancelled and Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Cancelled(_) | Self::Failed(_))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running(l) => write!(f, "running: {}", l),
            Self::Completed(l) => write!(f, "completed: {}", l),
            Self::Cancelled(l) => write!(f, "cancelled: {}", l),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}
