//! Periodic job specification

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Unique name under which the periodic post job is registered
pub const DEFAULT_JOB_NAME: &str = "periodic_post_work";

/// Longest accepted interval: one year
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Convert a minute count to a [`Duration`]
///
/// `None` above [`MAX_INTERVAL_MINUTES`].
pub fn interval_from_minutes(minutes: u64) -> Option<Duration> {
    if minutes > MAX_INTERVAL_MINUTES {
        return None;
    }
    minutes.checked_mul(60).map(Duration::from_secs)
}

/// What the scheduler does when a job with the same name already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExistingPeriodicPolicy {
    /// Leave the existing schedule untouched
    Keep,
    /// Replace the existing definition in place
    #[default]
    Update,
    /// Cancel the existing job, then enqueue the new one fresh
    CancelAndReenqueue,
}

impl std::fmt::Display for ExistingPeriodicPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keep => write!(f, "keep"),
            Self::Update => write!(f, "update"),
            Self::CancelAndReenqueue => write!(f, "cancel-and-reenqueue"),
        }
    }
}

/// Request to keep a uniquely named job running every N minutes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PeriodicJobSpec {
    pub name: String,
    pub interval_minutes: u64,
    #[serde(default)]
    pub replace_policy: ExistingPeriodicPolicy,
}

impl PeriodicJobSpec {
    /// Spec with the update-existing policy
    pub fn new(name: impl Into<String>, interval_minutes: u64) -> Self {
        Self {
            name: name.into(),
            interval_minutes,
            replace_policy: ExistingPeriodicPolicy::Update,
        }
    }

    /// Requested interval, or `None` when it is out of range
    pub fn interval(&self) -> Option<Duration> {
        interval_from_minutes(self.interval_minutes)
    }
}
