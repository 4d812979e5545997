//! Periodic job configuration

use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_JOB_NAME;

/// Periodic job configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PeriodicConfig {
    /// Unique name the periodic post job is registered under
    pub job_name: String,

    /// Default interval between runs in minutes
    pub interval_minutes: u64,

    /// Shortest interval the in-process scheduler accepts
    pub min_interval_minutes: u64,
}

impl Default for PeriodicConfig {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            interval_minutes: 15,
            min_interval_minutes: 15,
        }
    }
}
