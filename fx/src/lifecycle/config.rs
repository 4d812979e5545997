//! Lifecycle configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timings for the built-in effect and ad-hoc work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LifecycleConfig {
    /// Simulated effect-bound work duration in milliseconds
    pub effect_delay_ms: u64,

    /// Number of simulated ad-hoc steps
    pub ad_hoc_steps: u32,

    /// Duration of one ad-hoc step in milliseconds
    pub ad_hoc_step_ms: u64,

    /// How long a key change waits for the previous effect to acknowledge cancellation
    pub cancel_ack_timeout_ms: u64,

    /// Bound on queued lifecycle commands
    pub command_buffer: usize,

    /// Bound on buffered status changes per subscriber
    pub status_buffer: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            effect_delay_ms: 1000,
            ad_hoc_steps: 5,
            ad_hoc_step_ms: 300,
            cancel_ack_timeout_ms: 500,
            command_buffer: 64,
            status_buffer: 256,
        }
    }
}

impl LifecycleConfig {
    pub fn effect_delay(&self) -> Duration {
        Duration::from_millis(self.effect_delay_ms)
    }

    pub fn ad_hoc_step(&self) -> Duration {
        Duration::from_millis(self.ad_hoc_step_ms)
    }

    pub fn cancel_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.cancel_ack_timeout_ms)
    }
}
