//! Built-in task bodies used by the demo application

use std::time::Duration;

use tracing::debug;

use super::{TaskContext, TaskFuture};

/// Label published when the ad-hoc work completes
pub const AD_HOC_COMPLETED: &str = "ad-hoc work";

/// Effect body: wait `delay`, then report the observed key
pub fn observe_key<K>(key: K, ctx: TaskContext, delay: Duration) -> TaskFuture
where
    K: std::fmt::Display + Send + 'static,
{
    Box::pin(async move {
        debug!(id = %ctx.id(), %key, ?delay, "observe_key: called");
        ctx.sleep(delay).await?;
        Ok(format!("observed tick={}", key))
    })
}

/// Ad-hoc body: `steps` simulated steps of `step_delay` each
pub fn multi_step(ctx: TaskContext, steps: u32, step_delay: Duration) -> TaskFuture {
    Box::pin(async move {
        debug!(id = %ctx.id(), steps, ?step_delay, "multi_step: called");
        for step in 1..=steps {
            ctx.sleep(step_delay).await?;
            ctx.progress(format!("working step {}/{}", step, steps));
        }
        Ok(AD_HOC_COMPLETED.to_string())
    })
}
