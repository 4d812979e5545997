//! Periodic job that creates one post per run

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::job::{JobResult, PeriodicJob};
use crate::api::PostApi;
use crate::domain::PostRequest;

/// Creates a timestamped post every time it runs
///
/// Failures are reported, never retried here.
pub struct PeriodicPostJob {
    api: Arc<dyn PostApi>,
    user_id: i64,
}

impl PeriodicPostJob {
    pub fn new(api: Arc<dyn PostApi>, user_id: i64) -> Self {
        Self { api, user_id }
    }

    fn request(&self, now_ms: i64) -> PostRequest {
        PostRequest::new(
            format!("Periodic Post {}", now_ms),
            format!("This is a periodic post created at {}", now_ms),
            self.user_id,
        )
    }
}

#[async_trait]
impl PeriodicJob for PeriodicPostJob {
    async fn run(&self) -> JobResult {
        let request = self.request(Utc::now().timestamp_millis());
        debug!(title = %request.title, "PeriodicPostJob::run: called");
        match self.api.create_post(request).await {
            Ok(result) => {
                info!(id = result.id, "Periodic post created");
                JobResult::Success
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Periodic post failed");
                JobResult::Failure
            }
        }
    }
}
