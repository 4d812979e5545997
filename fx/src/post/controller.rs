//! PostController - drives the one-shot post state and the periodic schedule

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::PostApi;
use crate::domain::{PeriodicJobSpec, PostRequest, PostState};
use crate::periodic::{PeriodicAdapter, SchedulerError};

const UNKNOWN_ERROR: &str = "Unknown error";

/// Owns the one-shot [`PostState`] and the periodic post schedule
pub struct PostController {
    api: Arc<dyn PostApi>,
    adapter: PeriodicAdapter,
    job_name: String,
    state_tx: Arc<watch::Sender<PostState>>,
}

impl PostController {
    pub fn new(api: Arc<dyn PostApi>, adapter: PeriodicAdapter, job_name: impl Into<String>) -> Self {
        let (state_tx, _) = watch::channel(PostState::Idle);
        Self {
            api,
            adapter,
            job_name: job_name.into(),
            state_tx: Arc::new(state_tx),
        }
    }

    /// Create one post in the background
    ///
    /// Returns `None` while a previous create is still loading. The returned
    /// handle resolves to the final state, which is also published.
    pub fn create_once(&self, request: PostRequest) -> Option<JoinHandle<PostState>> {
        debug!(title = %request.title, "PostController::create_once: called");
        let started = self.state_tx.send_if_modified(|state| {
            if state.is_loading() {
                false
            } else {
                *state = PostState::Loading;
                true
            }
        });
        if !started {
            debug!("PostController::create_once: already loading, ignoring");
            return None;
        }

        let api = self.api.clone();
        let state_tx = self.state_tx.clone();
        Some(tokio::spawn(async move {
            let state = match api.create_post(request).await {
                Ok(result) => {
                    info!(id = result.id, "Post created");
                    PostState::Success { id: result.id }
                }
                Err(e) => {
                    warn!(error = %e, "Post creation failed");
                    let message = e.to_string();
                    PostState::Error {
                        message: if message.is_empty() {
                            UNKNOWN_ERROR.to_string()
                        } else {
                            message
                        },
                    }
                }
            };
            state_tx.send_replace(state.clone());
            state
        }))
    }

    /// Register the periodic post job, replacing any previous schedule
    pub async fn schedule_periodic(&self, interval_minutes: u64) -> Result<(), SchedulerError> {
        debug!(interval_minutes, "PostController::schedule_periodic: called");
        self.adapter
            .schedule(PeriodicJobSpec::new(self.job_name.clone(), interval_minutes))
            .await
    }

    pub fn state(&self) -> PostState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PostState> {
        self.state_tx.subscribe()
    }
}
