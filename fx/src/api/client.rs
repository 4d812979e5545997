//! PostApi trait definition

use async_trait::async_trait;

use super::ApiError;
use crate::domain::{PostRequest, PostResult};

/// Single remote operation: create a post
///
/// Implementations are passed in explicitly (constructor injection); there
/// is no process-wide client.
#[async_trait]
pub trait PostApi: Send + Sync {
    async fn create_post(&self, request: PostRequest) -> Result<PostResult, ApiError>;
}
