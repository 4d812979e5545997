//! Post payloads and the one-shot post UI state

use serde::{Deserialize, Serialize};

/// Sentinel used when the server omits an id (or user id)
pub const MISSING_ID: i64 = -1;

/// Body sent to the create-post endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub title: String,
    pub body: String,
    pub user_id: i64,
}

impl PostRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>, user_id: i64) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            user_id,
        }
    }
}

/// Wire shape of the create-post response; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Fully resolved create-post result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResult {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub user_id: i64,
}

impl From<PostResponse> for PostResult {
    fn from(resp: PostResponse) -> Self {
        Self {
            id: resp.id.unwrap_or(MISSING_ID),
            title: resp.title.unwrap_or_default(),
            body: resp.body.unwrap_or_default(),
            user_id: resp.user_id.unwrap_or(MISSING_ID),
        }
    }
}

/// State of the one-shot post screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PostState {
    #[default]
    Idle,
    Loading,
    Success { id: i64 },
    Error { message: String },
}

impl PostState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

impl std::fmt::Display for PostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Ready to create a post"),
            Self::Loading => write!(f, "Creating post..."),
            Self::Success { id } => write!(f, "Post created successfully! ID: {}", id),
            Self::Error { message } => write!(f, "Error: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case() {
        let req = PostRequest::new("Test Post", "This is a test post body", 1);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"title": "Test Post", "body": "This is a test post body", "userId": 1})
        );
    }

    #[test]
    fn test_missing_id_maps_to_sentinel() {
        let resp: PostResponse = serde_json::from_str(r#"{"title": "t", "body": "b", "userId": 1}"#).unwrap();
        let result = PostResult::from(resp);
        assert_eq!(result.id, MISSING_ID);
        assert_eq!(result.title, "t");
        assert_eq!(result.user_id, 1);
    }

    #[test]
    fn test_empty_response_resolves_every_field() {
        let resp: PostResponse = serde_json::from_str("{}").unwrap();
        let result = PostResult::from(resp);
        assert_eq!(result.id, MISSING_ID);
        assert_eq!(result.title, "");
        assert_eq!(result.body, "");
        assert_eq!(result.user_id, MISSING_ID);
    }

    #[test]
    fn test_full_response() {
        let resp: PostResponse =
            serde_json::from_str(r#"{"id": 101, "title": "t", "body": "b", "userId": 1}"#).unwrap();
        assert_eq!(
            PostResult::from(resp),
            PostResult {
                id: 101,
                title: "t".to_string(),
                body: "b".to_string(),
                user_id: 1,
            }
        );
    }

    #[test]
    fn test_post_state_display() {
        assert_eq!(PostState::Idle.to_string(), "Ready to create a post");
        assert_eq!(PostState::Success { id: 101 }.to_string(), "Post created successfully! ID: 101");
        assert!(PostState::Loading.is_loading());
    }
}
