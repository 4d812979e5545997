//! reqwest-backed PostApi implementation

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{ApiError, PostApi};
use crate::config::ApiConfig;
use crate::domain::{PostRequest, PostResponse, PostResult};

/// JSON-over-HTTP client for the `posts` endpoint
pub struct HttpPostClient {
    base_url: String,
    http: Client,
}

impl HttpPostClient {
    /// Create a new client from configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        debug!(?config, "HttpPostClient::from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn posts_url(&self) -> String {
        format!("{}/posts", self.base_url)
    }
}

#[async_trait]
impl PostApi for HttpPostClient {
    async fn create_post(&self, request: PostRequest) -> Result<PostResult, ApiError> {
        let url = self.posts_url();
        debug!(%url, ?request, "HttpPostClient::create_post: --> POST");

        let response = self
            .http
            .post(url)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(%status, body = %text, "HttpPostClient::create_post: API error");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: PostResponse = response.json().await?;
        debug!(%status, ?parsed, "HttpPostClient::create_post: <-- response");
        Ok(parsed.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP exchange with a canned response, returning the raw request
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{}", addr), handle)
    }

    fn client_for(base_url: String) -> HttpPostClient {
        HttpPostClient::from_config(&ApiConfig {
            base_url,
            timeout_ms: 5_000,
        })
        .unwrap()
    }

    #[test]
    fn test_posts_url_trims_trailing_slash() {
        let client = client_for("https://jsonplaceholder.typicode.com/".to_string());
        assert_eq!(client.posts_url(), "https://jsonplaceholder.typicode.com/posts");
    }

    #[tokio::test]
    async fn test_create_post_success() {
        let (base, server) = serve_once(
            "201 Created",
            r#"{"id": 101, "title": "Test Post", "body": "b", "userId": 1}"#,
        )
        .await;
        let client = client_for(base);

        let result = client.create_post(PostRequest::new("Test Post", "b", 1)).await.unwrap();
        assert_eq!(result.id, 101);
        assert_eq!(result.user_id, 1);

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("POST /posts"));
        assert!(raw_request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(raw_request.contains(r#""title":"Test Post""#));
        assert!(raw_request.contains(r#""userId":1"#));
    }

    #[tokio::test]
    async fn test_create_post_missing_id() {
        let (base, _server) = serve_once("201 Created", r#"{"title": "t"}"#).await;
        let client = client_for(base);

        let result = client.create_post(PostRequest::new("t", "b", 1)).await.unwrap();
        assert_eq!(result.id, crate::domain::MISSING_ID);
    }

    #[tokio::test]
    async fn test_create_post_malformed_body_is_decode_error() {
        let (base, _server) = serve_once("200 OK", "<html>nope</html>").await;
        let client = client_for(base);

        let err = client.create_post(PostRequest::new("t", "b", 1)).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_create_post_server_error() {
        let (base, _server) = serve_once("500 Internal Server Error", r#"{"error": "boom"}"#).await;
        let client = client_for(base);

        let err = client.create_post(PostRequest::new("t", "b", 1)).await.unwrap_err();
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("boom"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_post_connection_refused_is_network_error() {
        // Bind then drop to obtain a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}", addr));
        let err = client.create_post(PostRequest::new("t", "b", 1)).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
