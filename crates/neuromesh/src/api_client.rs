//! HTTP client for the NeuroMesh backend.
//!
//! Implements [`MeshApi`] on top of `reqwest`. Every call is a single,
//! independent attempt: there is no retry or backoff here; the UI decides
//! when to try again.
//!
//! # Usage
//!
//! ```no_run
//! # async fn example() -> anyhow::Result<()> {
//! let config = neuromesh_core::config::AppConfig::default();
//! let client = ApiClient::new(&config)?;
//! let reply = client.send_chat("hello").await?;
//! # Ok(())
//! # }
//! ```

use neuromesh_core::api::{self, ApiError, ChatRequest, MeshApi};
use neuromesh_core::config::AppConfig;
use neuromesh_core::types::PeerSnapshot;
use reqwest::{Client, Response};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while constructing the client.
#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("could not build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Connection to the backend's `/app` REST endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    chat_url: String,
    peers_url: String,
}

impl ApiClient {
    /// Builds a client for the endpoints and timeout in `config`.
    pub fn new(config: &AppConfig) -> Result<Self, ApiClientError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            chat_url: config.chat_url(),
            peers_url: config.peers_url(),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub fn peers_url(&self) -> &str {
        &self.peers_url
    }
}

impl MeshApi for ApiClient {
    async fn send_chat(&self, message: &str) -> Result<String, ApiError> {
        debug!(url = %self.chat_url, len = message.len(), "sending chat message");
        let response = self
            .http
            .post(&self.chat_url)
            .json(&ChatRequest::new(message))
            .send()
            .await
            .map_err(transport_error)?;
        let body = success_body(response).await.inspect_err(|e| {
            warn!(url = %self.chat_url, error = %e, "chat request failed");
        })?;
        api::decode_chat_response(&body)
    }

    async fn peer_conversations(&self) -> Result<PeerSnapshot, ApiError> {
        debug!(url = %self.peers_url, "fetching peer conversations");
        let response = self
            .http
            .get(&self.peers_url)
            .send()
            .await
            .map_err(transport_error)?;
        let body = success_body(response).await.inspect_err(|e| {
            warn!(url = %self.peers_url, error = %e, "peer poll failed");
        })?;
        api::decode_peer_snapshot(&body)
    }
}

/// Reads the body of a 2xx response, or turns any other status into
/// `ApiError::Status`.
async fn success_body(response: Response) -> Result<String, ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Transport(format!("timed out: {e}"))
    } else {
        ApiError::Transport(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use neuromesh_core::types::PeerIp;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        let config = AppConfig {
            base_url: format!("{}/app", server.uri()),
            request_timeout_secs: 2,
            ..AppConfig::default()
        };
        ApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn chat_posts_message_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/app/chat"))
            .and(body_json(json!({ "message": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": "hi" })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).send_chat("hello").await.unwrap();
        assert_eq!(reply, "hi");
    }

    #[tokio::test]
    async fn chat_non_2xx_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/app/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("ollama unreachable"))
            .mount(&server)
            .await;

        let err = client_for(&server).send_chat("hello").await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 500,
                body: "ollama unreachable".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn chat_unexpected_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/app/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).send_chat("hello").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn chat_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/app/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "content": "late" }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).send_chat("hello").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        // Bind and immediately release a port so nothing is listening on it.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = AppConfig {
            base_url: format!("http://127.0.0.1:{port}/app"),
            request_timeout_secs: 2,
            ..AppConfig::default()
        };
        let err = ApiClient::new(&config)
            .unwrap()
            .send_chat("hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn peers_decodes_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app/peer-conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "10.0.0.2": {
                    "host_info": { "hostname": "gpu-node", "is_llm_host": true },
                    "messages": [
                        { "message_type": "Question", "content": "hi?", "timestamp": "2025-03-01T12:00:00Z" },
                        { "message_type": "Response", "content": "hello", "timestamp": "2025-03-01T12:00:02Z" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let snapshot = client_for(&server).peer_conversations().await.unwrap();
        let peer = &snapshot[&PeerIp::new("10.0.0.2")];
        assert_eq!(peer.host_info.hostname, "gpu-node");
        assert_eq!(peer.messages.len(), 2);
    }

    #[tokio::test]
    async fn peers_empty_object_is_empty_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app/peer-conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let snapshot = client_for(&server).peer_conversations().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn peers_server_error_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app/peer-conversations"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).peer_conversations().await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 503, .. }));
    }
}
