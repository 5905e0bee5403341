//! REST interface between this client and the NeuroMesh backend.
//!
//! The backend serves everything under an `/app` base URL. The client uses
//! exactly two calls:
//!
//! ```text
//! Client → Backend:  POST /app/chat               {"message":"hello"}
//! Backend → Client:  200                          {"content":"hi"}
//!
//! Client → Backend:  GET  /app/peer-conversations
//! Backend → Client:  200                          {"10.0.0.2":{"host_info":{...},"messages":[...]}}
//! ```
//!
//! This module owns the JSON shapes of those bodies and the [`MeshApi`]
//! trait that every backend implementation (HTTP in the binary, in-memory
//! fakes in tests) provides.

use crate::types::PeerSnapshot;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Errors surfaced by a [`MeshApi`] call.
///
/// The UI never distinguishes between these: any of them is a "send
/// failure" for chat and an error panel for the dashboard. They are kept
/// separate for logging.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("could not decode response body: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Body returned by `POST /chat`.
///
/// The backend may include extra fields (timestamp, sender); only `content`
/// matters to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Extracts the reply text from a `POST /chat` response body.
pub fn decode_chat_response(body: &str) -> Result<String, ApiError> {
    serde_json::from_str::<ChatResponse>(body)
        .map(|r| r.content)
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Decodes a peer-conversations response body.
///
/// An empty body or a JSON `null` means "no peers" and yields an empty
/// snapshot.
pub fn decode_peer_snapshot(body: &str) -> Result<PeerSnapshot, ApiError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(PeerSnapshot::new());
    }
    serde_json::from_str::<Option<PeerSnapshot>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|e| ApiError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// The two operations the client needs from the backend.
///
/// Futures are required to be `Send` so that callers can drive them from a
/// spawned tokio task while the UI loop keeps running.
pub trait MeshApi: Send + Sync + 'static {
    /// Sends `message` to the mesh LLM and returns the reply text.
    fn send_chat(&self, message: &str) -> impl Future<Output = Result<String, ApiError>> + Send;

    /// Fetches the current conversations of every known peer.
    fn peer_conversations(&self) -> impl Future<Output = Result<PeerSnapshot, ApiError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
