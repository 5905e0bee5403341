//! Domain types for NeuroMesh.
//!
//! Two families of types live here:
//!
//! - the **local conversation** (`Role`, `ChatMessage`), owned entirely by
//!   this client and never sent anywhere except as the text of a chat request;
//! - the **peer snapshot** (`PeerIp`, `HostInfo`, `PeerMessage`,
//!   `PeerConversation`), decoded from the backend and treated as read-only.
//!
//! Identifiers are **newtypes** so a peer IP can't be confused with arbitrary
//! message text, while still serializing as a plain JSON string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Timestamp: Unix milliseconds since epoch
// ---------------------------------------------------------------------------

/// A point in time represented as milliseconds since the Unix epoch.
///
/// Always serialized as an integer. Deserialization is more lenient because
/// peers report their message times in whatever shape their clock library
/// produced: integer or fractional milliseconds, RFC 3339 strings
/// (`"2025-01-31T10:30:00Z"`), or zone-less local times
/// (`"2025-01-31 10:30:00"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimestamp")]
pub struct Timestamp(i64);

/// Zone-less layouts accepted by [`Timestamp::parse`], tried in order.
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Errors that can occur when decoding a `Timestamp`.
#[derive(Debug, thiserror::Error)]
pub enum TimestampError {
    #[error("invalid timestamp '{value}': {source}")]
    Parse {
        value: String,
        source: chrono::ParseError,
    },

    #[error("timestamp {0} is not a representable number of milliseconds")]
    OutOfRange(f64),

    #[error("local time '{0}' does not exist in this time zone")]
    NonexistentLocal(String),
}

/// Every shape a timestamp may take on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl TryFrom<RawTimestamp> for Timestamp {
    type Error = TimestampError;

    fn try_from(raw: RawTimestamp) -> Result<Self, Self::Error> {
        match raw {
            RawTimestamp::Millis(millis) => Ok(Self(millis)),
            RawTimestamp::Fractional(millis) => Self::from_fractional_millis(millis),
            RawTimestamp::Text(text) => Self::parse(&text),
        }
    }
}

impl Timestamp {
    /// Creates a `Timestamp` from raw Unix milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current time as a `Timestamp`.
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    /// Truncates fractional milliseconds toward zero.
    pub fn from_fractional_millis(millis: f64) -> Result<Self, TimestampError> {
        if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
            return Err(TimestampError::OutOfRange(millis));
        }
        Ok(Self(millis.trunc() as i64))
    }

    /// Parses a timestamp string.
    ///
    /// Accepted, in order: integer milliseconds, RFC 3339, and
    /// `YYYY-MM-DD HH:MM:SS` (or with a `T` separator) read as local time.
    pub fn parse(text: &str) -> Result<Self, TimestampError> {
        let text = text.trim();
        if let Ok(millis) = text.parse::<i64>() {
            return Ok(Self(millis));
        }
        let rfc3339_error = match chrono::DateTime::parse_from_rfc3339(text) {
            Ok(dt) => return Ok(Self(dt.timestamp_millis())),
            Err(e) => e,
        };
        let naive = LOCAL_FORMATS
            .iter()
            .find_map(|format| chrono::NaiveDateTime::parse_from_str(text, format).ok())
            .ok_or_else(|| TimestampError::Parse {
                value: text.to_string(),
                source: rfc3339_error,
            })?;
        Self::from_local(naive, text)
    }

    fn from_local(naive: chrono::NaiveDateTime, text: &str) -> Result<Self, TimestampError> {
        use chrono::{Local, TimeZone};
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| Self(dt.timestamp_millis()))
            .ok_or_else(|| TimestampError::NonexistentLocal(text.to_string()))
    }

    /// Returns the raw milliseconds value.
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Formats this timestamp as a local time string like "10:30:45".
    ///
    /// Returns "??:??:??" if the value is out of chrono's range.
    pub fn format_local_time(&self) -> String {
        use chrono::{Local, TimeZone};
        match Local.timestamp_millis_opt(self.0) {
            chrono::LocalResult::Single(dt) => dt.format("%H:%M:%S").to_string(),
            _ => "??:??:??".to_string(),
        }
    }

    /// Formats this timestamp as a local date+time string like "2026-02-13 10:30:45".
    pub fn format_local_datetime(&self) -> String {
        use chrono::{Local, TimeZone};
        match Local.timestamp_millis_opt(self.0) {
            chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            _ => "????-??-?? ??:??:??".to_string(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_local_time())
    }
}

// ---------------------------------------------------------------------------
// Local conversation
// ---------------------------------------------------------------------------

/// Who authored a message in the local conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used by the chat view.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "NeuroMesh",
        }
    }
}

/// One entry of the local conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// When this entry was appended (or last regenerated).
    pub timestamp: Timestamp,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Timestamp::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Timestamp::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// PeerIp: the key of a peer snapshot
// ---------------------------------------------------------------------------

/// The IP address a peer is known by, exactly as the backend reports it.
///
/// Kept as a string rather than `std::net::IpAddr`: the backend is the
/// authority on these keys and we only ever echo them back for display.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIp(String);

impl PeerIp {
    pub fn new(ip: impl Into<String>) -> Self {
        Self(ip.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Peer conversations
// ---------------------------------------------------------------------------

/// What a peer says about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    /// Whether this peer can serve model inference.
    pub is_llm_host: bool,
}

/// Whether a peer message was a prompt or a model answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Question,
    Response,
}

/// A single entry in a peer's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMessage {
    pub message_type: MessageType,
    pub content: String,
    /// `None` when the peer sent no time, or one we can't read.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<Timestamp>,
}

impl PeerMessage {
    /// Local date and time of the message, or "unknown time".
    pub fn time_label(&self) -> String {
        self.timestamp
            .map(|ts| ts.format_local_datetime())
            .unwrap_or_else(|| "unknown time".to_string())
    }
}

/// Decodes a peer message time without ever failing the message.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match Timestamp::deserialize(&value) {
        Ok(ts) => Ok(Some(ts)),
        Err(error) => {
            tracing::debug!(%value, %error, "unreadable peer message timestamp");
            Ok(None)
        }
    }
}

/// Everything the dashboard knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConversation {
    pub host_info: HostInfo,
    #[serde(default)]
    pub messages: Vec<PeerMessage>,
}

/// A full poll result: every peer's conversation keyed by IP.
///
/// A `BTreeMap` keeps iteration (and therefore the peer list and the
/// serialized form used for change detection) in a stable, sorted order.
pub type PeerSnapshot = BTreeMap<PeerIp, PeerConversation>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
