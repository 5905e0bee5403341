//! The local conversation and its send/regenerate/clear protocol.
//!
//! `ConversationStore` is the only owner of the chat log. It enforces:
//!
//! - at most one chat request in flight (the "typing" flag);
//! - the log only grows, except for regenerate, which overwrites one
//!   assistant entry that directly follows the user entry it answers;
//! - a reply that arrives after `clear()` is dropped instead of repopulating
//!   the fresh conversation.
//!
//! # Two ways to drive it
//!
//! The async [`ConversationStore::send`] and [`ConversationStore::regenerate`]
//! hold `&mut self` across the request and are convenient for one-shot use.
//! An event loop that must keep handling input while the request runs uses
//! the split form instead:
//!
//! ```text
//! let ticket = store.begin_send(text)?;        // appends the user entry
//! ... spawn api.send_chat(ticket.prompt()) ...
//! store.complete(ticket, result);              // appends/replaces the reply
//! ```

use crate::api::{ApiError, MeshApi};
use crate::types::{ChatMessage, Role};
use tracing::{debug, warn};

/// Text substituted for the assistant reply when a chat request fails.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error while processing your request.";

/// Where the reply to a ticket lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatTarget {
    /// A new assistant entry at the end of the log.
    Append,
    /// Overwrite the assistant entry at this index.
    Replace(usize),
}

/// A chat request issued by the store and not yet answered.
///
/// Produced by `begin_send`/`begin_regenerate` and handed back to
/// `complete` together with the backend's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTicket {
    generation: u64,
    target: ChatTarget,
    prompt: String,
}

impl ChatTicket {
    /// The text to send to the backend.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn target(&self) -> ChatTarget {
        self.target
    }
}

/// A ticket paired with what the backend answered.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub ticket: ChatTicket,
    pub result: Result<String, ApiError>,
}

/// What `complete` did with a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    /// The reply was appended as a new assistant entry.
    Appended,
    /// The assistant entry at this index was overwritten.
    Replaced(usize),
    /// The send failed; the fallback reply was appended.
    Fallback,
    /// The regenerate failed; the log was left as it was.
    Unchanged,
    /// The conversation was cleared while the request was in flight.
    Stale,
}

/// In-memory log of the local chat session.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    messages: Vec<ChatMessage>,
    typing: bool,
    connected: bool,
    /// Bumped by `clear()`; tickets from older generations are stale.
    generation: u64,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    /// Creates an empty conversation. Connectivity starts out optimistic.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            typing: false,
            connected: true,
            generation: 0,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a chat request is in flight.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Whether the last chat request reached the backend successfully.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Index of the newest assistant entry, if any.
    pub fn last_assistant_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
    }

    /// Whether `regenerate(index)` would issue a request right now.
    pub fn can_regenerate(&self, index: usize) -> bool {
        if self.typing || index == 0 {
            return false;
        }
        match (self.messages.get(index - 1), self.messages.get(index)) {
            (Some(prev), Some(current)) => {
                prev.role == Role::User && current.role == Role::Assistant
            }
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Split protocol
    // -----------------------------------------------------------------------

    /// Starts a send: appends the user entry and marks the store as typing.
    ///
    /// Returns `None` (and changes nothing) if `text` is blank or a request
    /// is already in flight.
    pub fn begin_send(&mut self, text: &str) -> Option<ChatTicket> {
        if text.trim().is_empty() {
            return None;
        }
        if self.typing {
            debug!("send ignored: a request is already in flight");
            return None;
        }

        self.messages.push(ChatMessage::user(text));
        self.typing = true;
        Some(ChatTicket {
            generation: self.generation,
            target: ChatTarget::Append,
            prompt: text.to_string(),
        })
    }

    /// Starts a regenerate of the assistant entry at `index`.
    ///
    /// Returns `None` unless `index >= 1`, no request is in flight, the
    /// entry at `index - 1` is a user entry and the entry at `index` is an
    /// assistant entry.
    pub fn begin_regenerate(&mut self, index: usize) -> Option<ChatTicket> {
        if !self.can_regenerate(index) {
            return None;
        }

        let prompt = self.messages[index - 1].content.clone();
        self.typing = true;
        Some(ChatTicket {
            generation: self.generation,
            target: ChatTarget::Replace(index),
            prompt,
        })
    }

    /// Applies the backend's answer to a ticket.
    ///
    /// Typing is always cleared and connectivity always reflects the result,
    /// stale replies included.
    pub fn complete(&mut self, ticket: ChatTicket, result: Result<String, ApiError>) -> ChatOutcome {
        self.typing = false;
        self.connected = result.is_ok();

        if ticket.generation != self.generation {
            debug!(
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                "dropping reply to a cleared conversation"
            );
            return ChatOutcome::Stale;
        }

        match (ticket.target, result) {
            (ChatTarget::Append, Ok(content)) => {
                self.messages.push(ChatMessage::assistant(content));
                ChatOutcome::Appended
            }
            (ChatTarget::Append, Err(e)) => {
                warn!(error = %e, "chat request failed");
                self.messages.push(ChatMessage::assistant(FALLBACK_REPLY));
                ChatOutcome::Fallback
            }
            (ChatTarget::Replace(index), Ok(content)) => {
                match self.messages.get_mut(index) {
                    Some(slot) if slot.role == Role::Assistant => {
                        *slot = ChatMessage::assistant(content);
                        ChatOutcome::Replaced(index)
                    }
                    // Only reachable if the log shrank without a clear().
                    _ => ChatOutcome::Unchanged,
                }
            }
            (ChatTarget::Replace(index), Err(e)) => {
                warn!(error = %e, index, "regenerate request failed");
                ChatOutcome::Unchanged
            }
        }
    }

    /// Completes a ticket from a [`ChatReply`].
    pub fn apply_reply(&mut self, reply: ChatReply) -> ChatOutcome {
        self.complete(reply.ticket, reply.result)
    }

    /// Empties the conversation. Any reply still in flight becomes stale.
    ///
    /// Typing stays set: no new request can be issued until the outstanding
    /// one resolves.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.generation += 1;
    }

    // -----------------------------------------------------------------------
    // One-shot operations
    // -----------------------------------------------------------------------

    /// Sends `text` and waits for the reply.
    ///
    /// Returns `None` if the send was a no-op (blank text or busy).
    pub async fn send<A: MeshApi>(&mut self, api: &A, text: &str) -> Option<ChatOutcome> {
        let ticket = self.begin_send(text)?;
        let result = api.send_chat(ticket.prompt()).await;
        Some(self.complete(ticket, result))
    }

    /// Regenerates the assistant entry at `index` and waits for the reply.
    ///
    /// Returns `None` if the regenerate was not valid for `index`.
    pub async fn regenerate<A: MeshApi>(&mut self, api: &A, index: usize) -> Option<ChatOutcome> {
        let ticket = self.begin_regenerate(index)?;
        let result = api.send_chat(ticket.prompt()).await;
        Some(self.complete(ticket, result))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
