//! TUI application state management.
//!
//! `TuiApp` holds everything needed to render the terminal UI and process
//! user input. It follows the **Elm Architecture** pattern
//! (Model-View-Update):
//!
//! 1. **Model**: `TuiApp`, wrapping the core `Session`
//! 2. **Update**: `handle_action()` modifies state and may ask for an
//!    [`Effect`] (a network request, starting or stopping the poller)
//! 3. **View**: the `ui/` modules render the state to the terminal
//!
//! `handle_action` never performs I/O itself. The runner executes the
//! returned effect and feeds results back in as actions, which keeps this
//! module testable without a terminal or a backend.

use crate::poller::PollEvent;
use neuromesh_core::conversation::{ChatOutcome, ChatReply, ChatTarget, ChatTicket};
use neuromesh_core::dashboard::SnapshotChange;
use neuromesh_core::session::{Page, Session};
use ratatui::layout::Rect;
use tracing::debug;

/// Starter prompts offered on an empty chat.
pub const SUGGESTIONS: [&str; 4] = [
    "What is neural mesh AI?",
    "How does neural networking work?",
    "Explain machine learning",
    "Write a Python function",
];

/// Which panel currently has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPanel {
    /// Chat history. Up/Down moves the message cursor.
    Messages,
    /// The text input. Typing composes a message.
    Input,
    /// Dashboard peer list. Up/Down selects a peer.
    PeerList,
    /// Dashboard conversation of the selected peer. Up/Down scrolls.
    PeerConversation,
}

impl FocusedPanel {
    /// The panel that gets focus when `page` is shown.
    pub fn default_for(page: Page) -> Self {
        match page {
            Page::Chat => FocusedPanel::Input,
            Page::Peers => FocusedPanel::PeerList,
        }
    }
}

/// Screen areas of the last rendered frame, for mouse hit-testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelRects {
    pub messages: Rect,
    pub input: Rect,
    pub peers: Rect,
    pub peer_conversation: Rect,
    /// Index of the first peer row visible in the list.
    pub peer_list_offset: usize,
    /// Upper bound for `TuiApp::messages_scroll`.
    pub messages_max_scroll: u16,
    /// Upper bound for `TuiApp::peer_scroll`.
    pub peer_max_scroll: u16,
}

/// Actions that modify the application state.
///
/// These are produced by the event handler (user input) and by the runner
/// (network results), and consumed by the app.
#[derive(Debug)]
pub enum Action {
    /// User wants to quit the TUI.
    Quit,
    /// Switch to another page.
    Navigate(Page),
    /// Cycle focus between the panels of the current page.
    NextFocus,
    /// Give focus to a specific panel (mouse click).
    FocusPanel(FocusedPanel),
    /// Scroll the focused history up (older).
    ScrollUp,
    /// Scroll the focused history down (newer).
    ScrollDown,
    /// Move the chat message cursor to the previous message.
    CursorUp,
    /// Move the chat message cursor to the next message.
    CursorDown,
    /// Select the next peer in the list.
    NextPeer,
    /// Select the previous peer in the list.
    PrevPeer,
    /// Select the peer at a row of the list (mouse click).
    SelectPeer(usize),
    /// Insert a character at the cursor.
    InputChar(char),
    /// Delete the character before the cursor.
    InputBackspace,
    /// Delete the character after the cursor.
    InputDelete,
    InputLeft,
    InputRight,
    InputHome,
    InputEnd,
    /// Empty the input buffer.
    ClearInput,
    /// Put a starter prompt in the input buffer.
    UseSuggestion(usize),
    /// Send the input buffer as a chat message.
    SendMessage,
    /// Regenerate the assistant reply under the message cursor.
    RegenerateSelected,
    /// Regenerate the newest assistant reply.
    RegenerateLatest,
    /// Start a new, empty conversation.
    ClearConversation,
    /// Fetch peer conversations now.
    RetryPoll,
    /// The terminal window gained (`true`) or lost (`false`) focus.
    VisibilityChanged(bool),
    /// The backend answered a chat request.
    ChatReply(ChatReply),
    /// Progress from the peer poller.
    Poll(PollEvent),
}

/// Side effects requested by `handle_action`, carried out by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Issue this chat request.
    Chat(ChatTicket),
    /// The dashboard became active: start polling.
    StartPolling,
    /// The dashboard went away: stop polling.
    StopPolling,
    /// Fetch peer conversations immediately.
    RetryPoll,
    /// Propagate terminal focus to the poller.
    Visibility(bool),
}

/// The main TUI application state.
pub struct TuiApp {
    /// Page, conversation and dashboard.
    pub session: Session,
    /// The text input buffer (what the user is currently typing).
    pub input: String,
    /// Cursor position within the input string (byte offset).
    pub input_cursor: usize,
    /// Which panel currently has focus.
    pub focused: FocusedPanel,
    /// Chat history scroll, in lines up from the newest message.
    pub messages_scroll: u16,
    /// Message highlighted in the chat history, target of regenerate.
    pub message_cursor: Option<usize>,
    /// Peer conversation scroll, in lines up from the newest message.
    pub peer_scroll: u16,
    /// Whether the terminal window has focus.
    pub visible: bool,
    /// Status message shown in the bottom bar.
    pub status: String,
    /// Panel rectangles from the last frame.
    pub panel_rects: PanelRects,
    /// Whether the app should exit.
    pub should_quit: bool,
}

impl Default for TuiApp {
    fn default() -> Self {
        Self::new(Page::Chat)
    }
}

impl TuiApp {
    /// Creates a new TUI app showing `page`.
    pub fn new(page: Page) -> Self {
        Self {
            session: Session::starting_on(page),
            input: String::new(),
            input_cursor: 0,
            focused: FocusedPanel::default_for(page),
            messages_scroll: 0,
            message_cursor: None,
            peer_scroll: 0,
            visible: true,
            status: "Ready".to_string(),
            panel_rects: PanelRects::default(),
            should_quit: false,
        }
    }

    pub fn page(&self) -> Page {
        self.session.page()
    }

    /// Processes an action and updates the state accordingly.
    ///
    /// Returns the side effect the runner must perform, if any.
    pub fn handle_action(&mut self, action: Action) -> Option<Effect> {
        match action {
            Action::Quit => {
                self.should_quit = true;
                None
            }

            Action::Navigate(page) => self.navigate(page),

            Action::NextFocus => {
                self.focused = match self.focused {
                    FocusedPanel::Messages => FocusedPanel::Input,
                    FocusedPanel::Input => FocusedPanel::Messages,
                    FocusedPanel::PeerList => FocusedPanel::PeerConversation,
                    FocusedPanel::PeerConversation => FocusedPanel::PeerList,
                };
                None
            }

            Action::FocusPanel(panel) => {
                self.focused = panel;
                None
            }

            Action::ScrollUp => {
                // Bounded by the content height of the last frame.
                let rects = self.panel_rects;
                match self.page() {
                    Page::Chat => {
                        self.messages_scroll = self
                            .messages_scroll
                            .saturating_add(3)
                            .min(rects.messages_max_scroll);
                    }
                    Page::Peers => {
                        self.peer_scroll =
                            self.peer_scroll.saturating_add(3).min(rects.peer_max_scroll);
                    }
                }
                None
            }

            Action::ScrollDown => {
                match self.page() {
                    Page::Chat => self.messages_scroll = self.messages_scroll.saturating_sub(3),
                    Page::Peers => self.peer_scroll = self.peer_scroll.saturating_sub(3),
                }
                None
            }

            Action::CursorUp => {
                let len = self.session.conversation.len();
                if len > 0 {
                    self.message_cursor = Some(match self.message_cursor {
                        Some(idx) => idx.saturating_sub(1).min(len - 1),
                        None => len - 1,
                    });
                }
                None
            }

            Action::CursorDown => {
                let len = self.session.conversation.len();
                if len > 0 {
                    self.message_cursor = Some(match self.message_cursor {
                        Some(idx) => (idx + 1).min(len - 1),
                        None => len - 1,
                    });
                }
                None
            }

            Action::NextPeer => {
                self.session.dashboard.select_next();
                self.peer_scroll = 0;
                None
            }

            Action::PrevPeer => {
                self.session.dashboard.select_prev();
                self.peer_scroll = 0;
                None
            }

            Action::SelectPeer(row) => {
                if self.session.dashboard.select_index(row) {
                    self.peer_scroll = 0;
                }
                self.focused = FocusedPanel::PeerList;
                None
            }

            Action::InputChar(ch) => {
                self.input.insert(self.input_cursor, ch);
                self.input_cursor += ch.len_utf8();
                None
            }

            Action::InputBackspace => {
                if self.input_cursor > 0 {
                    let prev = self.prev_char_boundary();
                    self.input.drain(prev..self.input_cursor);
                    self.input_cursor = prev;
                }
                None
            }

            Action::InputDelete => {
                if self.input_cursor < self.input.len() {
                    let next = self.next_char_boundary();
                    self.input.drain(self.input_cursor..next);
                }
                None
            }

            Action::InputLeft => {
                self.input_cursor = self.prev_char_boundary();
                None
            }

            Action::InputRight => {
                self.input_cursor = self.next_char_boundary();
                None
            }

            Action::InputHome => {
                self.input_cursor = 0;
                None
            }

            Action::InputEnd => {
                self.input_cursor = self.input.len();
                None
            }

            Action::ClearInput => {
                self.take_input();
                None
            }

            Action::UseSuggestion(idx) => {
                if let Some(text) = SUGGESTIONS.get(idx) {
                    if self.session.conversation.is_empty() {
                        self.input = text.to_string();
                        self.input_cursor = self.input.len();
                        self.focused = FocusedPanel::Input;
                    }
                }
                None
            }

            Action::SendMessage => {
                let ticket = self.session.conversation.begin_send(&self.input)?;
                self.take_input();
                self.messages_scroll = 0;
                Some(self.issue_chat(ticket))
            }

            Action::RegenerateSelected => {
                let index = self.message_cursor?;
                self.regenerate(index)
            }

            Action::RegenerateLatest => {
                let index = self.session.conversation.last_assistant_index()?;
                self.regenerate(index)
            }

            Action::ClearConversation => {
                self.session.conversation.clear();
                self.message_cursor = None;
                self.messages_scroll = 0;
                self.status = "New conversation".to_string();
                None
            }

            Action::RetryPoll => {
                if self.page() == Page::Peers {
                    Some(Effect::RetryPoll)
                } else {
                    None
                }
            }

            Action::VisibilityChanged(visible) => {
                if self.visible == visible {
                    return None;
                }
                self.visible = visible;
                Some(Effect::Visibility(visible))
            }

            Action::ChatReply(reply) => {
                self.handle_chat_reply(reply);
                None
            }

            Action::Poll(event) => {
                self.handle_poll_event(event);
                None
            }
        }
    }

    fn navigate(&mut self, page: Page) -> Option<Effect> {
        if !self.session.navigate(page) {
            return None;
        }
        self.focused = FocusedPanel::default_for(page);
        match page {
            Page::Peers => Some(Effect::StartPolling),
            Page::Chat => {
                // The poller is about to be aborted mid-request.
                self.session.dashboard.abandon_fetch();
                Some(Effect::StopPolling)
            }
        }
    }

    fn regenerate(&mut self, index: usize) -> Option<Effect> {
        let ticket = self.session.conversation.begin_regenerate(index)?;
        self.message_cursor = Some(index);
        Some(self.issue_chat(ticket))
    }

    /// Shows what `ticket` is waiting for and hands it to the runner.
    fn issue_chat(&mut self, ticket: ChatTicket) -> Effect {
        self.status = match ticket.target() {
            ChatTarget::Append => "Thinking...".to_string(),
            ChatTarget::Replace(index) => format!("Regenerating message {}...", index + 1),
        };
        Effect::Chat(ticket)
    }

    fn handle_chat_reply(&mut self, reply: ChatReply) {
        let outcome = self.session.conversation.apply_reply(reply);
        debug!(?outcome, "chat reply applied");
        self.status = match outcome {
            ChatOutcome::Appended | ChatOutcome::Replaced(_) => "Ready".to_string(),
            ChatOutcome::Fallback | ChatOutcome::Unchanged => {
                "Request failed, backend unreachable".to_string()
            }
            ChatOutcome::Stale => "Discarded reply to a cleared conversation".to_string(),
        };
        if outcome == ChatOutcome::Appended {
            self.messages_scroll = 0;
        }
    }

    fn handle_poll_event(&mut self, event: PollEvent) {
        let dashboard = &mut self.session.dashboard;
        match event {
            PollEvent::Started(kind) => {
                dashboard.begin_fetch(kind);
            }
            PollEvent::Completed(Ok(snapshot)) => {
                let selected_before = dashboard.selected().cloned();
                if dashboard.apply_snapshot(snapshot) == SnapshotChange::Updated {
                    let n = dashboard.peer_count();
                    self.status = format!("{n} peer{}", if n == 1 { "" } else { "s" });
                    if dashboard.selected() != selected_before.as_ref() {
                        self.peer_scroll = 0;
                    }
                }
            }
            PollEvent::Completed(Err(e)) => {
                dashboard.apply_failure(&e.to_string());
                self.status = "Peer refresh failed (press r to retry)".to_string();
            }
        }
    }

    /// Takes the current input content and clears the input buffer.
    /// Returns the content that was in the buffer.
    pub fn take_input(&mut self) -> String {
        self.input_cursor = 0;
        std::mem::take(&mut self.input)
    }

    fn prev_char_boundary(&self) -> usize {
        self.input[..self.input_cursor]
            .char_indices()
            .next_back()
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    fn next_char_boundary(&self) -> usize {
        self.input[self.input_cursor..]
            .chars()
            .next()
            .map(|c| self.input_cursor + c.len_utf8())
            .unwrap_or(self.input_cursor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
