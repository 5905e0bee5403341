//! Event handling for the TUI.
//!
//! Converts raw terminal events (from crossterm) into `Action`s that
//! the `TuiApp` can process. This module is the bridge between the
//! physical keyboard and the application logic.
//!
//! # Key Bindings
//!
//! | Key            | Context            | Action                          |
//! |----------------|--------------------|---------------------------------|
//! | Ctrl+C         | Any                | Quit the TUI                    |
//! | F1 / F2        | Any                | Chat page / peer dashboard      |
//! | Tab            | Any                | Switch focus to next panel      |
//! | Ctrl+R         | Chat               | Regenerate the newest reply     |
//! | Ctrl+L         | Chat               | Start a new conversation        |
//! | Alt+1..4       | Chat               | Use a starter prompt            |
//! | Up / Down      | Messages           | Move the message cursor         |
//! | PageUp/PageDn  | Messages, input    | Scroll history                  |
//! | r              | Messages           | Regenerate the selected reply   |
//! | Enter          | Input              | Send message                    |
//! | Ctrl+U         | Input              | Clear the input                 |
//! | Backspace/Del  | Input              | Delete around the cursor        |
//! | Left/Right     | Input              | Move cursor                     |
//! | Home/End       | Input              | Jump to start/end               |
//! | Any char       | Input              | Type that character             |
//! | Up / k         | Peer list          | Select previous peer            |
//! | Down / j       | Peer list          | Select next peer                |
//! | Up/Down, PgUp  | Peer conversation  | Scroll the conversation         |
//! | r              | Dashboard          | Fetch peer conversations now    |
//! | Esc / q        | Not input          | Quit the TUI                    |
//!
//! Terminal focus changes map to [`Action::VisibilityChanged`].

use crate::app::{Action, FocusedPanel, TuiApp};
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use neuromesh_core::session::Page;
use ratatui::layout::Rect;

/// Converts a crossterm `Event` into an optional `Action`.
///
/// Returns `None` if the event doesn't map to any action (e.g. resize
/// events, key releases, or keys that aren't bound to anything).
pub fn handle_event(event: &Event, app: &TuiApp) -> Option<Action> {
    match event {
        Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
            handle_key_event(key_event, app)
        }
        Event::Mouse(mouse_event) => handle_mouse_event(mouse_event, app),
        Event::FocusGained => Some(Action::VisibilityChanged(true)),
        Event::FocusLost => Some(Action::VisibilityChanged(false)),
        _ => None,
    }
}

/// Converts a key event into an action based on the page and focus.
fn handle_key_event(key: &KeyEvent, app: &TuiApp) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global bindings
    match key.code {
        KeyCode::Char('c') if ctrl => return Some(Action::Quit),
        KeyCode::F(1) => return Some(Action::Navigate(Page::Chat)),
        KeyCode::F(2) => return Some(Action::Navigate(Page::Peers)),
        KeyCode::Tab | KeyCode::BackTab => return Some(Action::NextFocus),
        _ => {}
    }

    if app.page() == Page::Chat {
        if let Some(action) = handle_chat_shortcut(key) {
            return Some(action);
        }
    }

    match app.focused {
        FocusedPanel::Messages => handle_messages_key(key),
        FocusedPanel::Input => handle_input_key(key),
        FocusedPanel::PeerList => handle_peer_list_key(key),
        FocusedPanel::PeerConversation => handle_peer_conversation_key(key),
    }
}

/// Chat-page bindings that work whichever chat panel has focus.
fn handle_chat_shortcut(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('r') => Some(Action::RegenerateLatest),
            KeyCode::Char('l') => Some(Action::ClearConversation),
            KeyCode::Char('u') => Some(Action::ClearInput),
            _ => None,
        };
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        if let KeyCode::Char(c @ '1'..='4') = key.code {
            return Some(Action::UseSuggestion(c as usize - '1' as usize));
        }
    }
    None
}

/// Key handling when the chat history is focused.
fn handle_messages_key(key: &KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::CursorUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::CursorDown),
        KeyCode::PageUp => Some(Action::ScrollUp),
        KeyCode::PageDown => Some(Action::ScrollDown),
        KeyCode::Char('r') => Some(Action::RegenerateSelected),
        KeyCode::Enter | KeyCode::Char('i') => Some(Action::FocusPanel(FocusedPanel::Input)),
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    }
}

/// Key handling when the text input is focused.
///
/// In input mode, most keys produce text input rather than navigation.
fn handle_input_key(key: &KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::SendMessage),
        KeyCode::Backspace => Some(Action::InputBackspace),
        KeyCode::Delete => Some(Action::InputDelete),
        KeyCode::Left => Some(Action::InputLeft),
        KeyCode::Right => Some(Action::InputRight),
        KeyCode::Home => Some(Action::InputHome),
        KeyCode::End => Some(Action::InputEnd),
        KeyCode::PageUp => Some(Action::ScrollUp),
        KeyCode::PageDown => Some(Action::ScrollDown),
        KeyCode::Esc => Some(Action::FocusPanel(FocusedPanel::Messages)),
        KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

/// Key handling when the dashboard's peer list is focused.
fn handle_peer_list_key(key: &KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::PrevPeer),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::NextPeer),
        KeyCode::PageUp => Some(Action::ScrollUp),
        KeyCode::PageDown => Some(Action::ScrollDown),
        KeyCode::Char('r') => Some(Action::RetryPoll),
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    }
}

/// Key handling when the selected peer's conversation is focused.
fn handle_peer_conversation_key(key: &KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') | KeyCode::PageUp => Some(Action::ScrollUp),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::PageDown => Some(Action::ScrollDown),
        KeyCode::Char('r') => Some(Action::RetryPoll),
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    }
}

/// Converts a mouse event into an action using the saved panel rectangles.
///
/// Supports:
/// - Left click on a peer row → select that peer
/// - Left click on any other panel → focus it
/// - Scroll wheel over a history panel → scroll it
fn handle_mouse_event(mouse: &MouseEvent, app: &TuiApp) -> Option<Action> {
    let (col, row) = (mouse.column, mouse.row);
    let rects = &app.panel_rects;

    match app.page() {
        Page::Chat => match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if rect_contains(rects.messages, col, row) => {
                Some(Action::FocusPanel(FocusedPanel::Messages))
            }
            MouseEventKind::Down(MouseButton::Left) if rect_contains(rects.input, col, row) => {
                Some(Action::FocusPanel(FocusedPanel::Input))
            }
            MouseEventKind::ScrollUp if rect_contains(rects.messages, col, row) => {
                Some(Action::ScrollUp)
            }
            MouseEventKind::ScrollDown if rect_contains(rects.messages, col, row) => {
                Some(Action::ScrollDown)
            }
            _ => None,
        },
        Page::Peers => match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if rect_contains(rects.peers, col, row) => {
                // Minus one for the top border of the block.
                let inner_y = row.saturating_sub(rects.peers.y + 1) as usize;
                Some(Action::SelectPeer(rects.peer_list_offset + inner_y))
            }
            MouseEventKind::Down(MouseButton::Left)
                if rect_contains(rects.peer_conversation, col, row) =>
            {
                Some(Action::FocusPanel(FocusedPanel::PeerConversation))
            }
            MouseEventKind::ScrollUp if rect_contains(rects.peer_conversation, col, row) => {
                Some(Action::ScrollUp)
            }
            MouseEventKind::ScrollDown if rect_contains(rects.peer_conversation, col, row) => {
                Some(Action::ScrollDown)
            }
            _ => None,
        },
    }
}

/// Returns `true` if the given (column, row) is inside the rectangle.
fn rect_contains(rect: Rect, col: u16, row: u16) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}
