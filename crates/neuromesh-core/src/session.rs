//! The application-state container shared by every view.
//!
//! `Session` owns the current page plus the two stores. Views receive it
//! by reference; all mutation goes through the stores' own methods or
//! `navigate`.

use crate::conversation::ConversationStore;
use crate::dashboard::PeerDashboard;

/// The two top-level screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Chat,
    Peers,
}

impl Page {
    pub fn title(&self) -> &'static str {
        match self {
            Page::Chat => "Neural Intelligence Chat",
            Page::Peers => "Neural Mesh Dashboard",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    page: Page,
    pub conversation: ConversationStore,
    pub dashboard: PeerDashboard,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session on the chat page.
    pub fn new() -> Self {
        Self::starting_on(Page::Chat)
    }

    pub fn starting_on(page: Page) -> Self {
        Self {
            page,
            conversation: ConversationStore::new(),
            dashboard: PeerDashboard::new(),
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Switches to `page`. Returns `true` if the page actually changed.
    pub fn navigate(&mut self, page: Page) -> bool {
        if self.page == page {
            return false;
        }
        self.page = page;
        true
    }

    /// Size of the peer map, for the navigation badge.
    pub fn peer_count(&self) -> usize {
        self.dashboard.peer_count()
    }

    /// Connectivity flag, for the Online/Offline badge.
    pub fn is_connected(&self) -> bool {
        self.conversation.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HostInfo, PeerConversation, PeerIp, PeerSnapshot};

    #[test]
    fn navigate_reports_change() {
        let mut session = Session::new();
        assert_eq!(session.page(), Page::Chat);
        assert!(!session.navigate(Page::Chat));
        assert!(session.navigate(Page::Peers));
        assert_eq!(session.page(), Page::Peers);
        assert!(session.navigate(Page::Chat));
    }

    #[test]
    fn peer_count_tracks_dashboard() {
        let mut session = Session::new();
        assert_eq!(session.peer_count(), 0);

        let mut snapshot = PeerSnapshot::new();
        for ip in ["10.0.0.2", "10.0.0.3"] {
            snapshot.insert(
                PeerIp::new(ip),
                PeerConversation {
                    host_info: HostInfo {
                        hostname: ip.to_string(),
                        is_llm_host: false,
                    },
                    messages: Vec::new(),
                },
            );
        }
        session.dashboard.apply_snapshot(snapshot);
        assert_eq!(session.peer_count(), 2);
    }

    #[test]
    fn connectivity_comes_from_conversation() {
        let mut session = Session::new();
        assert!(session.is_connected());
        let ticket = session.conversation.begin_send("hello").unwrap();
        session.conversation.complete(
            ticket,
            Err(crate::api::ApiError::Transport("down".to_string())),
        );
        assert!(!session.is_connected());
    }
}
