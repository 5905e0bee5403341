//! Peer dashboard state: the last snapshot, the selected peer, and the
//! status of the current poll.
//!
//! Each poll cycle goes `idle → fetching → idle`. The scheduling itself
//! (timer, visibility check, cancellation) lives in the terminal client;
//! this module only decides what a fetch result does to the state.
//!
//! Successive snapshots are compared in their serialized form so that an
//! unchanged backend produces no visible change at all.

use crate::types::{PeerConversation, PeerIp, PeerSnapshot};
use tracing::{debug, warn};

/// Message shown in the error panel when a poll fails.
pub const POLL_ERROR_MESSAGE: &str = "Failed to load peer conversations. Please try again.";

/// Why a fetch is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// First fetch after the dashboard is shown. Blocks the view.
    Initial,
    /// Periodic refresh. Never blocks the view.
    Background,
    /// User pressed retry. Blocks the view while there's nothing to show.
    Manual,
}

/// Result of applying a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotChange {
    /// Identical to the previous snapshot; nothing was touched.
    Unchanged,
    /// The data was replaced.
    Updated,
}

/// What the dashboard body should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardView<'a> {
    /// Waiting for the first result.
    Loading,
    /// The last poll failed and there is no earlier data to fall back on.
    Error(&'a str),
    /// The backend reported no peers.
    Empty,
    /// Peer list and selected conversation.
    Peers,
}

/// Aggregate figures for the network summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub peer_count: usize,
    pub llm_hosts: usize,
    pub total_messages: usize,
}

#[derive(Debug, Clone)]
pub struct PeerDashboard {
    peers: PeerSnapshot,
    /// JSON of the last applied snapshot, for change detection.
    last_serialized: Option<String>,
    selected: Option<PeerIp>,
    loading: bool,
    fetching: bool,
    error: Option<String>,
}

impl Default for PeerDashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerDashboard {
    /// Creates a dashboard that has not fetched anything yet.
    pub fn new() -> Self {
        Self {
            peers: PeerSnapshot::new(),
            last_serialized: None,
            selected: None,
            loading: true,
            fetching: false,
            error: None,
        }
    }

    pub fn peers(&self) -> &PeerSnapshot {
        &self.peers
    }

    /// Peer keys in display order.
    pub fn peer_ips(&self) -> Vec<&PeerIp> {
        self.peers.keys().collect()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn selected(&self) -> Option<&PeerIp> {
        self.selected.as_ref()
    }

    /// Position of the selected peer in `peer_ips()`, if it is still present.
    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        self.peers.keys().position(|ip| ip == selected)
    }

    /// The selected peer's conversation, if that peer is in the snapshot.
    pub fn selected_conversation(&self) -> Option<&PeerConversation> {
        self.selected.as_ref().and_then(|ip| self.peers.get(ip))
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            peer_count: self.peers.len(),
            llm_hosts: self
                .peers
                .values()
                .filter(|p| p.host_info.is_llm_host)
                .count(),
            total_messages: self.peers.values().map(|p| p.messages.len()).sum(),
        }
    }

    pub fn view(&self) -> DashboardView<'_> {
        if !self.peers.is_empty() {
            return DashboardView::Peers;
        }
        if self.loading {
            DashboardView::Loading
        } else if let Some(error) = &self.error {
            DashboardView::Error(error)
        } else {
            DashboardView::Empty
        }
    }

    // -----------------------------------------------------------------------
    // Poll cycle
    // -----------------------------------------------------------------------

    /// Marks a fetch as started.
    ///
    /// Returns `false` (and changes nothing) if a fetch is already in flight.
    pub fn begin_fetch(&mut self, kind: FetchKind) -> bool {
        if self.fetching {
            debug!(?kind, "fetch skipped: another one is in flight");
            return false;
        }
        self.fetching = true;
        if kind != FetchKind::Background {
            self.loading = true;
        }
        true
    }

    /// Applies a successful poll result.
    pub fn apply_snapshot(&mut self, snapshot: PeerSnapshot) -> SnapshotChange {
        self.fetching = false;
        self.loading = false;
        self.error = None;

        let serialized = serde_json::to_string(&snapshot).ok();
        if serialized.is_some() && serialized == self.last_serialized {
            return SnapshotChange::Unchanged;
        }

        self.peers = snapshot;
        self.last_serialized = serialized;
        if self.selected.is_none() {
            self.selected = self.peers.keys().next().cloned();
        }
        debug!(peers = self.peers.len(), selected = ?self.selected, "peer snapshot updated");
        SnapshotChange::Updated
    }

    /// Records a failed poll. Data from earlier polls is kept.
    pub fn apply_failure(&mut self, cause: &str) {
        warn!(error = %cause, "loading peer conversations failed");
        self.fetching = false;
        self.loading = false;
        self.error = Some(POLL_ERROR_MESSAGE.to_string());
    }

    /// Forgets a fetch whose result will never arrive (the poller was
    /// stopped mid-request). Data, selection and error are kept.
    pub fn abandon_fetch(&mut self) {
        if self.fetching {
            debug!("in-flight fetch abandoned");
        }
        self.fetching = false;
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Selects `ip` if it is in the current snapshot.
    pub fn select(&mut self, ip: &PeerIp) -> bool {
        if !self.peers.contains_key(ip) {
            return false;
        }
        self.selected = Some(ip.clone());
        true
    }

    /// Selects the peer at `index` in display order.
    pub fn select_index(&mut self, index: usize) -> bool {
        match self.peers.keys().nth(index).cloned() {
            Some(ip) => {
                self.selected = Some(ip);
                true
            }
            None => false,
        }
    }

    /// Moves the selection one peer down, stopping at the last one.
    pub fn select_next(&mut self) {
        if self.peers.is_empty() {
            return;
        }
        let next = match self.selected_index() {
            Some(idx) => (idx + 1).min(self.peers.len() - 1),
            None => 0,
        };
        self.select_index(next);
    }

    /// Moves the selection one peer up, stopping at the first one.
    pub fn select_prev(&mut self) {
        if self.peers.is_empty() {
            return;
        }
        let prev = match self.selected_index() {
            Some(idx) => idx.saturating_sub(1),
            None => 0,
        };
        self.select_index(prev);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
