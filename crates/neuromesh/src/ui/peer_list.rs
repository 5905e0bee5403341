//! Peer list panel (left side of the dashboard).
//!
//! ```text
//! +-- Peers (2) ---------+
//! | >> ● 10.0.0.2        |  <- selected, LLM host
//! |       gpu-node  4    |
//! |    ○ 10.0.0.3        |  <- regular peer
//! |       laptop    1    |
//! +----------------------+
//! ```

use crate::app::{FocusedPanel, TuiApp};
use crate::ui::panel;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState};
use ratatui::Frame;

/// Renders the peer list and returns the index of the first visible row.
pub fn render(frame: &mut Frame, app: &TuiApp, area: Rect) -> usize {
    let dashboard = &app.session.dashboard;
    let is_focused = app.focused == FocusedPanel::PeerList;
    let block = panel(format!(" Peers ({}) ", dashboard.peer_count()), is_focused);

    let items: Vec<ListItem> = dashboard
        .peers()
        .iter()
        .map(|(ip, peer)| {
            let (marker, marker_color) = if peer.host_info.is_llm_host {
                ("●", Color::Green)
            } else {
                ("○", Color::Gray)
            };
            let mut spans = vec![
                Span::styled(format!("{marker} "), Style::default().fg(marker_color)),
                Span::styled(ip.as_str(), Style::default().fg(Color::White)),
                Span::styled(
                    format!("  {}", peer.host_info.hostname),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if !peer.messages.is_empty() {
                spans.push(Span::styled(
                    format!(" ({})", peer.messages.len()),
                    Style::default().fg(Color::Yellow),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    // ratatui is immediate-mode: the state is rebuilt every frame.
    let mut list_state = ListState::default().with_selected(dashboard.selected_index());
    frame.render_stateful_widget(list, area, &mut list_state);
    list_state.offset()
}

#[cfg(test)]
mod tests {
    use crate::app::{Action, TuiApp};
    use crate::poller::PollEvent;
    use crate::ui::test_util::render_to_string;
    use neuromesh_core::session::Page;
    use neuromesh_core::types::{HostInfo, PeerConversation, PeerIp, PeerSnapshot};

    fn peers(count: usize) -> PeerSnapshot {
        (0..count)
            .map(|i| {
                (
                    PeerIp::new(format!("10.0.0.{:02}", i)),
                    PeerConversation {
                        host_info: HostInfo {
                            hostname: format!("node-{i}"),
                            is_llm_host: i == 0,
                        },
                        messages: Vec::new(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn lists_every_peer_and_marks_selection() {
        let mut app = TuiApp::new(Page::Peers);
        app.handle_action(Action::Poll(PollEvent::Completed(Ok(peers(3)))));
        app.handle_action(Action::NextPeer);

        let screen = render_to_string(&mut app, 120, 20);
        assert!(screen.contains("Peers (3)"));
        assert!(screen.contains("node-0"));
        assert!(screen.contains("node-2"));
        let selected_row = screen.lines().find(|l| l.contains(">>")).unwrap();
        assert!(selected_row.contains("10.0.0.01"));
    }

    #[test]
    fn offset_follows_selection_past_visible_rows() {
        let mut app = TuiApp::new(Page::Peers);
        app.handle_action(Action::Poll(PollEvent::Completed(Ok(peers(30)))));
        for _ in 0..25 {
            app.handle_action(Action::NextPeer);
        }
        render_to_string(&mut app, 120, 20);
        assert!(app.panel_rects.peer_list_offset > 0);
    }
}
