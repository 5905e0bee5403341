//! Peer dashboard body.
//!
//! ```text
//! Neural Mesh Dashboard   3 peers · 2 LLM hosts · 14 messages   ⟳
//! +-- Peers ---------+-- gpu-node (10.0.0.2) ---------------------+
//! | >> ● 10.0.0.2    | [2025-03-01 12:00:00] Question:            |
//! |    ○ 10.0.0.3    |   hi?                                      |
//! +------------------+--------------------------------------------+
//! ```
//!
//! When there is no data to show, the whole body is one centered panel:
//! loading, error (with a retry hint) or "no peers".

use crate::app::{FocusedPanel, TuiApp};
use crate::ui::{panel, peer_conversation, peer_list};
use neuromesh_core::dashboard::DashboardView;
use neuromesh_core::session::Page;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

/// Renders the dashboard page body and records its panel rectangles.
pub fn render(frame: &mut Frame, app: &mut TuiApp, area: Rect) {
    let dashboard = &app.session.dashboard;
    let banner = dashboard.error().is_some() && dashboard.view() == DashboardView::Peers;

    let mut constraints = vec![Constraint::Length(1)];
    if banner {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(3));

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);
    let body = rows[rows.len() - 1];

    render_header(frame, app, rows[0]);
    if banner {
        render_error_banner(frame, app, rows[1]);
    }

    match app.session.dashboard.view() {
        DashboardView::Peers => {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
                .split(body);
            app.panel_rects.peers = columns[0];
            app.panel_rects.peer_conversation = columns[1];
            app.panel_rects.peer_list_offset = peer_list::render(frame, app, columns[0]);
            let max = peer_conversation::render(frame, app, columns[1]);
            app.panel_rects.peer_max_scroll = max;
            app.peer_scroll = app.peer_scroll.min(max);
        }
        view => {
            app.panel_rects.peers = Rect::default();
            app.panel_rects.peer_conversation = body;
            app.panel_rects.peer_list_offset = 0;
            app.panel_rects.peer_max_scroll = 0;
            app.peer_scroll = 0;
            render_placeholder(frame, app, body, view);
        }
    }
}

/// Page title, network summary and a refresh marker.
fn render_header(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let dashboard = &app.session.dashboard;
    let stats = dashboard.stats();

    let mut spans = vec![
        Span::styled(
            format!(" {}   ", Page::Peers.title()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "{} peer{} · {} LLM host{} · {} message{}",
            stats.peer_count,
            plural(stats.peer_count),
            stats.llm_hosts,
            plural(stats.llm_hosts),
            stats.total_messages,
            plural(stats.total_messages),
        )),
    ];
    if dashboard.is_fetching() {
        spans.push(Span::styled("   ⟳ refreshing", Style::default().fg(Color::DarkGray)));
    }
    if !app.visible {
        spans.push(Span::styled(
            "   (paused while unfocused)",
            Style::default().fg(Color::DarkGray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// One-line notice that the newest poll failed while older data is shown.
fn render_error_banner(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let message = app.session.dashboard.error().unwrap_or_default();
    let banner = Paragraph::new(Line::from(vec![
        Span::styled(" ! ", Style::default().fg(Color::Black).bg(Color::Red)),
        Span::styled(format!(" {message} (r to retry)"), Style::default().fg(Color::Red)),
    ]));
    frame.render_widget(banner, area);
}

/// Centered panel for the loading, error and empty states.
fn render_placeholder(frame: &mut Frame, app: &TuiApp, area: Rect, view: DashboardView<'_>) {
    let (title, lines) = match view {
        DashboardView::Loading => (
            " Loading ",
            vec![Line::from(Span::styled(
                "Loading peer conversations...",
                Style::default().fg(Color::Gray),
            ))],
        ),
        DashboardView::Error(message) => (
            " Error ",
            vec![
                Line::from(Span::styled(message, Style::default().fg(Color::Red))),
                Line::from(""),
                Line::from(Span::styled(
                    "Press r to try again",
                    Style::default().fg(Color::Yellow),
                )),
            ],
        ),
        DashboardView::Empty | DashboardView::Peers => (
            " No peers ",
            vec![
                Line::from(Span::styled(
                    "No peer conversations are currently available.",
                    Style::default().fg(Color::Gray),
                )),
                Line::from(Span::styled(
                    "Make sure other nodes are online and connected to the network.",
                    Style::default().fg(Color::DarkGray),
                )),
            ],
        ),
    };

    let focused = app.focused == FocusedPanel::PeerConversation;
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(panel(title, focused));
    frame.render_widget(paragraph, area);
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use crate::app::{Action, TuiApp};
    use crate::poller::PollEvent;
    use crate::ui::test_util::render_to_string;
    use neuromesh_core::api::ApiError;
    use neuromesh_core::dashboard::{FetchKind, POLL_ERROR_MESSAGE};
    use neuromesh_core::session::Page;
    use neuromesh_core::types::{HostInfo, PeerConversation, PeerIp, PeerSnapshot};

    fn one_peer() -> PeerSnapshot {
        [(
            PeerIp::new("10.0.0.2"),
            PeerConversation {
                host_info: HostInfo {
                    hostname: "gpu-node".to_string(),
                    is_llm_host: true,
                },
                messages: Vec::new(),
            },
        )]
        .into_iter()
        .collect()
    }

    fn failure() -> PollEvent {
        PollEvent::Completed(Err(ApiError::Transport("refused".to_string())))
    }

    #[test]
    fn shows_loading_before_first_result() {
        let mut app = TuiApp::new(Page::Peers);
        app.handle_action(Action::Poll(PollEvent::Started(FetchKind::Initial)));
        let screen = render_to_string(&mut app, 100, 20);
        assert!(screen.contains("Loading peer conversations"));
    }

    #[test]
    fn shows_error_panel_without_data() {
        let mut app = TuiApp::new(Page::Peers);
        app.handle_action(Action::Poll(PollEvent::Started(FetchKind::Initial)));
        app.handle_action(Action::Poll(failure()));
        let screen = render_to_string(&mut app, 100, 20);
        assert!(screen.contains(POLL_ERROR_MESSAGE));
        assert!(screen.contains("Press r to try again"));
    }

    #[test]
    fn shows_empty_state() {
        let mut app = TuiApp::new(Page::Peers);
        app.handle_action(Action::Poll(PollEvent::Completed(Ok(PeerSnapshot::new()))));
        let screen = render_to_string(&mut app, 100, 20);
        assert!(screen.contains("No peer conversations are currently available."));
        assert!(screen.contains("0 peers · 0 LLM hosts · 0 messages"));
    }

    #[test]
    fn failure_with_data_shows_banner_and_peers() {
        let mut app = TuiApp::new(Page::Peers);
        app.handle_action(Action::Poll(PollEvent::Completed(Ok(one_peer()))));
        app.handle_action(Action::Poll(PollEvent::Started(FetchKind::Background)));
        app.handle_action(Action::Poll(failure()));

        let screen = render_to_string(&mut app, 120, 20);
        assert!(screen.contains("(r to retry)"));
        assert!(screen.contains("10.0.0.2"));
        assert!(screen.contains("1 peer · 1 LLM host · 0 messages"));
    }
}
