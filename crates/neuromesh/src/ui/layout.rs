//! Main screen layout.
//!
//! ```text
//! NeuroMesh │ F1 Chat │ F2 Peers (2)                         ● Online
//! +-- Neural Intelligence Chat ----------------------------------+
//! | [10:30:12] You:                                              |
//! |   What is neural mesh AI?                                    |
//! | [10:30:15] NeuroMesh:                                        |
//! |   A network of cooperating model hosts...                    |
//! +--------------------------------------------------------------+
//! | > type a message...                                          |
//! +--------------------------------------------------------------+
//!  NeuroMesh v0.1.0 | Ready | Enter send · Ctrl+R regenerate
//! ```
//!
//! The body between the two bars depends on the current page.

use crate::app::TuiApp;
use crate::ui::{chat, dashboard, input};
use neuromesh_core::session::Page;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Tabs};
use ratatui::Frame;

/// Renders the complete TUI to the given frame.
///
/// This is the top-level render function called on every frame. It also
/// records panel rectangles for mouse hit-testing.
pub fn render(frame: &mut Frame, app: &mut TuiApp) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Navigation bar
            Constraint::Min(5),    // Page body
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_nav_bar(frame, app, vertical[0]);

    match app.page() {
        Page::Chat => {
            let body = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(3)])
                .split(vertical[1]);
            app.panel_rects.messages = body[0];
            app.panel_rects.input = body[1];
            let max = chat::render(frame, app, body[0]);
            app.panel_rects.messages_max_scroll = max;
            app.messages_scroll = app.messages_scroll.min(max);
            input::render(frame, app, body[1]);
        }
        Page::Peers => dashboard::render(frame, app, vertical[1]),
    }

    render_status_bar(frame, app, vertical[2]);
}

/// Brand, page tabs with the peer badge, and the connectivity indicator.
fn render_nav_bar(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let (connectivity, color) = if app.session.is_connected() {
        ("● Online ", Color::Green)
    } else {
        ("● Offline ", Color::Red)
    };
    let right_width = connectivity.chars().count() as u16;

    let split = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(11),
            Constraint::Min(10),
            Constraint::Length(right_width),
        ])
        .split(area);

    let brand = Paragraph::new(Span::styled(
        " NeuroMesh ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(brand, split[0]);

    let peer_count = app.session.peer_count();
    let peers_tab = if peer_count > 0 {
        Line::from(vec![
            Span::raw("F2 Peers "),
            Span::styled(
                format!("({peer_count})"),
                Style::default().fg(Color::Yellow),
            ),
        ])
    } else {
        Line::from("F2 Peers")
    };
    let selected = match app.page() {
        Page::Chat => 0,
        Page::Peers => 1,
    };
    let tabs = Tabs::new(vec![Line::from("F1 Chat"), peers_tab])
        .select(selected)
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .divider("│");
    frame.render_widget(tabs, split[1]);

    frame.render_widget(
        Paragraph::new(Span::styled(connectivity, Style::default().fg(color))),
        split[2],
    );
}

/// Renders the status bar at the bottom of the screen.
fn render_status_bar(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let hints = match app.page() {
        Page::Chat => "Enter send · Ctrl+R regenerate · Ctrl+L new chat · F2 peers",
        Page::Peers => "j/k select · r refresh · F1 chat",
    };

    let status_text = Line::from(vec![
        Span::styled(
            concat!(" NeuroMesh v", env!("CARGO_PKG_VERSION"), " "),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("| "),
        Span::raw(app.status.as_str()),
        Span::raw(" | "),
        Span::styled(hints, Style::default().fg(Color::Gray)),
    ]);

    let status_bar =
        Paragraph::new(status_text).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(status_bar, area);
}
