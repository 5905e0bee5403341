//! Chat history panel.
//!
//! An empty conversation shows a welcome text and the starter prompts.
//! Otherwise messages are listed oldest first, each with a header line
//! (time and author) followed by the content. The message under the cursor
//! is marked with `▶`, and a "thinking" line is appended while a request is
//! in flight.
//!
//! The view stays pinned to the newest message unless the user scrolls up.

use crate::app::{FocusedPanel, TuiApp, SUGGESTIONS};
use crate::ui::{bottom_scroll, max_scroll, panel, wrapped_height};
use neuromesh_core::types::Role;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

/// Renders the chat history panel and returns how far it can scroll up.
pub fn render(frame: &mut Frame, app: &TuiApp, area: Rect) -> u16 {
    let is_focused = app.focused == FocusedPanel::Messages;
    let title = format!(" {} ", app.page().title());
    let block = panel(title, is_focused);

    let conversation = &app.session.conversation;
    let mut lines = if conversation.is_empty() {
        welcome_lines()
    } else {
        message_lines(app)
    };

    if conversation.is_typing() {
        lines.push(Line::from(Span::styled(
            "NeuroMesh is thinking...",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let inner = block.inner(area);
    let content_height = wrapped_height(&lines, inner.width);
    let scroll = bottom_scroll(content_height, inner.height, app.messages_scroll);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(paragraph, area);
    max_scroll(content_height, inner.height)
}

fn welcome_lines() -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            "Welcome to NeuroMesh",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Ask anything. Your question is answered by the LLM hosts of the mesh.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(Span::styled("Try one of these:", Style::default().fg(Color::Gray))),
    ];
    for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  Alt+{}  ", i + 1),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw(*suggestion),
        ]));
    }
    lines
}

fn message_lines(app: &TuiApp) -> Vec<Line<'_>> {
    let conversation = &app.session.conversation;
    let mut lines = Vec::new();

    for (idx, msg) in conversation.messages().iter().enumerate() {
        let selected = app.message_cursor == Some(idx);
        let name_color = match msg.role {
            Role::User => Color::Cyan,
            Role::Assistant => Color::Green,
        };

        let mut header = vec![
            Span::styled(
                if selected { "▶ " } else { "  " },
                Style::default().fg(Color::Yellow),
            ),
            Span::styled(
                format!("[{}] ", msg.timestamp.format_local_time()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!("{}:", msg.role.label()),
                Style::default().fg(name_color).add_modifier(Modifier::BOLD),
            ),
        ];
        if selected && conversation.can_regenerate(idx) {
            header.push(Span::styled(
                "  (r to regenerate)",
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(header));

        let content_style = if selected {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        for content_line in msg.content.lines() {
            lines.push(Line::from(Span::styled(
                format!("    {content_line}"),
                content_style,
            )));
        }

        lines.push(Line::from(""));
    }

    lines
}
