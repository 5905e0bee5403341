//! Conversation of the selected peer (right side of the dashboard).

use crate::app::{FocusedPanel, TuiApp};
use crate::ui::{bottom_scroll, max_scroll, panel, wrapped_height};
use neuromesh_core::types::MessageType;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

/// Renders the selected peer's messages and returns how far they can
/// scroll up.
pub fn render(frame: &mut Frame, app: &TuiApp, area: Rect) -> u16 {
    let dashboard = &app.session.dashboard;
    let is_focused = app.focused == FocusedPanel::PeerConversation;

    let (Some(ip), Some(peer)) = (dashboard.selected(), dashboard.selected_conversation()) else {
        let text = match dashboard.selected() {
            Some(ip) => format!("{ip} is no longer reported by the mesh."),
            None => "Select a peer to see its conversation.".to_string(),
        };
        let placeholder = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(panel(" Conversation ", is_focused));
        frame.render_widget(placeholder, area);
        return 0;
    };

    let role = if peer.host_info.is_llm_host {
        "LLM host"
    } else {
        "peer"
    };
    let title = format!(" {} ({ip}) · {role} ", peer.host_info.hostname);
    let block = panel(title, is_focused);

    if peer.messages.is_empty() {
        let empty = Paragraph::new("No messages exchanged yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return 0;
    }

    let mut lines: Vec<Line> = Vec::new();
    for msg in &peer.messages {
        let (label, color) = match msg.message_type {
            MessageType::Question => ("Question", Color::Cyan),
            MessageType::Response => ("Response", Color::Green),
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", msg.time_label()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!("{label}:"),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ]));
        for content_line in msg.content.lines() {
            lines.push(Line::from(Span::styled(
                format!("  {content_line}"),
                Style::default().fg(Color::White),
            )));
        }
        lines.push(Line::from(""));
    }

    let inner = block.inner(area);
    let content_height = wrapped_height(&lines, inner.width);
    let scroll = bottom_scroll(content_height, inner.height, app.peer_scroll);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
    max_scroll(content_height, inner.height)
}
