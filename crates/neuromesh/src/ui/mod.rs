//! UI rendering modules for the NeuroMesh TUI.
//!
//! Each module corresponds to a visual component:
//! - `layout`: navigation bar, page body, status bar
//! - `chat`: chat history with welcome screen and typing indicator
//! - `input`: bottom panel for text input
//! - `dashboard`: peer dashboard body (stats, loading/error/empty panels)
//! - `peer_list`: left panel of the dashboard
//! - `peer_conversation`: right panel of the dashboard

pub mod chat;
pub mod dashboard;
pub mod input;
pub mod layout;
pub mod peer_conversation;
pub mod peer_list;

use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders};

/// A bordered panel, highlighted when focused.
fn panel<'a>(title: impl Into<Line<'a>>, focused: bool) -> Block<'a> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Number of terminal rows `lines` occupy when wrapped to `width` columns.
///
/// Counts character wrapping only, so word wrapping may need a little more.
fn wrapped_height(lines: &[Line], width: u16) -> usize {
    let width = usize::from(width.max(1));
    lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum()
}

/// How far content can scroll before its first row reaches the top.
fn max_scroll(content_height: usize, view_height: u16) -> u16 {
    let max = content_height.saturating_sub(usize::from(view_height));
    u16::try_from(max).unwrap_or(u16::MAX)
}

/// Vertical scroll that shows the bottom of the content, moved up by
/// `lines_up`.
fn bottom_scroll(content_height: usize, view_height: u16, lines_up: u16) -> u16 {
    max_scroll(content_height, view_height).saturating_sub(lines_up)
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::app::TuiApp;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    /// Renders one frame of `app` and returns the screen as text rows.
    pub fn render_to_string(app: &mut TuiApp, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|frame| super::layout::render(frame, app))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_height_counts_long_lines() {
        let lines = vec![Line::from("abcdefghij"), Line::from(""), Line::from("abc")];
        assert_eq!(wrapped_height(&lines, 4), 3 + 1 + 1);
    }

    #[test]
    fn max_scroll_is_overflow_height() {
        assert_eq!(max_scroll(30, 10), 20);
        assert_eq!(max_scroll(5, 10), 0);
        assert_eq!(max_scroll(usize::MAX, 1), u16::MAX);
    }

    #[test]
    fn bottom_scroll_pins_to_newest() {
        assert_eq!(bottom_scroll(30, 10, 0), 20);
        assert_eq!(bottom_scroll(30, 10, 5), 15);
        assert_eq!(bottom_scroll(30, 10, 50), 0);
        assert_eq!(bottom_scroll(5, 10, 0), 0);
    }
}
