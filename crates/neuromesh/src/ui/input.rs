//! Text input panel (bottom of the chat page).
//!
//! ```text
//! +-- Ask NeuroMesh (Enter to send) ------------------+
//! | > How does neural networking work?|              |
//! +---------------------------------------------------+
//! ```
//!
//! Input stays editable while a reply is pending; only sending is held
//! back, and the title says so.

use crate::app::{FocusedPanel, TuiApp};
use crate::ui::panel;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

/// Renders the text input panel.
pub fn render(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let is_focused = app.focused == FocusedPanel::Input;

    let title = if app.session.conversation.is_typing() {
        " Waiting for NeuroMesh... "
    } else if is_focused {
        " Ask NeuroMesh (Enter to send) "
    } else {
        " Ask NeuroMesh... "
    };

    let display_text = if app.input.is_empty() && !is_focused {
        String::new()
    } else {
        format!("> {}", app.input)
    };

    let input_widget = Paragraph::new(display_text)
        .style(Style::default().fg(Color::White))
        .block(panel(title, is_focused));

    frame.render_widget(input_widget, area);

    // ratatui doesn't draw a cursor on its own; place the terminal's.
    if is_focused {
        // +1 for the border, +2 for the "> " prefix
        let offset = visual_cursor_offset(&app.input, app.input_cursor) as u16;
        let max_x = area.right().saturating_sub(2);
        let cursor_x = (area.x + 1 + 2 + offset).min(max_x);
        let cursor_y = area.y + 1;
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

/// Column of the cursor: the number of characters before the byte offset.
fn visual_cursor_offset(input: &str, byte_cursor: usize) -> usize {
    input[..byte_cursor].chars().count()
}
