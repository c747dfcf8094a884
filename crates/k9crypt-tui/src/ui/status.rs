//! Status line
//!
//! Single indicator for progress and recoverable errors.

use k9crypt_app::{App, StatusLevel};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
};

/// Render the status line.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let (text, color) = match app.status() {
        Some(status) => {
            let color = match status.level {
                StatusLevel::Info => Color::Yellow,
                StatusLevel::Error => Color::Red,
            };
            (format!(" {}", status.text), color)
        },
        None => (String::new(), Color::Yellow),
    };

    frame.render_widget(Paragraph::new(text).style(Style::default().fg(color)), area);
}
