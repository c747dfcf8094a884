//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! drawing into a frame.

mod chat;
mod input;
mod status;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::App;

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    const HISTORY_MIN_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;
    const INPUT_HEIGHT: u16 = 3;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(HISTORY_MIN_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
        ])
        .split(frame.area());

    let [history_area, status_area, input_area] = chunks.as_ref() else {
        return;
    };

    chat::render(frame, app, *history_area);
    status::render(frame, app, *status_area);
    input::render(frame, app.input(), *input_area);
}
