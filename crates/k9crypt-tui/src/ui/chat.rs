//! Message history
//!
//! Displays decrypted messages and locally rendered help blocks, newest at
//! the bottom.

use k9crypt_app::{App, Command, HELP_FOOTER, HistoryLine};
use k9crypt_core::Message;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

const BORDER_SIZE: u16 = 2;

/// Render the history area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(format!(" {} ", app.room_id()));

    let items: Vec<ListItem> = app
        .history()
        .iter()
        .flat_map(|line| match line {
            HistoryLine::Message(message) => vec![message_line(message)],
            HistoryLine::Help => help_lines(),
        })
        .map(ListItem::new)
        .collect();

    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let skip = items.len().saturating_sub(visible_height);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}

fn message_line(message: &Message) -> Line<'static> {
    let time = message.timestamp.local_time();

    if message.is_system() {
        let text = format!("[{time}] {}: {}", message.sender_id, message.plaintext);
        return Line::from(Span::styled(text, Style::default().fg(Color::Yellow)));
    }

    Line::from(vec![
        Span::styled(
            format!("[{time}] {}", message.sender_id),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(": {}", message.plaintext)),
    ])
}

fn help_lines() -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled("Available Commands:", Style::default().fg(Color::Green))),
    ];
    lines.extend(Command::ALL.iter().map(|command| {
        Line::from(vec![
            Span::styled(command.as_str(), Style::default().fg(Color::Cyan)),
            Span::raw(format!(" - {}", command.description())),
        ])
    }));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(HELP_FOOTER, Style::default().fg(Color::Blue))));
    lines
}
