//! Application state machine.
//!
//! [`App`] is the view model of a chat session: the history, the status
//! line, the input buffer and the terminal size. It consumes
//! [`crate::AppEvent`]s and produces [`crate::AppAction`]s for the runtime.
//! It owns no synchronization logic; everything it shows arrives as a
//! [`DisplayEvent`].

use k9crypt_core::{Message, RoomId, UserId};

use crate::{AppAction, AppEvent, DisplayEvent, InputState, KeyInput, Status};

/// One entry of the chat history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryLine {
    /// A decrypted message.
    Message(Message),
    /// The locally rendered command list.
    Help,
}

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
#[derive(Debug, Clone)]
pub struct App {
    room_id: RoomId,
    sender_id: UserId,
    history: Vec<HistoryLine>,
    status: Option<Status>,
    input: InputState,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
}

impl App {
    /// Empty view for `room_id` as `sender_id`.
    pub fn new(room_id: RoomId, sender_id: UserId) -> Self {
        Self {
            room_id,
            sender_id,
            history: Vec::new(),
            status: None,
            input: InputState::default(),
            terminal_size: (80, 24),
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(KeyInput::Enter) => {
                let text = self.input.take();
                vec![AppAction::Submit(text), AppAction::Render]
            },
            AppEvent::Key(KeyInput::Esc) | AppEvent::Interrupt => vec![AppAction::Interrupt],
            AppEvent::Key(key) => {
                if self.input.apply(key) {
                    vec![AppAction::Render]
                } else {
                    vec![]
                }
            },
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::Display(event) => {
                self.apply_display(event);
                vec![AppAction::Render]
            },
        }
    }

    /// Fold one engine output into the view.
    pub fn apply_display(&mut self, event: DisplayEvent) {
        match event {
            DisplayEvent::MessageAppended(message) => {
                self.history.push(HistoryLine::Message(message));
            },
            DisplayEvent::StatusChanged(status) => self.status = Some(status),
            DisplayEvent::HistoryCleared => self.history.clear(),
            DisplayEvent::HelpShown => self.history.push(HistoryLine::Help),
        }
    }

    /// Room being displayed.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Local user.
    pub fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    /// Everything displayed so far, oldest first.
    pub fn history(&self) -> &[HistoryLine] {
        &self.history
    }

    /// Messages in the history, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.history.iter().filter_map(|line| match line {
            HistoryLine::Message(message) => Some(message),
            HistoryLine::Help => None,
        })
    }

    /// Current status line. `None` before anything happened.
    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// The line being edited.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }
}
