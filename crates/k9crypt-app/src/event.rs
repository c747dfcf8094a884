//! Application input events.
//!
//! [`AppEvent`] is everything that drives the [`crate::App`] state machine.
//! Events come from two places: the driver (keys, resize, interrupt) and the
//! session engine, whose output reaches the view as [`DisplayEvent`]s.

use k9crypt_core::Message;

use crate::KeyInput;

/// Status while a debounced message is being sent.
pub const STATUS_SENDING: &str = "Sending message...";
/// Status after a successful send.
pub const STATUS_SENT: &str = "Message sent";
/// Status right after `/refresh`.
pub const STATUS_REFRESHING: &str = "Refreshing messages...";
/// Status once the refresh poll settled.
pub const STATUS_REFRESHED: &str = "Messages refreshed";

/// Severity of the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    /// Progress or confirmation.
    Info,
    /// A recoverable failure.
    Error,
}

/// The single status indicator below the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Text shown to the user.
    pub text: String,
    /// Severity, used for coloring.
    pub level: StatusLevel,
}

impl Status {
    /// Informational status.
    pub fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), level: StatusLevel::Info }
    }

    /// Error status.
    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), level: StatusLevel::Error }
    }
}

/// Ordered output of the session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// A decrypted message to show at the end of the history.
    MessageAppended(Message),
    /// The status line changed.
    StatusChanged(Status),
    /// History was wiped by `/refresh`.
    HistoryCleared,
    /// The `/help` block was printed.
    HelpShown,
}

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Ctrl-C, a termination signal, or anything else that ends the
    /// session without `/quit`.
    Interrupt,

    /// Output of the session engine.
    Display(DisplayEvent),
}
