//! Driver trait for abstracting terminal I/O.
//!
//! The [`Driver`] trait decouples the session runtime from the terminal.
//! The production frontend reads crossterm events and draws with ratatui;
//! simulation injects events through a channel and records renders. The
//! same [`crate::Runtime`] runs on top of both.

use std::future::Future;

use crate::{App, AppEvent};

/// Abstracts user-facing I/O for the runtime.
///
/// # Implementations
///
/// - **TUI**: crossterm event stream, ratatui rendering
/// - **Simulation**: channel-fed events, captured renders
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next input event.
    ///
    /// Returns `None` once input is closed for good. Must be cancel-safe:
    /// the runtime drops the future whenever another event source wins.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Release terminal resources. Called once when the session ends.
    fn stop(&mut self);
}
