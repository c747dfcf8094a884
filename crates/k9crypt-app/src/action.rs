//! Application side-effects and intents.
//!
//! [`AppAction`] is what the [`crate::App`] state machine asks the runtime
//! to do.

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// A line was entered. The text is raw; routing decides what it means.
    Submit(String),

    /// End the session without `/quit`.
    Interrupt,
}
