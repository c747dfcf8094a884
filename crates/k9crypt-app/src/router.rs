//! Submission routing and debounce.
//!
//! Commands are dispatched as soon as they are submitted. Chat text waits for
//! a quiet window: each new submission replaces the pending one and restarts
//! the window, so a burst collapses into its last line. The router is pure;
//! the runtime reads [`InputRouter::deadline`] and calls
//! [`InputRouter::take_due`] when it passes.

use std::{ops::Add, time::Duration};

use crate::command::{Command, Submission, classify};

/// Result of routing one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Blank input, nothing happened.
    Ignored,
    /// A command to run now. A `/quit` also discards pending text.
    Command(Command),
    /// Text is pending until the debounce window closes.
    Queued,
}

#[derive(Debug, Clone)]
struct Pending<I> {
    text: String,
    deadline: I,
}

/// Classifies submissions and debounces outbound text.
#[derive(Debug, Clone)]
pub struct InputRouter<I> {
    window: Duration,
    pending: Option<Pending<I>>,
}

impl<I> InputRouter<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Router with the given debounce window.
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Route a raw submission made at `now`.
    pub fn submit(&mut self, raw: &str, now: I) -> Routed {
        match classify(raw) {
            Submission::Empty => Routed::Ignored,
            Submission::Command(command) => {
                if command == Command::Quit {
                    self.pending = None;
                }
                Routed::Command(command)
            },
            Submission::Message(text) => {
                if self.pending.is_some() {
                    tracing::debug!("debounce replaced pending message");
                }
                self.pending = Some(Pending { text, deadline: now + self.window });
                Routed::Queued
            },
        }
    }

    /// When pending text becomes due. `None` if nothing is pending.
    pub fn deadline(&self) -> Option<I> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    /// Pending text if its window has closed by `now`.
    pub fn take_due(&mut self, now: I) -> Option<String> {
        if self.pending.as_ref().is_some_and(|pending| pending.deadline <= now) {
            return self.pending.take().map(|pending| pending.text);
        }
        None
    }

    /// Drop pending text, returning it.
    pub fn discard(&mut self) -> Option<String> {
        self.pending.take().map(|pending| pending.text)
    }

    /// Text waiting for its window to close.
    pub fn pending_text(&self) -> Option<&str> {
        self.pending.as_ref().map(|pending| pending.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const WINDOW: Duration = Duration::from_millis(200);

    fn at(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn burst_collapses_to_last() {
        let mut router = InputRouter::new(WINDOW);
        assert_eq!(router.submit("a", at(0)), Routed::Queued);
        assert_eq!(router.submit("b", at(50)), Routed::Queued);
        assert_eq!(router.submit("c", at(100)), Routed::Queued);

        assert_eq!(router.take_due(at(250)), None);
        assert_eq!(router.deadline(), Some(at(300)));
        assert_eq!(router.take_due(at(300)), Some("c".into()));
        assert_eq!(router.take_due(at(1000)), None);
    }

    #[test]
    fn quit_discards_pending_text() {
        let mut router = InputRouter::new(WINDOW);
        router.submit("bye all", at(0));
        assert_eq!(router.submit("/quit", at(10)), Routed::Command(Command::Quit));
        assert_eq!(router.deadline(), None);
    }

    #[test]
    fn other_commands_keep_pending_text() {
        let mut router = InputRouter::new(WINDOW);
        router.submit("hello", at(0));
        assert_eq!(router.submit(" /help ", at(10)), Routed::Command(Command::Help));
        assert_eq!(router.pending_text(), Some("hello"));
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut router: InputRouter<Duration> = InputRouter::new(WINDOW);
        assert_eq!(router.submit("   ", at(0)), Routed::Ignored);
        assert_eq!(router.deadline(), None);
    }

    proptest! {
        /// Property: /quit never produces sendable text, whatever came before
        #[test]
        fn prop_quit_never_reaches_send(
            lines in prop::collection::vec(prop_oneof![
                Just("/quit".to_owned()),
                Just("/help".to_owned()),
                "[a-z/ ]{0,8}",
            ], 0..20),
        ) {
            let mut router = InputRouter::new(WINDOW);
            let mut sent = Vec::new();
            for (i, line) in lines.iter().enumerate() {
                let now = at(i as u64 * 300);
                if let Some(text) = router.take_due(now) {
                    sent.push(text);
                }
                router.submit(line, now);
            }
            if let Some(text) = router.take_due(at(u64::from(u16::MAX))) {
                sent.push(text);
            }

            prop_assert!(sent.iter().all(|text| text != "/quit"));
        }
    }
}
