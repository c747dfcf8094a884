//! Fuzz target for InputRouter debounce and command routing
//!
//! # Invariants
//!
//! - Only trimmed, non-blank, non-command text is ever released for sending
//! - Released text is the most recent submission, never an earlier one
//! - Nothing is released before its quiet window has passed
//! - `/quit` drops pending text

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use k9crypt_app::{classify, Command, InputRouter, Routed, Submission};
use libfuzzer_sys::fuzz_target;

const WINDOW: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Arbitrary)]
enum RouterOp {
    Submit { line: String, after_ms: u16 },
    Command { which: u8, after_ms: u16 },
    Tick { after_ms: u16 },
    Discard,
}

fuzz_target!(|ops: Vec<RouterOp>| {
    let mut router = InputRouter::new(WINDOW);
    let mut now = Duration::ZERO;
    let mut last_message: Option<(String, Duration)> = None;

    for op in ops {
        match op {
            RouterOp::Submit { line, after_ms } => {
                now += Duration::from_millis(u64::from(after_ms));
                let routed = router.submit(&line, now);
                match classify(&line) {
                    Submission::Empty => assert_eq!(routed, Routed::Ignored),
                    Submission::Command(command) => {
                        assert_eq!(routed, Routed::Command(command));
                        if command == Command::Quit {
                            last_message = None;
                        }
                    },
                    Submission::Message(text) => {
                        assert_eq!(routed, Routed::Queued);
                        last_message = Some((text, now));
                    },
                }
            },
            RouterOp::Command { which, after_ms } => {
                now += Duration::from_millis(u64::from(after_ms));
                let command = Command::ALL[usize::from(which) % Command::ALL.len()];
                assert_eq!(router.submit(command.as_str(), now), Routed::Command(command));
                if command == Command::Quit {
                    assert_eq!(router.deadline(), None);
                    last_message = None;
                }
            },
            RouterOp::Tick { after_ms } => {
                now += Duration::from_millis(u64::from(after_ms));
                match router.take_due(now) {
                    Some(text) => {
                        let (expected, submitted_at) =
                            last_message.take().expect("released text without a submission");
                        assert_eq!(text, expected);
                        assert!(now >= submitted_at + WINDOW, "released inside the quiet window");
                        assert!(matches!(classify(&text), Submission::Message(ref t) if *t == text));
                    },
                    None => {
                        if let Some((_, submitted_at)) = &last_message {
                            assert!(now < *submitted_at + WINDOW, "due text was held back");
                        }
                    },
                }
            },
            RouterOp::Discard => {
                assert_eq!(router.discard(), last_message.take().map(|(text, _)| text));
            },
        }

        assert_eq!(router.pending_text(), last_message.as_ref().map(|(text, _)| text.as_str()));
    }
});
