//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashSet;

use k9crypt_app::{Submission, classify};

use super::{Invariant, InvariantResult, SessionSnapshot, Violation};

/// A message id appears at most once per history.
///
/// Duplicate pages, overlapping polls and echoes of our own sends must all
/// collapse into one line.
pub struct NoDuplicateMessages;

impl Invariant for NoDuplicateMessages {
    fn name(&self) -> &'static str {
        "NoDuplicateMessages"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for (index, history) in state.histories().iter().enumerate() {
            let mut seen = HashSet::new();
            for message in history {
                if !seen.insert(&message.id) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("history {index}: message {} shown twice", message.id),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Displayed messages follow the room log order.
///
/// Decrypts finish in any order; the history must not.
pub struct MessagesInServerOrder;

impl Invariant for MessagesInServerOrder {
    fn name(&self) -> &'static str {
        "MessagesInServerOrder"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for (index, history) in state.histories().iter().enumerate() {
            let mut last_position = None;
            for message in history {
                let Some(position) = state.log.iter().position(|id| id == &message.id) else {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("history {index}: {} is not in the room log", message.id),
                    });
                };
                if last_position.is_some_and(|last| position <= last) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("history {index}: {} shown out of order", message.id),
                    });
                }
                last_position = Some(position);
            }
        }
        Ok(())
    }
}

/// At most one fetch is outstanding at any time.
pub struct SinglePollInFlight;

impl Invariant for SinglePollInFlight {
    fn name(&self) -> &'static str {
        "SinglePollInFlight"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.max_fetches_in_flight > 1 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} fetches were in flight at once", state.max_fetches_in_flight),
            });
        }
        Ok(())
    }
}

/// Decrypt fan-out never exceeds the configured batch size.
pub struct BoundedDecryptConcurrency;

impl Invariant for BoundedDecryptConcurrency {
    fn name(&self) -> &'static str {
        "BoundedDecryptConcurrency"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.max_decrypts_in_flight > state.decrypt_batch_size.max(1) {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "{} decrypts in flight, batch size is {}",
                    state.max_decrypts_in_flight, state.decrypt_batch_size
                ),
            });
        }
        Ok(())
    }
}

/// Only chat text reaches the send path, already trimmed.
pub struct CommandsNeverSent;

impl Invariant for CommandsNeverSent {
    fn name(&self) -> &'static str {
        "CommandsNeverSent"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for sent in &state.sent {
            match classify(&sent.text) {
                Submission::Message(text) if text == sent.text => {},
                Submission::Command(command) => {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("command {} was sent as a message", command.as_str()),
                    });
                },
                _ => {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("untrimmed or blank text sent: {:?}", sent.text),
                    });
                },
            }
        }
        Ok(())
    }
}
