//! Observable state of one simulated session.

use k9crypt_app::{DisplayEvent, SessionConfig};
use k9crypt_core::{Message, MessageId, RoomId};

use crate::{SentMessage, SimService};

/// Everything invariants look at, captured after (or during) a run.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Display events in emission order.
    pub events: Vec<DisplayEvent>,
    /// Ids of the room log in server order.
    pub log: Vec<MessageId>,
    /// Sends the service accepted.
    pub sent: Vec<SentMessage>,
    /// Peak concurrent fetches at the service.
    pub max_fetches_in_flight: usize,
    /// Peak concurrent decrypts at the service.
    pub max_decrypts_in_flight: usize,
    /// Configured decrypt fan-out.
    pub decrypt_batch_size: usize,
}

impl SessionSnapshot {
    /// Capture the session's output and the service's observations.
    pub fn capture(
        events: &[DisplayEvent],
        service: &SimService,
        room_id: &RoomId,
        config: &SessionConfig,
    ) -> Self {
        Self {
            events: events.to_vec(),
            log: service.log(room_id).into_iter().map(|message| message.id).collect(),
            sent: service.sent(),
            max_fetches_in_flight: service.max_fetches_in_flight(),
            max_decrypts_in_flight: service.max_decrypts_in_flight(),
            decrypt_batch_size: config.decrypt_batch_size,
        }
    }

    /// Messages grouped by history: a new group starts at every clear.
    pub fn histories(&self) -> Vec<Vec<&Message>> {
        let mut histories = vec![Vec::new()];
        for event in &self.events {
            match event {
                DisplayEvent::MessageAppended(message) => {
                    if let Some(current) = histories.last_mut() {
                        current.push(message);
                    }
                },
                DisplayEvent::HistoryCleared => histories.push(Vec::new()),
                DisplayEvent::StatusChanged(_) | DisplayEvent::HelpShown => {},
            }
        }
        histories
    }
}
