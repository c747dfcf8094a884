//! Poll-loop state machine.
//!
//! The controller owns everything a session knows about the room: the
//! cursor, the poll interval, the dedup cache and whether the session is
//! still active. It performs no I/O. The runtime asks for a [`PollTicket`],
//! performs the fetch, and feeds results back; the controller decides what
//! the result means and when the next poll is due.
//!
//! # Invariants
//!
//! - At most one poll is in flight, from [`SessionController::begin_poll`]
//!   until its fetch or decrypt result has been handed back.
//! - The cursor only moves forward, except through
//!   [`SessionController::refresh`].
//! - Results carrying a ticket from before the latest refresh, or arriving
//!   after termination, never touch state.

use std::{collections::HashSet, time::Duration};

use k9crypt_client::ClientError;
use k9crypt_core::{BackoffPolicy, DedupCache, Message, MessageId, MessagePage, RawMessage, RoomId};
use k9crypt_store::Storage;

use crate::{
    SessionConfig, SessionError,
    error::DecryptError,
    pipeline::DecryptOutcome,
};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Started, first poll not yet issued.
    Idle,
    /// A fetch is in flight.
    Polling,
    /// Fetched messages are being decrypted.
    Applying,
    /// Waiting for the next poll to become due.
    Backoff,
    /// Ended. Nothing else happens.
    Terminated,
}

/// Permission to run exactly one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTicket {
    /// Room to fetch.
    pub room_id: RoomId,
    /// Fetch messages strictly after this id.
    pub cursor: Option<MessageId>,
    generation: u64,
    refresh: bool,
}

impl PollTicket {
    /// Refresh generation the ticket was issued in.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this is the first poll after a `/refresh`.
    pub fn is_refresh(&self) -> bool {
        self.refresh
    }
}

/// Messages that need decrypting before they can be applied.
#[derive(Debug, Clone)]
pub struct DecryptJob {
    /// Ticket of the poll that produced the messages.
    pub ticket: PollTicket,
    /// Raw messages in server order.
    pub messages: Vec<RawMessage>,
    /// Id of the last entry the service returned; the next cursor. May
    /// belong to an entry that could not be decoded.
    pub last_id: Option<MessageId>,
    /// Ids already in the dedup cache when the fetch landed.
    pub seen: HashSet<MessageId>,
}

/// Decrypt outcomes ready to be applied.
#[derive(Debug, Clone)]
pub struct DecryptedBatch {
    /// Ticket of the poll that produced the messages.
    pub ticket: PollTicket,
    /// Id of the last raw message in the fetch.
    pub last_id: Option<MessageId>,
    /// One outcome per raw message, in server order.
    pub outcomes: Vec<DecryptOutcome>,
}

/// What a fetch result means.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Nothing new. The interval grew.
    Empty,
    /// New messages to decrypt.
    Decrypt(DecryptJob),
    /// The fetch failed. The interval grew and the cursor is unchanged.
    Failed(ClientError),
    /// Result was stale or the session ended. State untouched.
    Discarded,
}

/// Messages and failures produced by applying a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Newly displayable messages, in server order.
    pub appended: Vec<Message>,
    /// Decrypt failures, in server order.
    pub failures: Vec<DecryptError>,
}

/// Result of a `/refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No poll in flight; the refresh poll is due now.
    PollNow,
    /// A poll is in flight; its result will be discarded and the refresh
    /// poll issued once it settles.
    Deferred,
    /// The session already ended.
    Ignored,
}

/// Single owner of the session state.
#[derive(Debug, Clone)]
pub struct SessionController {
    room_id: RoomId,
    phase: SessionPhase,
    cursor: Option<MessageId>,
    interval: Duration,
    policy: BackoffPolicy,
    cache: DedupCache,
    in_flight: bool,
    generation: u64,
    refresh_pending: bool,
    /// Activity noted while a poll was in flight; wins over that poll's backoff.
    activity_pending: bool,
}

impl SessionController {
    /// Start a session for `room_id`.
    ///
    /// Fails with [`SessionError::NotJoined`] unless `storage` records an
    /// active membership.
    pub fn start(
        room_id: RoomId,
        storage: &impl Storage,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        if !storage.room(&room_id).is_some_and(|record| record.active) {
            return Err(SessionError::NotJoined { room_id });
        }
        config.validate()?;
        let policy = BackoffPolicy::new(config.backoff)?;

        tracing::debug!(room_id = %room_id, "session state created");
        Ok(Self {
            room_id,
            phase: SessionPhase::Idle,
            cursor: None,
            interval: policy.min_interval(),
            policy,
            cache: DedupCache::new(config.cache_capacity),
            in_flight: false,
            generation: 0,
            refresh_pending: false,
            activity_pending: false,
        })
    }

    /// Room this session polls.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether polls are still being scheduled.
    pub fn is_active(&self) -> bool {
        self.phase != SessionPhase::Terminated
    }

    /// Last applied message id. `None` before the first non-empty poll.
    pub fn cursor(&self) -> Option<&MessageId> {
        self.cursor.as_ref()
    }

    /// Current poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.interval
    }

    /// Ids and messages already displayed.
    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Whether a poll (fetch or decrypt) is outstanding.
    pub fn poll_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Number of refreshes so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Delay until the next poll should start.
    ///
    /// `None` while a poll is in flight or after termination. Zero for the
    /// first poll and right after a refresh.
    pub fn next_poll_delay(&self) -> Option<Duration> {
        if !self.is_active() || self.in_flight {
            return None;
        }
        if self.phase == SessionPhase::Idle || self.refresh_pending {
            return Some(Duration::ZERO);
        }
        Some(self.interval)
    }

    /// Claim the right to fetch. `None` if a poll is already in flight or
    /// the session ended.
    pub fn begin_poll(&mut self) -> Option<PollTicket> {
        if !self.is_active() || self.in_flight {
            return None;
        }

        self.in_flight = true;
        self.phase = SessionPhase::Polling;
        let refresh = std::mem::take(&mut self.refresh_pending);
        Some(PollTicket {
            room_id: self.room_id.clone(),
            cursor: self.cursor.clone(),
            generation: self.generation,
            refresh,
        })
    }

    /// Feed back the fetch result for `ticket`.
    pub fn on_fetched(
        &mut self,
        ticket: PollTicket,
        result: Result<MessagePage, ClientError>,
    ) -> FetchOutcome {
        if !self.settle_if_stale(&ticket) {
            return FetchOutcome::Discarded;
        }

        match result {
            Err(error) => {
                self.finish_poll(false);
                FetchOutcome::Failed(error)
            },
            Ok(page) if page.is_empty() => {
                self.finish_poll(false);
                FetchOutcome::Empty
            },
            Ok(MessagePage { messages, last_id }) => {
                self.phase = SessionPhase::Applying;
                let seen =
                    messages.iter().filter(|m| self.cache.has(&m.id)).map(|m| m.id.clone()).collect();
                FetchOutcome::Decrypt(DecryptJob { ticket, messages, last_id, seen })
            },
        }
    }

    /// Apply decrypt outcomes for a poll. `None` if the batch is stale.
    ///
    /// Successful messages not yet cached are inserted and reported in
    /// server order. The cursor moves to the last raw id even when some
    /// messages failed, and the interval resets.
    pub fn apply(&mut self, batch: DecryptedBatch) -> Option<ApplyReport> {
        if !self.settle_if_stale(&batch.ticket) {
            return None;
        }

        let mut report = ApplyReport::default();
        for outcome in batch.outcomes {
            match outcome {
                DecryptOutcome::Decrypted(message) => {
                    if self.cache.insert(message.clone()) {
                        report.appended.push(message);
                    }
                },
                DecryptOutcome::AlreadySeen => {},
                DecryptOutcome::Failed(error) => report.failures.push(error),
            }
        }

        if let Some(last_id) = batch.last_id {
            self.cursor = Some(last_id);
        }
        self.finish_poll(true);
        Some(report)
    }

    /// Forget everything displayed and start over from the first message.
    pub fn refresh(&mut self) -> RefreshOutcome {
        if !self.is_active() {
            return RefreshOutcome::Ignored;
        }

        self.cache.clear();
        self.cursor = None;
        self.generation += 1;
        self.interval = self.policy.min_interval();
        self.refresh_pending = true;

        if self.in_flight { RefreshOutcome::Deferred } else { RefreshOutcome::PollNow }
    }

    /// Local activity (a sent message). Resets the interval to its floor.
    ///
    /// If a poll is in flight the reset also survives that poll settling
    /// without news.
    pub fn note_activity(&mut self) {
        self.interval = self.policy.min_interval();
        self.activity_pending = self.in_flight;
    }

    /// End the session. Idempotent.
    pub fn terminate(&mut self) {
        if self.phase != SessionPhase::Terminated {
            tracing::debug!(room_id = %self.room_id, "session terminated");
        }
        self.phase = SessionPhase::Terminated;
        self.in_flight = false;
        self.refresh_pending = false;
        self.activity_pending = false;
    }

    /// Returns true if the result for `ticket` may be applied. Otherwise
    /// releases the in-flight slot and leaves everything else untouched.
    fn settle_if_stale(&mut self, ticket: &PollTicket) -> bool {
        if !self.is_active() {
            return false;
        }
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding result from before refresh"
            );
            self.in_flight = false;
            self.phase = SessionPhase::Backoff;
            return false;
        }
        true
    }

    fn finish_poll(&mut self, got_new_messages: bool) {
        let activity = std::mem::take(&mut self.activity_pending);
        self.interval = self.policy.next(self.interval, got_new_messages || activity);
        self.in_flight = false;
        self.phase = SessionPhase::Backoff;
    }
}
