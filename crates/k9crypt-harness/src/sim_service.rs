//! Simulated chat service.
//!
//! `SimService` implements [`ChatService`] over an in-memory room log. Tests
//! script it: post messages, delay or fail individual decrypts, queue fetch
//! and send failures, make leave fail. It also records what the session did
//! (fetch cursors, sends, leaves, peak concurrency) for oracle checks.
//!
//! Ciphertexts use the `enc:` convention: `enc:hello` decrypts to `hello`.
//! Anything else fails to decrypt. The log can also hold entries a real
//! client would fail to decode; pages leave them out but still report their
//! id as `last_id`.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use k9crypt_client::{Ack, ChatService, ClientError};
use k9crypt_core::{MessageId, MessagePage, RawMessage, RoomId, Timestamp, UserId};
use tokio::time::Instant;

/// Prefix that marks a decryptable ciphertext.
pub const CIPHER_PREFIX: &str = "enc:";

/// Ciphertext for `plaintext`.
pub fn encrypt(plaintext: &str) -> String {
    format!("{CIPHER_PREFIX}{plaintext}")
}

/// One fetch as seen by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    /// Room polled.
    pub room_id: RoomId,
    /// Cursor the session sent.
    pub after: Option<MessageId>,
    /// When the request arrived.
    pub at: Instant,
}

/// One accepted send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Target room.
    pub room_id: RoomId,
    /// Author.
    pub sender_id: UserId,
    /// Plain text as submitted.
    pub text: String,
}

#[derive(Debug, Clone, Default)]
struct DecryptRule {
    delay: Duration,
    failure: Option<ClientError>,
}

#[derive(Debug, Clone)]
enum LogEntry {
    Message(RawMessage),
    Malformed(MessageId),
}

impl LogEntry {
    fn id(&self) -> &MessageId {
        match self {
            Self::Message(message) => &message.id,
            Self::Malformed(id) => id,
        }
    }

    fn message(&self) -> Option<RawMessage> {
        match self {
            Self::Message(message) => Some(message.clone()),
            Self::Malformed(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct ServiceState {
    rooms: HashMap<RoomId, Vec<LogEntry>>,
    next_id: u64,
    echo_sends: bool,

    fetch_latency: Duration,
    fetch_failures: VecDeque<ClientError>,
    decrypt_latency: Duration,
    decrypt_rules: HashMap<String, DecryptRule>,
    send_latency: Duration,
    send_failures: VecDeque<ClientError>,
    leave_latency: Duration,
    leave_failure: Option<ClientError>,

    fetches: Vec<FetchRecord>,
    decrypt_calls: usize,
    sent: Vec<SentMessage>,
    send_attempts: usize,
    leaves: Vec<(RoomId, UserId)>,

    fetches_in_flight: usize,
    max_fetches_in_flight: usize,
    decrypts_in_flight: usize,
    max_decrypts_in_flight: usize,
}

/// In-memory [`ChatService`] with scripted faults.
///
/// Clones share state, so a test keeps one handle while the session owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct SimService {
    state: Arc<Mutex<ServiceState>>,
}

#[derive(Clone, Copy)]
enum Gauge {
    Fetch,
    Decrypt,
}

/// Decrements an in-flight gauge when the request ends or is dropped.
struct InFlight {
    state: Arc<Mutex<ServiceState>>,
    gauge: Gauge,
}

impl InFlight {
    fn enter(state: &Arc<Mutex<ServiceState>>, gauge: Gauge) -> Self {
        let mut guard = lock(state);
        let s = &mut *guard;
        let (current, peak) = match gauge {
            Gauge::Fetch => (&mut s.fetches_in_flight, &mut s.max_fetches_in_flight),
            Gauge::Decrypt => (&mut s.decrypts_in_flight, &mut s.max_decrypts_in_flight),
        };
        *current += 1;
        *peak = (*peak).max(*current);
        drop(guard);
        Self { state: Arc::clone(state), gauge }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut s = lock(&self.state);
        match self.gauge {
            Gauge::Fetch => s.fetches_in_flight -= 1,
            Gauge::Decrypt => s.decrypts_in_flight -= 1,
        }
    }
}

fn lock(state: &Mutex<ServiceState>) -> MutexGuard<'_, ServiceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimService {
    /// Empty service with no latency and no faults.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        lock(&self.state)
    }

    /// Append a message to `room_id` with a generated id. Returns the id.
    pub fn post(&self, room_id: &RoomId, sender_id: &str, ciphertext: &str) -> MessageId {
        let mut s = self.lock();
        s.next_id += 1;
        let id = MessageId::new(format!("m{}", s.next_id));
        let raw = RawMessage {
            id: id.clone(),
            sender_id: sender_id.into(),
            timestamp: timestamp_for(s.next_id),
            ciphertext: ciphertext.to_owned(),
        };
        s.rooms.entry(room_id.clone()).or_default().push(LogEntry::Message(raw));
        id
    }

    /// Append an already-built message, keeping its id. Duplicates allowed.
    pub fn post_raw(&self, room_id: &RoomId, message: RawMessage) {
        self.lock().rooms.entry(room_id.clone()).or_default().push(LogEntry::Message(message));
    }

    /// Append an entry with a generated id that cannot be decoded, such as
    /// one with an unparseable timestamp. Returns the id.
    pub fn post_malformed(&self, room_id: &RoomId) -> MessageId {
        let mut s = self.lock();
        s.next_id += 1;
        let id = MessageId::new(format!("m{}", s.next_id));
        s.rooms.entry(room_id.clone()).or_default().push(LogEntry::Malformed(id.clone()));
        id
    }

    /// Accepted sends also appear in the room log, as a real service would.
    pub fn echo_sends(&self, enabled: bool) {
        self.lock().echo_sends = enabled;
    }

    /// Delay every fetch by `latency`.
    pub fn set_fetch_latency(&self, latency: Duration) {
        self.lock().fetch_latency = latency;
    }

    /// Fail the next fetch with `error`. Queued failures are used in order.
    pub fn fail_next_fetch(&self, error: ClientError) {
        self.lock().fetch_failures.push_back(error);
    }

    /// Delay every decrypt without a specific rule by `latency`.
    pub fn set_decrypt_latency(&self, latency: Duration) {
        self.lock().decrypt_latency = latency;
    }

    /// Delay decrypts of `ciphertext` by `delay`.
    pub fn delay_decrypt(&self, ciphertext: &str, delay: Duration) {
        self.lock().decrypt_rules.entry(ciphertext.to_owned()).or_default().delay = delay;
    }

    /// Fail decrypts of `ciphertext` with `error`.
    pub fn fail_decrypt(&self, ciphertext: &str, error: ClientError) {
        self.lock().decrypt_rules.entry(ciphertext.to_owned()).or_default().failure = Some(error);
    }

    /// Delay every send by `latency`.
    pub fn set_send_latency(&self, latency: Duration) {
        self.lock().send_latency = latency;
    }

    /// Fail the next send with `error`.
    pub fn fail_next_send(&self, error: ClientError) {
        self.lock().send_failures.push_back(error);
    }

    /// Delay every leave by `latency`.
    pub fn set_leave_latency(&self, latency: Duration) {
        self.lock().leave_latency = latency;
    }

    /// Fail every leave with `error`.
    pub fn fail_leave(&self, error: ClientError) {
        self.lock().leave_failure = Some(error);
    }

    /// Every fetch received, oldest first.
    pub fn fetches(&self) -> Vec<FetchRecord> {
        self.lock().fetches.clone()
    }

    /// Number of decrypt requests received.
    pub fn decrypt_calls(&self) -> usize {
        self.lock().decrypt_calls
    }

    /// Sends that were accepted, oldest first.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().sent.clone()
    }

    /// Send requests received, accepted or not.
    pub fn send_attempts(&self) -> usize {
        self.lock().send_attempts
    }

    /// Leave requests received.
    pub fn leaves(&self) -> Vec<(RoomId, UserId)> {
        self.lock().leaves.clone()
    }

    /// Highest number of fetches outstanding at once.
    pub fn max_fetches_in_flight(&self) -> usize {
        self.lock().max_fetches_in_flight
    }

    /// Highest number of decrypts outstanding at once.
    pub fn max_decrypts_in_flight(&self) -> usize {
        self.lock().max_decrypts_in_flight
    }

    /// The decodable messages of `room_id`, in server order.
    pub fn log(&self, room_id: &RoomId) -> Vec<RawMessage> {
        let s = self.lock();
        s.rooms
            .get(room_id)
            .into_iter()
            .flatten()
            .filter_map(LogEntry::message)
            .collect()
    }

    /// Entries of `room_id` after `after`, or the whole log when the cursor
    /// is absent or unknown.
    fn page(&self, room_id: &RoomId, after: Option<&MessageId>) -> MessagePage {
        let s = self.lock();
        let Some(log) = s.rooms.get(room_id) else {
            return MessagePage::default();
        };
        let start = after
            .and_then(|cursor| log.iter().rposition(|entry| entry.id() == cursor))
            .map_or(0, |index| index + 1);

        let entries = &log[start..];
        let messages = entries.iter().filter_map(LogEntry::message).collect();
        MessagePage { messages, last_id: entries.last().map(|entry| entry.id().clone()) }
    }
}

/// Distinct, increasing timestamps for generated messages.
#[allow(clippy::expect_used)]
fn timestamp_for(sequence: u64) -> Timestamp {
    const BASE_MS: i64 = 1_700_000_000_000;
    let offset = i64::try_from(sequence).unwrap_or(0).saturating_mul(1000);
    Timestamp::from_millis(BASE_MS.saturating_add(offset))
        .expect("invariant: simulated timestamps stay within the representable range")
}

impl ChatService for SimService {
    async fn fetch_messages(
        &self,
        room_id: &RoomId,
        after: Option<&MessageId>,
    ) -> Result<MessagePage, ClientError> {
        let latency = {
            let mut s = self.lock();
            s.fetches.push(FetchRecord {
                room_id: room_id.clone(),
                after: after.cloned(),
                at: Instant::now(),
            });
            s.fetch_latency
        };

        let _in_flight = InFlight::enter(&self.state, Gauge::Fetch);
        tokio::time::sleep(latency).await;

        if let Some(error) = self.lock().fetch_failures.pop_front() {
            return Err(error);
        }
        Ok(self.page(room_id, after))
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<String, ClientError> {
        let rule = {
            let mut s = self.lock();
            s.decrypt_calls += 1;
            let default = DecryptRule { delay: s.decrypt_latency, failure: None };
            s.decrypt_rules.get(ciphertext).cloned().unwrap_or(default)
        };

        let _in_flight = InFlight::enter(&self.state, Gauge::Decrypt);
        tokio::time::sleep(rule.delay).await;

        if let Some(error) = rule.failure {
            return Err(error);
        }
        ciphertext.strip_prefix(CIPHER_PREFIX).map(str::to_owned).ok_or_else(|| {
            ClientError::Server { status: 400, message: "Failed to decrypt message".into() }
        })
    }

    async fn send_message(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
        text: &str,
    ) -> Result<Ack, ClientError> {
        let latency = {
            let mut s = self.lock();
            s.send_attempts += 1;
            s.send_latency
        };
        tokio::time::sleep(latency).await;

        let echo = {
            let mut s = self.lock();
            if let Some(error) = s.send_failures.pop_front() {
                return Err(error);
            }
            s.sent.push(SentMessage {
                room_id: room_id.clone(),
                sender_id: sender_id.clone(),
                text: text.to_owned(),
            });
            s.echo_sends
        };
        if echo {
            self.post(room_id, sender_id.as_str(), &encrypt(text));
        }
        Ok(Ack { message: Some("Message sent".into()) })
    }

    async fn leave_room(&self, room_id: &RoomId, sender_id: &UserId) -> Result<Ack, ClientError> {
        let latency = {
            let mut s = self.lock();
            s.leaves.push((room_id.clone(), sender_id.clone()));
            s.leave_latency
        };
        tokio::time::sleep(latency).await;

        match self.lock().leave_failure.clone() {
            Some(error) => Err(error),
            None => Ok(Ack { message: Some("Left room".into()) }),
        }
    }
}
