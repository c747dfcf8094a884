//! Fuzz target for the SessionController poll state machine
//!
//! Drives the controller the way the runtime does: one outstanding poll at a
//! time, each ticket and decrypt job handed back at most once, with refreshes,
//! activity and termination interleaved anywhere.
//!
//! # Invariants
//!
//! - A ticket is issued only when no poll is outstanding and the session is
//!   active
//! - The poll interval stays within the backoff bounds
//! - The dedup cache never exceeds its capacity
//! - Results from before a refresh or after termination never touch the
//!   cursor or the cache
//! - A refresh always restarts from the first message

#![no_main]

use arbitrary::Arbitrary;
use k9crypt_app::{
    DecryptError, DecryptJob, DecryptOutcome, DecryptedBatch, FetchOutcome, PollTicket,
    SessionConfig, SessionController,
};
use k9crypt_client::ClientError;
use k9crypt_core::{Message, MessageId, MessagePage, RawMessage, Timestamp};
use k9crypt_store::MemoryStorage;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum SessionOp {
    BeginPoll,
    Fetched { page: Page },
    Decrypted { fail_mask: u8 },
    Refresh,
    NoteActivity,
    Terminate,
}

#[derive(Debug, Clone, Arbitrary)]
enum Page {
    Messages(Vec<u8>),
    /// Decodable messages followed by one undecodable entry.
    Trailing { ids: Vec<u8>, skipped: u8 },
    Failure,
}

enum Outstanding {
    Fetching(PollTicket),
    Decrypting(DecryptJob),
}

fn raw(id: u8) -> RawMessage {
    RawMessage {
        id: MessageId::new(format!("m{}", id % 32)),
        sender_id: "peer".into(),
        timestamp: Timestamp::from_millis(1_700_000_000_000).unwrap(),
        ciphertext: format!("enc:{id}"),
    }
}

fn outcomes(job: &DecryptJob, fail_mask: u8) -> Vec<DecryptOutcome> {
    job.messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            if job.seen.contains(&message.id) {
                DecryptOutcome::AlreadySeen
            } else if fail_mask & (1 << (i % 8)) != 0 {
                DecryptOutcome::Failed(DecryptError {
                    message_id: message.id.clone(),
                    source: ClientError::Timeout,
                })
            } else {
                DecryptOutcome::Decrypted(Message::decrypted(message.clone(), message.ciphertext.clone()))
            }
        })
        .collect()
}

fuzz_target!(|ops: Vec<SessionOp>| {
    let storage = MemoryStorage::joined("me", "room");
    let config = SessionConfig { cache_capacity: 8, ..SessionConfig::default() };
    let mut session = SessionController::start("room".into(), &storage, &config).unwrap();
    let mut outstanding: Option<Outstanding> = None;

    for op in ops {
        let before_cursor = session.cursor().cloned();
        let before_len = session.cache().len();

        match op {
            SessionOp::BeginPoll => {
                let expect_ticket = session.is_active() && !session.poll_in_flight();
                let ticket = session.begin_poll();
                assert_eq!(ticket.is_some(), expect_ticket);
                if let Some(ticket) = ticket {
                    assert_eq!(ticket.cursor, before_cursor);
                    assert_eq!(ticket.generation(), session.generation());
                    outstanding = Some(Outstanding::Fetching(ticket));
                }
            },
            SessionOp::Fetched { page } => {
                let ticket = match outstanding.take() {
                    Some(Outstanding::Fetching(ticket)) => ticket,
                    other => {
                        outstanding = other;
                        continue;
                    },
                };
                let stale = ticket.generation() != session.generation() || !session.is_active();
                let result = match page {
                    Page::Messages(ids) => Ok(ids.into_iter().map(raw).collect()),
                    Page::Trailing { ids, skipped } => Ok(MessagePage {
                        messages: ids.into_iter().map(raw).collect(),
                        last_id: Some(MessageId::new(format!("x{skipped}"))),
                    }),
                    Page::Failure => Err(ClientError::Transport("reset".into())),
                };

                match session.on_fetched(ticket, result) {
                    FetchOutcome::Decrypt(job) => {
                        assert!(!stale, "stale fetch produced a decrypt job");
                        assert!(job.last_id.is_some(), "decrypt job without a next cursor");
                        outstanding = Some(Outstanding::Decrypting(job));
                    },
                    FetchOutcome::Discarded => assert!(stale),
                    FetchOutcome::Empty | FetchOutcome::Failed(_) => assert!(!stale),
                }
                assert_eq!(session.cursor().cloned(), before_cursor);
                assert_eq!(session.cache().len(), before_len);
            },
            SessionOp::Decrypted { fail_mask } => {
                let job = match outstanding.take() {
                    Some(Outstanding::Decrypting(job)) => job,
                    other => {
                        outstanding = other;
                        continue;
                    },
                };
                let stale = job.ticket.generation() != session.generation() || !session.is_active();
                let batch = DecryptedBatch {
                    ticket: job.ticket.clone(),
                    last_id: job.last_id.clone(),
                    outcomes: outcomes(&job, fail_mask),
                };

                match session.apply(batch) {
                    Some(report) => {
                        assert!(!stale, "stale batch was applied");
                        assert_eq!(session.cursor(), job.last_id.as_ref());
                        assert_eq!(session.poll_interval(), config.backoff.min_interval);
                        let mut ids: Vec<_> = report.appended.iter().map(|m| &m.id).collect();
                        let shown = ids.len();
                        ids.sort();
                        ids.dedup();
                        assert_eq!(ids.len(), shown, "message appended twice in one batch");
                    },
                    None => {
                        assert!(stale);
                        assert_eq!(session.cursor().cloned(), before_cursor);
                        assert_eq!(session.cache().len(), before_len);
                    },
                }
            },
            SessionOp::Refresh => {
                let was_active = session.is_active();
                session.refresh();
                if was_active {
                    assert_eq!(session.cursor(), None);
                    assert!(session.cache().is_empty());
                    if outstanding.is_none() {
                        assert_eq!(session.next_poll_delay(), Some(std::time::Duration::ZERO));
                    }
                }
            },
            SessionOp::NoteActivity => session.note_activity(),
            SessionOp::Terminate => session.terminate(),
        }

        let interval = session.poll_interval();
        assert!(interval >= config.backoff.min_interval);
        assert!(interval <= config.backoff.max_interval);
        assert!(session.cache().len() <= session.cache().capacity());
        if session.is_active() {
            assert_eq!(session.poll_in_flight(), outstanding.is_some());
        } else {
            assert!(session.begin_poll().is_none());
            assert_eq!(session.next_poll_delay(), None);
        }
    }
});
