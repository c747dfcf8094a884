//! Property-based tests over arbitrary session scripts.
//!
//! Each case drives a full session on the paused clock with a random mix of
//! remote posts, duplicate deliveries, undecodable entries, fetch faults,
//! slow decrypts and user input, then checks the standard invariants and that
//! the session caught up with the room log once things went quiet.

use std::{collections::HashSet, time::Duration};

use k9crypt_app::DisplayEvent;
use k9crypt_client::ClientError;
use k9crypt_core::{MessageId, RawMessage, Timestamp};
use k9crypt_harness::{InvariantRegistry, Outcome, Scenario, encrypt};
use proptest::prelude::*;
use tokio::time::sleep;

/// One step of a random script.
#[derive(Debug, Clone)]
enum Op {
    /// Someone else posts a message.
    Post(String),
    /// The service delivers the same message twice in a row.
    PostTwice(String),
    /// An entry the client cannot decode.
    PostMalformed,
    /// The local user submits a line.
    Submit(String),
    /// The next fetch fails.
    FailFetch,
    /// Decrypts take this long from now on.
    DecryptLatency(u64),
    /// Let time pass.
    Wait(u64),
}

fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        6 => "[a-z ]{0,8}",
        1 => Just("/help".to_owned()),
        1 => Just("/refresh".to_owned()),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => "[a-z]{1,8}".prop_map(Op::Post),
        1 => "[a-z]{1,8}".prop_map(Op::PostTwice),
        1 => Just(Op::PostMalformed),
        2 => line_strategy().prop_map(Op::Submit),
        1 => Just(Op::FailFetch),
        1 => (0u64..300).prop_map(Op::DecryptLatency),
        3 => (0u64..700).prop_map(Op::Wait),
    ]
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

async fn run_script(scenario: &Scenario, ops: Vec<Op>) -> Outcome {
    let service = scenario.service.clone();
    let room_id = scenario.room_id.clone();

    scenario
        .run(|handle| async move {
            for (index, op) in ops.into_iter().enumerate() {
                match op {
                    Op::Post(text) => {
                        service.post(&room_id, "alice", &encrypt(&text));
                    },
                    Op::PostTwice(text) => {
                        let raw = RawMessage {
                            id: MessageId::new(format!("dup-{index}")),
                            sender_id: "bob".into(),
                            timestamp: Timestamp::from_millis(1_700_000_000_000).unwrap(),
                            ciphertext: encrypt(&text),
                        };
                        service.post_raw(&room_id, raw.clone());
                        service.post_raw(&room_id, raw);
                    },
                    Op::PostMalformed => {
                        service.post_malformed(&room_id);
                    },
                    Op::Submit(line) => handle.submit(&line),
                    Op::FailFetch => {
                        service.fail_next_fetch(ClientError::Transport("connection reset".into()));
                    },
                    Op::DecryptLatency(delay) => {
                        service.set_decrypt_latency(Duration::from_millis(delay));
                    },
                    Op::Wait(delay) => sleep(Duration::from_millis(delay)).await,
                }
            }
            // Quiet period: pending sends flush and the poll loop catches up.
            sleep(Duration::from_secs(5)).await;
        })
        .await
        .unwrap()
}

/// Ids shown since the last history reset, in display order.
fn current_history(outcome: &Outcome) -> Vec<MessageId> {
    let start = outcome
        .events
        .iter()
        .rposition(|event| matches!(event, DisplayEvent::HistoryCleared))
        .map_or(0, |index| index + 1);

    outcome.events[start..]
        .iter()
        .filter_map(|event| match event {
            DisplayEvent::MessageAppended(message) => Some(message.id.clone()),
            _ => None,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Session invariants hold under arbitrary scripts.
    #[test]
    fn prop_session_invariants_hold(ops in prop::collection::vec(op_strategy(), 0..24)) {
        let scenario = Scenario::new();
        scenario.service.echo_sends(true);

        let outcome = paused_runtime().block_on(run_script(&scenario, ops.clone()));

        prop_assert!(outcome.exit.is_ok(), "session failed: {:?}", outcome.exit);
        let snapshot = scenario.snapshot(&outcome);
        let result = InvariantRegistry::standard().check_all(&snapshot);
        prop_assert!(result.is_ok(), "violations {:?} for {:?}", result, ops);
    }

    /// Once the room goes quiet, the history is exactly the room log.
    #[test]
    fn prop_history_catches_up_with_log(ops in prop::collection::vec(op_strategy(), 0..24)) {
        let scenario = Scenario::new();
        scenario.service.echo_sends(true);

        let outcome = paused_runtime().block_on(run_script(&scenario, ops.clone()));

        let mut seen = HashSet::new();
        let expected: Vec<MessageId> = scenario
            .service
            .log(&scenario.room_id)
            .into_iter()
            .map(|raw| raw.id)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        prop_assert_eq!(current_history(&outcome), expected, "script {:?}", ops);
    }
}
