//! Session start, shutdown paths and user-visible statuses.

use std::time::Duration;

use k9crypt_app::{
    DisplayEvent, ExitReason, HistoryLine, RuntimeError, SessionError, SessionExit, StatusLevel,
};
use k9crypt_client::ClientError;
use k9crypt_harness::{InvariantRegistry, LOCAL_USER, Scenario, SimDriverError, encrypt};
use k9crypt_store::MemoryStorage;
use tokio::time::sleep;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn start_requires_a_joined_room() {
    let scenario = Scenario { storage: MemoryStorage::new(LOCAL_USER), ..Scenario::new() };

    let error = scenario.run(|_| async {}).await.unwrap_err();

    assert_eq!(error, SessionError::NotJoined { room_id: scenario.room_id.clone() });
    assert!(scenario.service.fetches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_tuning_is_rejected_at_start() {
    let mut scenario = Scenario::new();
    scenario.config.decrypt_batch_size = 0;

    let error = scenario.run(|_| async {}).await.unwrap_err();

    assert!(matches!(error, SessionError::Config(_)));
}

#[tokio::test(start_paused = true)]
async fn interrupt_leaves_the_room() {
    let scenario = Scenario::new();

    let outcome = scenario
        .run(|handle| async move {
            sleep(ms(300)).await;
            handle.interrupt();
            sleep(ms(10)).await;
        })
        .await
        .unwrap();

    assert_eq!(
        outcome.exit.unwrap(),
        SessionExit { reason: ExitReason::Interrupted, left_room: true }
    );
    let leaves = scenario.service.leaves();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].0, scenario.room_id);
    assert_eq!(leaves[0].1.as_str(), LOCAL_USER);
}

#[tokio::test(start_paused = true)]
async fn interrupt_can_skip_the_leave() {
    let mut scenario = Scenario::new();
    scenario.config.leave_on_interrupt = false;

    let outcome = scenario
        .run(|handle| async move {
            handle.key(k9crypt_app::KeyInput::Esc);
            sleep(ms(10)).await;
        })
        .await
        .unwrap();

    assert_eq!(
        outcome.exit.unwrap(),
        SessionExit { reason: ExitReason::Interrupted, left_room: false }
    );
    assert!(scenario.service.leaves().is_empty());
}

#[tokio::test(start_paused = true)]
async fn host_shutdown_ends_the_session() {
    let scenario = Scenario::new();

    let outcome = scenario.run(|_| sleep(Duration::from_secs(1))).await.unwrap();

    assert_eq!(outcome.exit.unwrap().reason, ExitReason::Interrupted);
    assert!(outcome.handle.is_stopped());

    let polls = scenario.service.fetches().len();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(scenario.service.fetches().len(), polls, "no polls after termination");
}

#[tokio::test(start_paused = true)]
async fn closed_driver_ends_the_session() {
    let scenario = Scenario::new();
    let (runtime, handle, _events) = scenario.start().unwrap();
    drop(handle);

    let exit = runtime.run(std::future::pending()).await.unwrap();

    assert_eq!(exit, SessionExit { reason: ExitReason::DriverClosed, left_room: true });
}

#[tokio::test(start_paused = true)]
async fn render_failure_is_fatal() {
    let scenario = Scenario::new();
    let (runtime, handle, _events) = scenario.start().unwrap();
    handle.fail_renders("terminal gone");

    let result = runtime.run(std::future::pending()).await;

    assert!(matches!(result, Err(RuntimeError::Driver(SimDriverError(reason))) if reason == "terminal gone"));
}

#[tokio::test(start_paused = true)]
async fn fetch_failures_are_reported_and_polling_continues() {
    let scenario = Scenario::new();
    let service = &scenario.service;
    service.fail_next_fetch(ClientError::Server { status: 503, message: "unavailable".into() });
    service.fail_next_fetch(ClientError::Transport("connection reset".into()));
    service.post(&scenario.room_id, "alice", &encrypt("made it"));

    let outcome = scenario.run(|_| sleep(Duration::from_secs(2))).await.unwrap();

    let statuses = outcome.statuses();
    assert_eq!(statuses[0].text, "Server error: 503 - unavailable");
    assert_eq!(statuses[0].level, StatusLevel::Error);
    assert_eq!(statuses[1].text, "Connection error: transport error: connection reset");
    assert_eq!(outcome.texts(), vec!["made it"]);

    let fetches = service.fetches();
    assert!(fetches[..3].iter().all(|fetch| fetch.after.is_none()), "failures keep the cursor");
}

#[tokio::test(start_paused = true)]
async fn slow_fetches_time_out() {
    let mut scenario = Scenario::new();
    scenario.config.request_timeout = Duration::from_secs(1);
    scenario.service.set_fetch_latency(Duration::from_secs(5));

    let outcome = scenario.run(|_| sleep(Duration::from_secs(3))).await.unwrap();

    assert!(outcome.status_texts().contains(&"Connection error: request timed out".to_owned()));
    assert_eq!(scenario.service.max_fetches_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_failures_are_reported_and_later_sends_work() {
    let scenario = Scenario::new();
    scenario.service.fail_next_send(ClientError::Server { status: 500, message: "nope".into() });

    let outcome = scenario
        .run(|handle| async move {
            handle.submit("first try");
            sleep(ms(500)).await;
            handle.submit("second try");
            sleep(ms(500)).await;
        })
        .await
        .unwrap();

    let statuses = outcome.status_texts();
    assert!(statuses.contains(&"Failed to send message: Server error: 500 - nope".to_owned()));
    assert_eq!(statuses.last().map(String::as_str), Some("Message sent"));

    let sent: Vec<String> = scenario.service.sent().into_iter().map(|s| s.text).collect();
    assert_eq!(sent, vec!["second try"]);
    assert_eq!(scenario.service.send_attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn own_messages_come_back_through_the_poll() {
    let scenario = Scenario::new();
    scenario.service.echo_sends(true);

    let outcome = scenario
        .run(|handle| async move {
            handle.submit("hello there");
            sleep(Duration::from_secs(2)).await;
        })
        .await
        .unwrap();

    assert_eq!(outcome.texts(), vec!["hello there"]);
    let frame = outcome.handle.last_frame().unwrap();
    assert_eq!(frame.texts(), vec!["hello there"]);
    let HistoryLine::Message(message) = &frame.history[0] else {
        panic!("expected a message line");
    };
    assert_eq!(message.sender_id.as_str(), LOCAL_USER);
    InvariantRegistry::standard().assert_all(&scenario.snapshot(&outcome), "after echo");
}

#[tokio::test(start_paused = true)]
async fn help_is_shown_and_nothing_is_sent() {
    let scenario = Scenario::new();

    let outcome = scenario
        .run(|handle| async move {
            handle.submit(" /help ");
            sleep(ms(500)).await;
        })
        .await
        .unwrap();

    assert!(outcome.events.contains(&DisplayEvent::HelpShown));
    assert_eq!(scenario.service.send_attempts(), 0);
    let frame = outcome.handle.last_frame().unwrap();
    assert_eq!(frame.history, vec![HistoryLine::Help]);
    assert_eq!(frame.input, "");
}

#[tokio::test(start_paused = true)]
async fn typed_text_is_rendered_before_submission() {
    let scenario = Scenario::new();

    let outcome = scenario
        .run(|handle| async move {
            for c in "draft".chars() {
                handle.key(k9crypt_app::KeyInput::Char(c));
            }
            sleep(ms(10)).await;
        })
        .await
        .unwrap();

    let frames = outcome.handle.frames();
    assert!(frames.iter().any(|frame| frame.input == "draft"));
    assert_eq!(scenario.service.send_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn decrypt_fan_out_respects_batch_size() {
    let mut scenario = Scenario::new();
    scenario.config.decrypt_batch_size = 2;
    scenario.service.set_decrypt_latency(ms(50));
    for i in 0..5 {
        scenario.service.post(&scenario.room_id, "alice", &encrypt(&format!("m{i}")));
    }

    let outcome = scenario.run(|_| sleep(Duration::from_secs(2))).await.unwrap();

    assert_eq!(outcome.texts(), vec!["m0", "m1", "m2", "m3", "m4"]);
    assert_eq!(scenario.service.max_decrypts_in_flight(), 2);
    InvariantRegistry::standard().assert_all(&scenario.snapshot(&outcome), "with batch size 2");
}
