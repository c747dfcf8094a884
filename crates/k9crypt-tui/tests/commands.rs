//! One-shot room commands against a mock service and an in-memory store.

use std::time::Duration;

use k9crypt_client::{ApiClient, ClientConfig, ClientError, RoomLifetime};
use k9crypt_core::RoomId;
use k9crypt_store::{MemoryStorage, RoomRecord, Storage};
use k9crypt_tui::{CliError, Commands, NO_ROOM};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

fn commands(server: &MockServer, storage: MemoryStorage) -> Commands<MemoryStorage> {
    let config = ClientConfig {
        base_url: server.uri(),
        request_timeout: Duration::from_secs(2),
        ..ClientConfig::default()
    };
    Commands::new(ApiClient::new(&config).unwrap(), storage)
}

fn output(buffer: Vec<u8>) -> String {
    String::from_utf8(buffer).unwrap()
}

#[tokio::test]
async fn create_prints_and_remembers_the_room() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room/create"))
        .and(body_json(json!({
            "userId": "me",
            "type": "private",
            "password": "pw",
            "roomName": "lobby",
            "lifetime": -1,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"roomId": "r1", "expiresAt": null})))
        .expect(1)
        .mount(&server)
        .await;

    let storage = MemoryStorage::new("me");
    let mut out = Vec::new();
    let created = commands(&server, storage.clone())
        .create(&mut out, "lobby", "secret", Some("pw".into()), RoomLifetime::Permanent)
        .await
        .unwrap();

    assert_eq!(created.room_id.as_str(), "r1");
    let out = output(out);
    assert!(out.contains("Room ID: r1"));
    assert!(out.contains("Expires At: Permanent"));

    let record = storage.room(&"r1".into()).unwrap();
    assert_eq!(record.id, Some(RoomId::from("r1")));
    assert!(!record.active);
}

#[tokio::test]
async fn join_marks_active_and_keeps_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room/join"))
        .and(body_json(json!({"roomId": "r1", "userId": "me", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "joined"})))
        .expect(1)
        .mount(&server)
        .await;

    let storage = MemoryStorage::new("me");
    let record = RoomRecord { id: Some("r1".into()), ..RoomRecord::default() };
    storage.put_room(&"r1".into(), record).unwrap();

    let mut out = Vec::new();
    let joined = commands(&server, storage.clone())
        .join(&mut out, Some("r1".into()), Some("pw"))
        .await
        .unwrap();

    assert_eq!(joined.as_str(), "r1");
    assert_eq!(output(out), "Joined room successfully!\n");
    let record = storage.room(&"r1".into()).unwrap();
    assert!(record.active);
    assert_eq!(record.id, Some(RoomId::from("r1")));
    assert_eq!(storage.active_room(), Some("r1".into()));
}

#[tokio::test]
async fn rejected_join_leaves_store_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room/join"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "Wrong password"})))
        .mount(&server)
        .await;

    let storage = MemoryStorage::new("me");
    let error = commands(&server, storage.clone())
        .join(&mut Vec::new(), Some("r1".into()), Some("nope"))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CliError::Client(ClientError::Server { status: 403, ref message }) if message == "Wrong password"
    ));
    assert!(storage.room(&"r1".into()).is_none());
}

#[tokio::test]
async fn leave_defaults_to_the_active_room() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room/leave"))
        .and(body_json(json!({"roomId": "r9", "userId": "me"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "bye"})))
        .expect(1)
        .mount(&server)
        .await;

    let storage = MemoryStorage::joined("me", "r9");
    let left = commands(&server, storage.clone()).leave(&mut Vec::new(), None).await.unwrap();

    assert_eq!(left.as_str(), "r9");
    assert_eq!(storage.active_room(), None);
    assert!(storage.room(&"r9".into()).is_some());
}

#[tokio::test]
async fn commands_without_a_room_fail_before_any_request() {
    let server = MockServer::start().await;
    let commands = commands(&server, MemoryStorage::new("me"));

    let error = commands.send(&mut Vec::new(), "hi", None).await.unwrap_err();
    assert!(matches!(error, CliError::NoRoom));
    assert_eq!(error.to_string(), NO_ROOM);

    assert!(matches!(commands.leave(&mut Vec::new(), Some("  ".into())).await, Err(CliError::NoRoom)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn send_posts_the_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room/message"))
        .and(body_json(json!({"roomId": "r1", "userId": "me", "message": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut out = Vec::new();
    commands(&server, MemoryStorage::joined("me", "r1")).send(&mut out, "hello", None).await.unwrap();

    assert_eq!(output(out), "Message sent successfully!\n");
}

#[tokio::test]
async fn list_prints_each_room() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/room/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rooms": [
                {"id": "r1", "roomName": "lobby", "type": "public", "userCount": 3, "expiresAt": null},
                {"id": "r2", "roomName": "vault", "type": "private", "userCount": 0},
            ]
        })))
        .mount(&server)
        .await;

    let mut out = Vec::new();
    let rooms = commands(&server, MemoryStorage::new("me")).list(&mut out).await.unwrap();

    assert_eq!(rooms.len(), 2);
    let out = output(out);
    assert!(out.starts_with("Available Rooms:"));
    assert!(out.contains("Room Name: lobby"));
    assert!(out.contains("Type: Public"));
    assert!(out.contains("Type: Private"));
    assert!(out.contains("User Count: 3"));
    assert_eq!(out.matches("Expires At: Permanent").count(), 2);
}

#[tokio::test]
async fn empty_list_says_so() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/room/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rooms": []})))
        .mount(&server)
        .await;

    let mut out = Vec::new();
    commands(&server, MemoryStorage::new("me")).list(&mut out).await.unwrap();

    assert_eq!(output(out), "No rooms have been created yet.\n");
}
