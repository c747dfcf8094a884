//! HTTP contract tests for `ApiClient` against a mock service.

use std::time::Duration;

use k9crypt_client::{
    ApiClient, ChatService, ClientConfig, ClientError, CreateRoomRequest, RoomKind, RoomLifetime,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

fn client_for(server: &MockServer) -> ApiClient {
    let config = ClientConfig {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(500),
        ..ClientConfig::default()
    };
    ApiClient::new(&config).unwrap()
}

#[tokio::test]
async fn fetch_passes_cursor_and_parses_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/room/r1/messages"))
        .and(query_param("after", "m7"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"id": "m8", "userId": "alice", "message": "c8", "timestamp": 1_700_000_000_000_i64},
                {"id": 9, "userId": "System", "message": "c9", "timestamp": "2024-01-01T00:00:00Z"},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let page = client.fetch_messages(&"r1".into(), Some(&"m7".into())).await.unwrap();
    let messages = &page.messages;

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id.as_str(), "m8");
    assert_eq!(messages[0].ciphertext, "c8");
    assert_eq!(messages[1].id.as_str(), "9");
    assert_eq!(messages[1].sender_id.as_str(), "System");
}

#[tokio::test]
async fn malformed_entries_are_skipped_but_move_the_last_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/room/r1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"id": "a", "userId": "alice", "message": "ca", "timestamp": "2024-01-01T10:00:00"},
                {"id": "b", "userId": "alice", "message": "cb", "timestamp": "whenever"},
                {"id": "c", "userId": "alice", "message": "cc", "timestamp": 1_700_000_000_000.5},
                {"id": "d", "userId": "alice"},
                {"userId": "alice", "message": "no id", "timestamp": 0},
            ]
        })))
        .mount(&server)
        .await;

    let page = client_for(&server).fetch_messages(&"r1".into(), None).await.unwrap();

    let ids: Vec<&str> = page.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert_eq!(page.last_id.as_ref().map(|id| id.as_str()), Some("d"));
}

#[tokio::test]
async fn fetch_without_cursor_sends_empty_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/room/r1/messages"))
        .and(query_param("after", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server).fetch_messages(&"r1".into(), None).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn fetch_without_messages_field_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/room/r1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let page = client_for(&server).fetch_messages(&"r1".into(), None).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn fetch_server_error_carries_status_and_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/room/r1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "database down"})))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_messages(&"r1".into(), None).await.unwrap_err();
    assert_eq!(err, ClientError::Server { status: 500, message: "database down".into() });
    assert!(err.is_transient());
}

#[tokio::test]
async fn malformed_page_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/room/r1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_messages(&"r1".into(), None).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/view"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let err = client_for(&server).decrypt("cipher").await.unwrap_err();
    assert_eq!(err, ClientError::Timeout);
}

#[tokio::test]
async fn decrypt_posts_ciphertext_and_returns_body_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/view"))
        .and(body_json(json!({"message": "cipher"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello world"))
        .expect(1)
        .mount(&server)
        .await;

    let plaintext = client_for(&server).decrypt("cipher").await.unwrap();
    assert_eq!(plaintext, "hello world");
}

#[tokio::test]
async fn send_posts_room_user_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room/message"))
        .and(body_json(json!({"roomId": "r1", "userId": "u1", "message": "hi"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Message sent"})))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client_for(&server).send_message(&"r1".into(), &"u1".into(), "hi").await.unwrap();
    assert_eq!(ack.message.as_deref(), Some("Message sent"));
}

#[tokio::test]
async fn leave_with_error_body_fails_even_on_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room/leave"))
        .and(body_json(json!({"roomId": "r1", "userId": "u1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Not a member"})))
        .mount(&server)
        .await;

    let err = client_for(&server).leave_room(&"r1".into(), &"u1".into()).await.unwrap_err();
    assert_eq!(err, ClientError::Server { status: 200, message: "Not a member".into() });
}

#[tokio::test]
async fn join_sends_password_when_given() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room/join"))
        .and(body_json(json!({"roomId": "r1", "userId": "u1", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Joined"})))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client_for(&server).join_room(&"r1".into(), &"u1".into(), Some("pw")).await.unwrap();
    assert_eq!(ack.message.as_deref(), Some("Joined"));
}

#[tokio::test]
async fn join_rejection_uses_plain_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room/join"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Invalid password"))
        .mount(&server)
        .await;

    let err = client_for(&server).join_room(&"r1".into(), &"u1".into(), None).await.unwrap_err();
    assert_eq!(err, ClientError::Server { status: 403, message: "Invalid password".into() });
    assert!(!err.is_transient());
}

#[tokio::test]
async fn create_serializes_lifetime_and_parses_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room/create"))
        .and(body_json(json!({
            "userId": "u1",
            "type": "private",
            "password": "pw",
            "roomName": "team",
            "lifetime": 86_400_000,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "roomId": "r42",
            "expiresAt": "2030-01-01T00:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateRoomRequest {
        user_id: "u1".into(),
        kind: RoomKind::Private,
        password: Some("pw".into()),
        room_name: "team".into(),
        lifetime: RoomLifetime::Day,
    };
    let created = client_for(&server).create_room(&request).await.unwrap();

    assert_eq!(created.room_id.as_str(), "r42");
    let expires = created.expires_at.unwrap();
    assert_eq!(expires.as_datetime().to_rfc3339(), "2030-01-01T00:00:00+00:00");
}

#[tokio::test]
async fn list_parses_room_summaries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/room/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rooms": [
                {"id": "r1", "roomName": "lobby", "type": "public", "userCount": 3, "expiresAt": null},
                {"id": "r2", "roomName": "ops", "type": "private", "userCount": 1,
                 "expiresAt": 1_900_000_000_000_i64},
            ]
        })))
        .mount(&server)
        .await;

    let rooms = client_for(&server).list_rooms().await.unwrap();

    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].room_name, "lobby");
    assert_eq!(rooms[0].kind, RoomKind::Public);
    assert_eq!(rooms[0].user_count, 3);
    assert!(rooms[0].expires_at.is_none());
    assert_eq!(rooms[1].kind, RoomKind::Private);
    assert!(rooms[1].expires_at.is_some());
}

#[tokio::test]
async fn unreachable_service_is_transport_error() {
    let config = ClientConfig {
        base_url: "http://127.0.0.1:1".into(),
        request_timeout: Duration::from_millis(500),
        connect_timeout: Duration::from_millis(200),
    };
    let client = ApiClient::new(&config).unwrap();

    let err = client.fetch_messages(&"r1".into(), None).await.unwrap_err();
    assert!(err.is_transient(), "{err:?}");
}
