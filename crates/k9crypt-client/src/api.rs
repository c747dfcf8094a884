//! JSON-over-HTTP implementation of the service calls.

use k9crypt_core::{MessageId, MessagePage, RawMessage, RoomId, UserId};
use reqwest::{Response, StatusCode, Url, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Ack, ChatService, ClientConfig, ClientError, CreateRoomRequest, CreatedRoom, RoomSummary,
    room::RoomList,
};

/// HTTP client for the k9crypt service.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendBody<'a> {
    room_id: &'a RoomId,
    user_id: &'a UserId,
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MembershipBody<'a> {
    room_id: &'a RoomId,
    user_id: &'a UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Serialize)]
struct ViewBody<'a> {
    message: &'a str,
}

/// Entries stay untyped so one malformed message cannot sink the page.
#[derive(Deserialize)]
struct WirePage {
    #[serde(default)]
    messages: Vec<Value>,
}

/// Shape shared by acknowledgements and error bodies.
#[derive(Deserialize, Default)]
struct Envelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiClient {
    /// Build a client for `config.base_url`.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Create a room. `POST /room/create`.
    pub async fn create_room(&self, request: &CreateRoomRequest) -> Result<CreatedRoom, ClientError> {
        let url = self.endpoint(&["room", "create"])?;
        tracing::debug!(room_name = %request.room_name, kind = ?request.kind, "creating room");

        let response = check_status(self.http.post(url).json(request).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Join a room, optionally with its password. `POST /room/join`.
    pub async fn join_room(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        password: Option<&str>,
    ) -> Result<Ack, ClientError> {
        let url = self.endpoint(&["room", "join"])?;
        tracing::debug!(room_id = %room_id, "joining room");

        let body = MembershipBody { room_id, user_id, password };
        read_ack(self.http.post(url).json(&body).send().await?).await
    }

    /// Every room the service knows about. `GET /room/list`.
    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ClientError> {
        let url = self.endpoint(&["room", "list"])?;

        let response = check_status(self.http.get(url).send().await?).await?;
        let list: RoomList = response.json().await?;
        Ok(list.rooms)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl ChatService for ApiClient {
    async fn fetch_messages(
        &self,
        room_id: &RoomId,
        after: Option<&MessageId>,
    ) -> Result<MessagePage, ClientError> {
        let url = self.endpoint(&["room", room_id.as_str(), "messages"])?;
        let after = after.map(MessageId::as_str).unwrap_or_default();

        let response = self
            .http
            .get(url)
            .query(&[("after", after)])
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let wire: WirePage = check_status(response).await?.json().await?;
        let page = decode_page(room_id, wire.messages);

        tracing::trace!(room_id = %room_id, count = page.len(), "fetched messages");
        Ok(page)
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<String, ClientError> {
        let url = self.endpoint(&["view"])?;

        let response = self.http.post(url).json(&ViewBody { message: ciphertext }).send().await?;
        Ok(check_status(response).await?.text().await?)
    }

    async fn send_message(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
        text: &str,
    ) -> Result<Ack, ClientError> {
        let url = self.endpoint(&["room", "message"])?;
        tracing::debug!(room_id = %room_id, len = text.len(), "sending message");

        let body = SendBody { room_id, user_id: sender_id, message: text };
        read_ack(self.http.post(url).json(&body).send().await?).await
    }

    async fn leave_room(&self, room_id: &RoomId, sender_id: &UserId) -> Result<Ack, ClientError> {
        let url = self.endpoint(&["room", "leave"])?;
        tracing::debug!(room_id = %room_id, "leaving room");

        let body = MembershipBody { room_id, user_id: sender_id, password: None };
        read_ack(self.http.post(url).json(&body).send().await?).await
    }
}

/// Decode entries one by one. Undecodable entries are logged and skipped;
/// if they carry a usable id it still becomes the page's `last_id`.
fn decode_page(room_id: &RoomId, entries: Vec<Value>) -> MessagePage {
    let mut page = MessagePage::default();
    for entry in entries {
        let id = entry.get("id").cloned().and_then(|id| serde_json::from_value::<MessageId>(id).ok());
        match serde_json::from_value::<RawMessage>(entry) {
            Ok(message) => {
                page.last_id = Some(message.id.clone());
                page.messages.push(message);
            },
            Err(error) => {
                tracing::warn!(room_id = %room_id, message_id = ?id, %error, "skipping malformed message");
                if id.is_some() {
                    page.last_id = id;
                }
            },
        }
    }
    page
}

/// Pass successful responses through, turn the rest into [`ClientError::Server`].
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(server_error(status, &body))
}

fn server_error(status: StatusCode, body: &str) -> ClientError {
    let from_json = serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .filter(|error| !error.trim().is_empty());
    let body = body.trim();
    let message = from_json
        .or_else(|| (!body.is_empty()).then(|| body.to_owned()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned());

    ClientError::Server { status: status.as_u16(), message }
}

/// Acknowledgement bodies are free-form; an `error` field fails the call even
/// on a success status.
async fn read_ack(response: Response) -> Result<Ack, ClientError> {
    let status = response.status();
    let response = check_status(response).await?;
    let body = response.text().await?;

    let envelope: Envelope = serde_json::from_str(&body).unwrap_or_default();
    if let Some(error) = envelope.error {
        return Err(ClientError::Server { status: status.as_u16(), message: error });
    }
    Ok(Ack { message: envelope.message })
}
