//! One-shot room commands.
//!
//! Each command makes one service call, updates the local store on success
//! and writes a short report to the given writer. Errors are returned, never
//! printed, so `main` decides the exit status.

use std::io::Write;

use k9crypt_client::{
    ApiClient, ChatService, CreateRoomRequest, CreatedRoom, RoomKind, RoomLifetime, RoomSummary,
};
use k9crypt_core::{RoomId, Timestamp};
use k9crypt_store::{RoomRecord, Storage};

use crate::CliError;

/// Room commands bound to a service and a store.
#[derive(Debug, Clone)]
pub struct Commands<S> {
    api: ApiClient,
    storage: S,
}

impl<S: Storage> Commands<S> {
    /// Bind commands to `api` and `storage`.
    pub fn new(api: ApiClient, storage: S) -> Self {
        Self { api, storage }
    }

    /// Service client.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Local store.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Explicit room id, else the active room.
    ///
    /// # Errors
    ///
    /// [`CliError::NoRoom`] if neither exists.
    pub fn resolve_room(&self, room_id: Option<String>) -> Result<RoomId, CliError> {
        room_id
            .filter(|id| !id.trim().is_empty())
            .map(RoomId::from)
            .or_else(|| self.storage.active_room())
            .ok_or(CliError::NoRoom)
    }

    /// Create a room and remember its id and expiry.
    pub async fn create(
        &self,
        out: &mut impl Write,
        room_name: &str,
        kind: &str,
        password: Option<String>,
        lifetime: RoomLifetime,
    ) -> Result<CreatedRoom, CliError> {
        let request = CreateRoomRequest {
            user_id: self.storage.user_id(),
            kind: RoomKind::parse_lenient(kind),
            password,
            room_name: room_name.to_owned(),
            lifetime,
        };

        let created = self.api.create_room(&request).await?;
        tracing::info!(room_id = %created.room_id, %lifetime, "room created");

        let record = RoomRecord {
            id: Some(created.room_id.clone()),
            expires_at: created.expires_at,
            active: false,
        };
        self.storage.put_room(&created.room_id, record)?;

        writeln!(out, "Room Information:")?;
        writeln!(out, "Room ID: {}", created.room_id)?;
        writeln!(out, "Expires At: {}", expiry(created.expires_at))?;
        Ok(created)
    }

    /// Join a room and mark it active.
    pub async fn join(
        &self,
        out: &mut impl Write,
        room_id: Option<String>,
        password: Option<&str>,
    ) -> Result<RoomId, CliError> {
        let room_id = self.resolve_room(room_id)?;

        self.api.join_room(&room_id, &self.storage.user_id(), password).await?;
        self.storage.set_room_active(&room_id, true)?;
        tracing::info!(room_id = %room_id, "joined room");

        writeln!(out, "Joined room successfully!")?;
        Ok(room_id)
    }

    /// Leave a room and mark it inactive.
    pub async fn leave(&self, out: &mut impl Write, room_id: Option<String>) -> Result<RoomId, CliError> {
        let room_id = self.resolve_room(room_id)?;

        self.api.leave_room(&room_id, &self.storage.user_id()).await?;
        self.storage.set_room_active(&room_id, false)?;
        tracing::info!(room_id = %room_id, "left room");

        writeln!(out, "Left room successfully!")?;
        Ok(room_id)
    }

    /// Print every room the service knows about.
    pub async fn list(&self, out: &mut impl Write) -> Result<Vec<RoomSummary>, CliError> {
        let rooms = self.api.list_rooms().await?;

        if rooms.is_empty() {
            writeln!(out, "No rooms have been created yet.")?;
            return Ok(rooms);
        }

        writeln!(out, "Available Rooms:")?;
        for room in &rooms {
            writeln!(out)?;
            writeln!(out, "Room ID: {}", room.id)?;
            writeln!(out, "Room Name: {}", room.room_name)?;
            writeln!(out, "Type: {}", room.kind.label())?;
            writeln!(out, "User Count: {}", room.user_count)?;
            writeln!(out, "Expires At: {}", expiry(room.expires_at))?;
        }
        Ok(rooms)
    }

    /// Send one message without opening a session.
    pub async fn send(
        &self,
        out: &mut impl Write,
        message: &str,
        room_id: Option<String>,
    ) -> Result<RoomId, CliError> {
        let room_id = self.resolve_room(room_id)?;

        self.api.send_message(&room_id, &self.storage.user_id(), message).await?;
        tracing::debug!(room_id = %room_id, "message sent");

        writeln!(out, "Message sent successfully!")?;
        Ok(room_id)
    }
}

fn expiry(expires_at: Option<Timestamp>) -> String {
    expires_at.map_or_else(|| "Permanent".to_owned(), |ts| ts.as_datetime().to_rfc3339())
}
