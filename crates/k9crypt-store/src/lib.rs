//! Local record store
//!
//! Flat JSON records kept in the data directory: the local user id, what the
//! user knows about each room (including whether they are currently joined),
//! and free-form settings. The trait is synchronous; every write goes straight
//! to disk.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod file;
mod memory;
mod records;

use std::collections::BTreeMap;

pub use error::StorageError;
pub use file::{DEFAULT_DIR_NAME, FileStorage, default_data_dir};
use k9crypt_core::{RoomId, Timestamp, UserId};
pub use memory::MemoryStorage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the client remembers about one room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    /// Room id, recorded when this client created the room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RoomId>,
    /// Deletion time reported at creation. `None` for permanent rooms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    /// Whether the user is currently joined.
    #[serde(default)]
    pub active: bool,
}

/// Persistence for user, room and settings records.
///
/// Must be Clone (the CLI and the session both hold one), Send + Sync, and
/// synchronous. Implementations share state via `Arc`, so clones see each
/// other's writes.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Local user id. Always present after construction.
    fn user_id(&self) -> UserId;

    /// Extra user field other than the id.
    fn user_data(&self, key: &str) -> Option<Value>;

    /// Set an extra user field.
    fn set_user_data(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Record for `room_id`, if any.
    fn room(&self, room_id: &RoomId) -> Option<RoomRecord>;

    /// Every room record, ordered by room id.
    fn rooms(&self) -> BTreeMap<RoomId, RoomRecord>;

    /// Replace the record for `room_id`.
    fn put_room(&self, room_id: &RoomId, record: RoomRecord) -> Result<(), StorageError>;

    /// Setting value for `key`.
    fn setting(&self, key: &str) -> Option<Value>;

    /// Store a setting.
    fn set_setting(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Every setting, ordered by key.
    fn settings(&self) -> BTreeMap<String, Value>;

    /// Forget every room.
    fn clear_rooms(&self) -> Result<(), StorageError>;

    /// Drop extra user fields. The user id survives.
    fn clear_user(&self) -> Result<(), StorageError>;

    /// Forget every setting.
    fn clear_settings(&self) -> Result<(), StorageError>;

    /// Clear rooms, user fields and settings.
    fn clear_all(&self) -> Result<(), StorageError> {
        self.clear_rooms()?;
        self.clear_user()?;
        self.clear_settings()
    }

    /// First joined room in id order.
    fn active_room(&self) -> Option<RoomId> {
        self.rooms().into_iter().find(|(_, record)| record.active).map(|(id, _)| id)
    }

    /// Mark `room_id` joined or left, keeping the rest of its record.
    ///
    /// Leaving a room with no record is a no-op.
    fn set_room_active(&self, room_id: &RoomId, active: bool) -> Result<(), StorageError> {
        let existing = self.room(room_id);
        if !active && existing.is_none() {
            return Ok(());
        }

        let mut record = existing.unwrap_or_default();
        record.active = active;
        self.put_room(room_id, record)
    }
}
