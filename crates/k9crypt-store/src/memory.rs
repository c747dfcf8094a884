use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use k9crypt_core::{RoomId, UserId};
use serde_json::Value;

use crate::{
    RoomRecord, Storage, StorageError,
    records::{Records, Section},
};

/// In-memory storage for tests and simulation.
///
/// Same contract as [`crate::FileStorage`] without touching the filesystem.
/// Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Records>>,
}

impl MemoryStorage {
    /// Empty store for `user_id`.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self { inner: Arc::new(Mutex::new(Records::new(user_id.into()))) }
    }

    /// Store for `user_id` already joined to `room_id`.
    pub fn joined(user_id: impl Into<UserId>, room_id: impl Into<RoomId>) -> Self {
        let storage = Self::new(user_id);
        storage.lock().put_room(&room_id.into(), RoomRecord { active: true, ..RoomRecord::default() });
        storage
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("local")
    }
}

impl Storage for MemoryStorage {
    fn user_id(&self) -> UserId {
        self.lock().user_id.clone()
    }

    fn user_data(&self, key: &str) -> Option<Value> {
        self.lock().user_data(key)
    }

    fn set_user_data(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.lock().set_user_data(key, value);
        Ok(())
    }

    fn room(&self, room_id: &RoomId) -> Option<RoomRecord> {
        self.lock().rooms.get(room_id).cloned()
    }

    fn rooms(&self) -> BTreeMap<RoomId, RoomRecord> {
        self.lock().rooms.clone()
    }

    fn put_room(&self, room_id: &RoomId, record: RoomRecord) -> Result<(), StorageError> {
        self.lock().put_room(room_id, record);
        Ok(())
    }

    fn setting(&self, key: &str) -> Option<Value> {
        self.lock().settings.get(key).cloned()
    }

    fn set_setting(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.lock().set_setting(key, value);
        Ok(())
    }

    fn settings(&self) -> BTreeMap<String, Value> {
        self.lock().settings.clone()
    }

    fn clear_rooms(&self) -> Result<(), StorageError> {
        self.lock().clear(Section::Rooms);
        Ok(())
    }

    fn clear_user(&self) -> Result<(), StorageError> {
        self.lock().clear(Section::User);
        Ok(())
    }

    fn clear_settings(&self) -> Result<(), StorageError> {
        self.lock().clear(Section::Settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn active_room_is_first_joined_in_id_order() {
        let storage = MemoryStorage::new("u1");
        storage.set_room_active(&"zeta".into(), true).unwrap();
        storage.set_room_active(&"beta".into(), true).unwrap();
        storage.put_room(&"alpha".into(), RoomRecord::default()).unwrap();

        assert_eq!(storage.active_room(), Some("beta".into()));
    }

    #[test]
    fn join_keeps_creation_metadata() {
        let storage = MemoryStorage::new("u1");
        let room: RoomId = "r1".into();
        storage.put_room(&room, RoomRecord { id: Some(room.clone()), ..RoomRecord::default() }).unwrap();

        storage.set_room_active(&room, true).unwrap();

        let record = storage.room(&room).unwrap();
        assert!(record.active);
        assert_eq!(record.id, Some(room));
    }

    #[test]
    fn leaving_unknown_room_creates_nothing() {
        let storage = MemoryStorage::new("u1");
        storage.set_room_active(&"ghost".into(), false).unwrap();
        assert!(storage.rooms().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let storage = MemoryStorage::joined("u1", "r1");
        let clone = storage.clone();
        clone.set_room_active(&"r1".into(), false).unwrap();

        assert_eq!(storage.active_room(), None);
    }

    #[test]
    fn clear_user_keeps_id() {
        let storage = MemoryStorage::new("u1");
        storage.set_user_data("nick", json!("bob")).unwrap();

        storage.clear_all().unwrap();

        assert_eq!(storage.user_id().as_str(), "u1");
        assert_eq!(storage.user_data("nick"), None);
        assert_eq!(storage.user_data("userId"), Some(json!("u1")));
    }
}
