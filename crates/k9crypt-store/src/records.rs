//! In-memory record set shared by both storage backends.

use std::collections::BTreeMap;

use k9crypt_core::{RoomId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RoomRecord;

/// Key of the user id inside `user.json`.
pub(crate) const USER_ID_KEY: &str = "userId";

/// On-disk shape of `user.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct UserFile {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Which file a mutation dirtied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    User,
    Rooms,
    Settings,
}

#[derive(Debug, Clone)]
pub(crate) struct Records {
    pub user_id: UserId,
    pub user_extra: BTreeMap<String, Value>,
    pub rooms: BTreeMap<RoomId, RoomRecord>,
    pub settings: BTreeMap<String, Value>,
}

impl Records {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            user_extra: BTreeMap::new(),
            rooms: BTreeMap::new(),
            settings: BTreeMap::new(),
        }
    }

    pub fn user_file(&self) -> UserFile {
        UserFile { user_id: Some(self.user_id.clone()), extra: self.user_extra.clone() }
    }

    pub fn user_data(&self, key: &str) -> Option<Value> {
        if key == USER_ID_KEY {
            return Some(Value::String(self.user_id.to_string()));
        }
        self.user_extra.get(key).cloned()
    }

    /// The user id is fixed once generated; writes to its key are ignored.
    pub fn set_user_data(&mut self, key: &str, value: Value) -> Section {
        if key == USER_ID_KEY {
            tracing::warn!("ignoring write to reserved user field {USER_ID_KEY}");
        } else {
            self.user_extra.insert(key.to_owned(), value);
        }
        Section::User
    }

    pub fn put_room(&mut self, room_id: &RoomId, record: RoomRecord) -> Section {
        self.rooms.insert(room_id.clone(), record);
        Section::Rooms
    }

    pub fn set_setting(&mut self, key: &str, value: Value) -> Section {
        self.settings.insert(key.to_owned(), value);
        Section::Settings
    }

    pub fn clear(&mut self, section: Section) -> Section {
        match section {
            Section::User => self.user_extra.clear(),
            Section::Rooms => self.rooms.clear(),
            Section::Settings => self.settings.clear(),
        }
        section
    }
}
