//! JSON file backend.
//!
//! Three files in the data directory, each a pretty-printed JSON object:
//! `user.json`, `rooms.json` and `settings.json`. Everything is loaded on
//! open and kept in memory; each mutation rewrites the one file it touched.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use k9crypt_core::{Environment, RoomId, UserId};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    RoomRecord, Storage, StorageError,
    records::{Records, Section, UserFile},
};

/// Directory name under the home directory.
pub const DEFAULT_DIR_NAME: &str = ".k9crypt";

const USER_FILE: &str = "user.json";
const ROOMS_FILE: &str = "rooms.json";
const SETTINGS_FILE: &str = "settings.json";

/// Length of a freshly generated user id.
const USER_ID_LEN: usize = 8;

/// `~/.k9crypt`.
pub fn default_data_dir() -> Result<PathBuf, StorageError> {
    dirs::home_dir().map(|home| home.join(DEFAULT_DIR_NAME)).ok_or(StorageError::NoHomeDir)
}

/// Write-through JSON file storage.
///
/// Clone is cheap; clones share one in-memory copy and one directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    inner: Arc<Mutex<FileInner>>,
}

#[derive(Debug)]
struct FileInner {
    dir: PathBuf,
    records: Records,
}

impl FileStorage {
    /// Open (creating if needed) the store in `dir`.
    ///
    /// Missing or unreadable files start empty. A user id is generated from
    /// `env` and saved if none exists yet.
    pub fn open(dir: impl Into<PathBuf>, env: &impl Environment) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let user: UserFile = load(&dir.join(USER_FILE));
        let rooms: BTreeMap<RoomId, RoomRecord> = load(&dir.join(ROOMS_FILE));
        let settings: BTreeMap<String, Value> = load(&dir.join(SETTINGS_FILE));

        let generated = user.user_id.is_none();
        let user_id = user.user_id.unwrap_or_else(|| UserId::new(env.random_base36(USER_ID_LEN)));

        let mut records = Records::new(user_id);
        records.user_extra = user.extra;
        records.rooms = rooms;
        records.settings = settings;

        if generated {
            persist(&dir, &records, Section::User)?;
            tracing::info!(user_id = %records.user_id, "generated new user id");
        }

        Ok(Self { inner: Arc::new(Mutex::new(FileInner { dir, records })) })
    }

    /// Directory holding the record files.
    pub fn dir(&self) -> PathBuf {
        self.lock().dir.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FileInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to a copy and keep it only once the touched file is written,
    /// so a failed write leaves memory matching disk.
    fn mutate(&self, f: impl FnOnce(&mut Records) -> Section) -> Result<(), StorageError> {
        let mut inner = self.lock();
        let mut records = inner.records.clone();
        let section = f(&mut records);
        persist(&inner.dir, &records, section)?;
        inner.records = records;
        Ok(())
    }
}

fn persist(dir: &Path, records: &Records, section: Section) -> Result<(), StorageError> {
    let (name, json) = match section {
        Section::User => (USER_FILE, serde_json::to_string_pretty(&records.user_file())?),
        Section::Rooms => (ROOMS_FILE, serde_json::to_string_pretty(&records.rooms)?),
        Section::Settings => (SETTINGS_FILE, serde_json::to_string_pretty(&records.settings)?),
    };

    let path = dir.join(name);
    fs::write(&path, json).map_err(|e| StorageError::io(&path, e))
}

/// Read one record file, falling back to empty on any problem.
fn load<T: DeserializeOwned + Default>(path: &Path) -> T {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read store file, starting empty");
            return T::default();
        },
    };

    serde_json::from_str(&text).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "corrupt store file, starting empty");
        T::default()
    })
}

impl Storage for FileStorage {
    fn user_id(&self) -> UserId {
        self.lock().records.user_id.clone()
    }

    fn user_data(&self, key: &str) -> Option<Value> {
        self.lock().records.user_data(key)
    }

    fn set_user_data(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.mutate(|records| records.set_user_data(key, value))
    }

    fn room(&self, room_id: &RoomId) -> Option<RoomRecord> {
        self.lock().records.rooms.get(room_id).cloned()
    }

    fn rooms(&self) -> BTreeMap<RoomId, RoomRecord> {
        self.lock().records.rooms.clone()
    }

    fn put_room(&self, room_id: &RoomId, record: RoomRecord) -> Result<(), StorageError> {
        self.mutate(|records| records.put_room(room_id, record))
    }

    fn setting(&self, key: &str) -> Option<Value> {
        self.lock().records.settings.get(key).cloned()
    }

    fn set_setting(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.mutate(|records| records.set_setting(key, value))
    }

    fn settings(&self) -> BTreeMap<String, Value> {
        self.lock().records.settings.clone()
    }

    fn clear_rooms(&self) -> Result<(), StorageError> {
        self.mutate(|records| records.clear(Section::Rooms))
    }

    fn clear_user(&self) -> Result<(), StorageError> {
        self.mutate(|records| records.clear(Section::User))
    }

    fn clear_settings(&self) -> Result<(), StorageError> {
        self.mutate(|records| records.clear(Section::Settings))
    }
}
