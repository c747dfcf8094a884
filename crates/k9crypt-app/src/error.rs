//! Session and runtime errors.

use k9crypt_client::ClientError;
use k9crypt_core::{ConfigError, MessageId, RoomId};
use thiserror::Error;

/// Failure to start a chat session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The local store has no active membership for the room.
    #[error("You must join the room before starting the chat. (room {room_id})")]
    NotJoined {
        /// Room the session was started for.
        room_id: RoomId,
    },

    /// Session configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A single message that could not be decrypted.
///
/// Isolated to its message: siblings in the same poll are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("message {message_id}: {source}")]
pub struct DecryptError {
    /// Message that failed.
    pub message_id: MessageId,
    /// Why the decrypt call failed.
    #[source]
    pub source: ClientError,
}

/// Fatal error while running a session.
#[derive(Error, Debug)]
pub enum RuntimeError<E>
where
    E: std::error::Error + 'static,
{
    /// Terminal or other driver I/O failed.
    #[error("driver failed: {0}")]
    Driver(#[source] E),
}
