//! Binary-level errors.

use std::io;

use k9crypt_app::{RuntimeError, SessionError};
use k9crypt_client::ClientError;
use k9crypt_core::ConfigError;
use k9crypt_store::StorageError;
use thiserror::Error;

use crate::TerminalError;

/// Message shown when a command needs a room and none is known.
pub const NO_ROOM: &str = "Please provide a room ID or join a room first.";

/// Any failure of a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// No room id given and no active room stored.
    #[error("{NO_ROOM}")]
    NoRoom,

    /// The service call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Reading or writing the local store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Settings or flags rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The chat session could not start.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Terminal setup failed.
    #[error(transparent)]
    Terminal(#[from] TerminalError),

    /// The chat session failed while running.
    #[error(transparent)]
    Runtime(#[from] RuntimeError<TerminalError>),

    /// Writing command output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
