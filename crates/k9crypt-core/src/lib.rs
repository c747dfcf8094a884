//! Core types for k9crypt
//!
//! Pure building blocks shared by every other crate in the workspace. Nothing
//! in here performs I/O: the session engine in `k9crypt-app` composes these
//! pieces and the runtime supplies the network and terminal.
//!
//! # Components
//!
//! - [`RawMessage`] / [`Message`]: wire and decrypted forms of a chat message
//! - [`MessagePage`]: one fetch, with the cursor past any undecodable entries
//! - [`BackoffPolicy`]: adaptive poll interval computation
//! - [`DedupCache`]: bounded FIFO cache of already-displayed messages
//! - [`Environment`]: time and randomness abstraction for deterministic tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backoff;
pub mod dedup;
pub mod env;
pub mod error;
pub mod message;

pub use backoff::{BackoffConfig, BackoffPolicy};
pub use dedup::DedupCache;
pub use env::Environment;
pub use error::ConfigError;
pub use message::{
    Message, MessageId, MessagePage, RawMessage, RoomId, SYSTEM_SENDER, Timestamp, UserId,
};
