//! Client
//!
//! Request/response access to the k9crypt service: the four calls the chat
//! session depends on (fetch, decrypt, send, leave) behind the
//! [`ChatService`] trait, plus the one-shot room lifecycle calls used by the
//! command line (create, join, list).
//!
//! # Components
//!
//! - [`ChatService`]: collaborator contract consumed by the session engine
//! - [`ApiClient`]: JSON-over-HTTP implementation backed by `reqwest`
//! - [`ClientError`]: transport, timeout, server and decode failures

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod config;
mod error;
mod room;
mod service;

pub use api::ApiClient;
pub use config::{ClientConfig, DEFAULT_API_URL};
pub use error::ClientError;
pub use k9crypt_core::{MessageId, RawMessage, RoomId, UserId};
pub use room::{Ack, CreateRoomRequest, CreatedRoom, RoomKind, RoomLifetime, RoomSummary};
pub use service::ChatService;
