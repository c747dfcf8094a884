//! Remote collaborator contract for the chat session.

use std::future::Future;

use k9crypt_core::{MessageId, MessagePage, RoomId, UserId};

use crate::{Ack, ClientError};

/// The four remote calls a chat session depends on.
///
/// Every call is an independent request/response exchange; implementations
/// hold no per-session state. Production uses [`crate::ApiClient`], tests use
/// the simulated service in `k9crypt-harness`.
pub trait ChatService: Clone + Send + Sync + 'static {
    /// Messages of `room_id` strictly after `after`, in server order.
    ///
    /// `None` fetches the most recent page. An empty page means no news.
    /// Entries that cannot be decoded are dropped from the page but still
    /// count towards its `last_id`.
    fn fetch_messages(
        &self,
        room_id: &RoomId,
        after: Option<&MessageId>,
    ) -> impl Future<Output = Result<MessagePage, ClientError>> + Send;

    /// Turn a ciphertext into plaintext.
    fn decrypt(&self, ciphertext: &str) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Post `text` to `room_id` as `sender_id`.
    fn send_message(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
        text: &str,
    ) -> impl Future<Output = Result<Ack, ClientError>> + Send;

    /// Drop `sender_id`'s membership in `room_id`.
    fn leave_room(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
    ) -> impl Future<Output = Result<Ack, ClientError>> + Send;
}
