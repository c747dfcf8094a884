//! Concurrent, order-preserving decryption of a poll result.
//!
//! Messages are split into fixed-size batches. Within a batch every decrypt
//! request runs concurrently; batches run one after another. Each position
//! in the input yields exactly one outcome at the same position in the
//! output, regardless of the order in which requests complete.

use std::time::Duration;

use futures::future::join_all;
use k9crypt_client::{ChatService, ClientError};
use k9crypt_core::{Message, MessageId, RawMessage};

use crate::{SessionConfig, error::DecryptError};

/// Result for one input position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// Decrypted successfully.
    Decrypted(Message),
    /// Already displayed; no request was made.
    AlreadySeen,
    /// The request failed or timed out.
    Failed(DecryptError),
}

impl DecryptOutcome {
    /// The decrypted message, if any.
    pub fn into_message(self) -> Option<Message> {
        match self {
            Self::Decrypted(message) => Some(message),
            Self::AlreadySeen | Self::Failed(_) => None,
        }
    }
}

/// Batched decrypt fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptionPipeline {
    batch_size: usize,
    request_timeout: Duration,
}

impl DecryptionPipeline {
    /// Pipeline issuing at most `batch_size` concurrent requests.
    pub fn new(batch_size: usize, request_timeout: Duration) -> Self {
        Self { batch_size: batch_size.max(1), request_timeout }
    }

    /// Pipeline using the session's batch size and request timeout.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.decrypt_batch_size, config.request_timeout)
    }

    /// Maximum concurrent decrypt requests.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Decrypt `messages`, skipping ids for which `seen` returns true.
    ///
    /// The returned vector has one outcome per input message, in input
    /// order. A failing request never affects its siblings.
    pub async fn decrypt_batch<S, F>(
        &self,
        service: &S,
        messages: Vec<RawMessage>,
        seen: F,
    ) -> Vec<DecryptOutcome>
    where
        S: ChatService,
        F: Fn(&MessageId) -> bool,
    {
        let mut outcomes = Vec::with_capacity(messages.len());
        let mut remaining = messages.into_iter().peekable();

        while remaining.peek().is_some() {
            let batch = remaining.by_ref().take(self.batch_size).map(|raw| {
                let already_seen = seen(&raw.id);
                self.decrypt_one(service, raw, already_seen)
            });
            outcomes.extend(join_all(batch).await);
        }

        outcomes
    }

    async fn decrypt_one<S: ChatService>(
        &self,
        service: &S,
        raw: RawMessage,
        already_seen: bool,
    ) -> DecryptOutcome {
        if already_seen {
            return DecryptOutcome::AlreadySeen;
        }

        let result = tokio::time::timeout(self.request_timeout, service.decrypt(&raw.ciphertext))
            .await
            .unwrap_or(Err(ClientError::Timeout));

        match result {
            Ok(plaintext) => DecryptOutcome::Decrypted(Message::decrypted(raw, plaintext)),
            Err(source) => {
                tracing::debug!(message_id = %raw.id, error = %source, "decrypt failed");
                DecryptOutcome::Failed(DecryptError { message_id: raw.id, source })
            },
        }
    }
}
