//! Message and identifier types.
//!
//! [`RawMessage`] is exactly what the service returns from a fetch: an
//! opaque ciphertext plus routing metadata. [`Message`] is the immutable,
//! decrypted form that the display and dedup cache hold.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender id reserved for messages generated by the service itself.
pub const SYSTEM_SENDER: &str = "System";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $(#[$meta])*
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id! {
    /// Server-assigned room identifier.
    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    RoomId
}

string_id! {
    /// Locally generated user identifier, sent as `userId`.
    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    UserId
}

string_id! {
    /// Server-assigned message identifier.
    ///
    /// Opaque: ordering between ids is defined by the order the service
    /// returns them, never by comparing the ids. Accepts JSON strings or
    /// integers on the wire and always serializes as a string.
    #[derive(Serialize, Deserialize)]
    #[serde(from = "WireId", into = "String")]
    MessageId
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Integer(i64),
}

impl From<WireId> for MessageId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(text) => Self(text),
            WireId::Integer(n) => Self(n.to_string()),
        }
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

/// Server-assigned point in time.
///
/// Accepts RFC 3339 strings, offset-less ISO date-times (read as UTC) and
/// epoch milliseconds, integral or not, on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireTimestamp", into = "WireTimestamp")]
pub struct Timestamp(DateTime<Utc>);

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Millis(i64),
    FractionalMillis(f64),
    Text(String),
}

/// Offset-less layouts tried after RFC 3339.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

impl TryFrom<WireTimestamp> for Timestamp {
    type Error = String;

    fn try_from(value: WireTimestamp) -> Result<Self, Self::Error> {
        match value {
            WireTimestamp::Millis(ms) => {
                Self::from_millis(ms).ok_or_else(|| format!("timestamp out of range: {ms}"))
            },
            WireTimestamp::FractionalMillis(ms) if ms.is_finite() => Self::from_millis(ms.trunc() as i64)
                .ok_or_else(|| format!("timestamp out of range: {ms}")),
            WireTimestamp::FractionalMillis(ms) => Err(format!("invalid timestamp: {ms}")),
            WireTimestamp::Text(text) => Self::parse(&text),
        }
    }
}

impl From<Timestamp> for WireTimestamp {
    fn from(ts: Timestamp) -> Self {
        Self::Text(ts.0.to_rfc3339())
    }
}

impl Timestamp {
    /// Parse RFC 3339, falling back to an offset-less date-time taken as UTC.
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .map(|naive| Self(naive.and_utc()))
            .ok_or_else(|| format!("invalid timestamp {text:?}"))
    }

    /// Timestamp from epoch milliseconds. `None` if out of range.
    pub fn from_millis(ms: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(ms).map(Self)
    }

    /// Underlying UTC date-time.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Wall-clock time in the local timezone, `HH:MM:SS`.
    pub fn local_time(&self) -> String {
        self.0.with_timezone(&Local).format("%H:%M:%S").to_string()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

/// A message exactly as returned by the fetch endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Server-assigned id, unique within the room.
    pub id: MessageId,
    /// Origin of the message.
    #[serde(rename = "userId")]
    pub sender_id: UserId,
    /// Server-assigned time.
    pub timestamp: Timestamp,
    /// Encrypted payload, opaque to the client.
    #[serde(rename = "message")]
    pub ciphertext: String,
}

/// One fetch worth of messages.
///
/// Entries the client could not decode are left out of `messages`, but the
/// id of the last entry the service returned is kept so the cursor can move
/// past them. Whenever `messages` is non-empty, `last_id` is `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    /// Decodable messages, in server order.
    pub messages: Vec<RawMessage>,
    /// Id of the last entry returned, decodable or not.
    pub last_id: Option<MessageId>,
}

impl MessagePage {
    /// True when the service returned nothing at all.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.last_id.is_none()
    }

    /// Number of decodable messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

impl From<Vec<RawMessage>> for MessagePage {
    fn from(messages: Vec<RawMessage>) -> Self {
        let last_id = messages.last().map(|message| message.id.clone());
        Self { messages, last_id }
    }
}

impl FromIterator<RawMessage> for MessagePage {
    fn from_iter<T: IntoIterator<Item = RawMessage>>(iter: T) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

/// A successfully decrypted message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned id.
    pub id: MessageId,
    /// Origin of the message.
    pub sender_id: UserId,
    /// Server-assigned time.
    pub timestamp: Timestamp,
    /// Decrypted text.
    pub plaintext: String,
}

impl Message {
    /// Combine a raw message with its decrypted text.
    pub fn decrypted(raw: RawMessage, plaintext: String) -> Self {
        Self { id: raw.id, sender_id: raw.sender_id, timestamp: raw.timestamp, plaintext }
    }

    /// Whether the service generated this message.
    pub fn is_system(&self) -> bool {
        self.sender_id.as_str() == SYSTEM_SENDER
    }
}
