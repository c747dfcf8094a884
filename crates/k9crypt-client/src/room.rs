//! Room lifecycle request and response bodies.

use std::{fmt, str::FromStr};

use k9crypt_core::{RoomId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Room visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    /// Listed and joinable without a password.
    Public,
    /// Password protected.
    Private,
}

impl RoomKind {
    /// Parse a user-supplied type. Anything but `public` is private.
    pub fn parse_lenient(value: &str) -> Self {
        if value.eq_ignore_ascii_case("public") { Self::Public } else { Self::Private }
    }

    /// Capitalized label for listings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
        }
    }
}

/// How long the service keeps a room before deleting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomLifetime {
    /// 24 hours.
    #[default]
    Day,
    /// 30 days.
    Month,
    /// 365 days.
    Year,
    /// Never expires.
    Permanent,
}

impl RoomLifetime {
    /// Wire value in milliseconds. `-1` means permanent.
    pub fn as_millis(self) -> i64 {
        match self {
            Self::Day => DAY_MS,
            Self::Month => 30 * DAY_MS,
            Self::Year => 365 * DAY_MS,
            Self::Permanent => -1,
        }
    }
}

impl FromStr for RoomLifetime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "permanent" => Ok(Self::Permanent),
            other => Err(format!("unknown lifetime {other:?}, expected day, month, year or permanent")),
        }
    }
}

impl fmt::Display for RoomLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
            Self::Permanent => "permanent",
        };
        f.write_str(name)
    }
}

/// Body of `POST /room/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Creator.
    pub user_id: UserId,
    /// Visibility.
    #[serde(rename = "type")]
    pub kind: RoomKind,
    /// Join password, private rooms only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Display name.
    pub room_name: String,
    /// Retention, serialized as milliseconds.
    #[serde(serialize_with = "serialize_lifetime")]
    pub lifetime: RoomLifetime,
}

fn serialize_lifetime<S: serde::Serializer>(
    lifetime: &RoomLifetime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(lifetime.as_millis())
}

/// Response of `POST /room/create`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRoom {
    /// Id of the new room.
    pub room_id: RoomId,
    /// Deletion time; absent for permanent rooms.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

/// One entry of `GET /room/list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// Room id.
    pub id: RoomId,
    /// Display name.
    #[serde(default)]
    pub room_name: String,
    /// Visibility.
    #[serde(rename = "type", deserialize_with = "deserialize_kind")]
    pub kind: RoomKind,
    /// Members currently in the room.
    #[serde(default)]
    pub user_count: u64,
    /// Deletion time; absent for permanent rooms.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

fn deserialize_kind<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<RoomKind, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(RoomKind::parse_lenient(&raw))
}

/// Acknowledgement body of join, leave and send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ack {
    /// Human-readable confirmation, if the service sent one.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoomList {
    #[serde(default)]
    pub rooms: Vec<RoomSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetimes_map_to_millis() {
        assert_eq!(RoomLifetime::Day.as_millis(), 86_400_000);
        assert_eq!(RoomLifetime::Month.as_millis(), 2_592_000_000);
        assert_eq!(RoomLifetime::Year.as_millis(), 31_536_000_000);
        assert_eq!(RoomLifetime::Permanent.as_millis(), -1);
    }

    #[test]
    fn lifetime_parses_case_insensitively() {
        assert_eq!("Month".parse::<RoomLifetime>(), Ok(RoomLifetime::Month));
        assert!("week".parse::<RoomLifetime>().is_err());
    }

    #[test]
    fn unknown_kind_is_private() {
        assert_eq!(RoomKind::parse_lenient("public"), RoomKind::Public);
        assert_eq!(RoomKind::parse_lenient("secret"), RoomKind::Private);
    }

    #[test]
    fn create_request_serializes_wire_names() {
        let request = CreateRoomRequest {
            user_id: "u1".into(),
            kind: RoomKind::Public,
            password: None,
            room_name: "lobby".into(),
            lifetime: RoomLifetime::Permanent,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "userId": "u1",
                "type": "public",
                "roomName": "lobby",
                "lifetime": -1,
            })
        );
    }

    #[test]
    fn room_summary_tolerates_missing_fields() {
        let room: RoomSummary =
            serde_json::from_str(r#"{"id": "r1", "type": "weird"}"#).unwrap();
        assert_eq!(room.kind, RoomKind::Private);
        assert_eq!(room.user_count, 0);
        assert!(room.expires_at.is_none());
    }
}
