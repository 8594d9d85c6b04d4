//! Room references and the results of room operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to a room: a room id (`!abc:server`) or an alias
/// (`#name:server`). Not validated locally; the homeserver decides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomRef(pub String);

impl RoomRef {
    pub fn new(room: impl Into<String>) -> Self {
        Self(room.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A plain-text message addressed to a room. Exists for one request only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub room: RoomRef,
    pub body: String,
}

impl OutboundMessage {
    pub fn text(room: impl Into<RoomRef>, body: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            body: body.into(),
        }
    }
}

/// The homeserver's answer to a join: the canonical room id, even when the
/// request used an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedRoom {
    pub room_id: String,
}

/// The homeserver's answer to a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub room_id: String,
    pub event_id: String,
}
