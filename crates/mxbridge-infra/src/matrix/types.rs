//! Matrix client-server API wire types.
//!
//! Only the fields mxbridge reads or writes are modelled; everything else in
//! the homeserver's responses is ignored.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use mxbridge_types::event::{InboundEvent, SyncBatch};

pub const EVENT_ROOM_MESSAGE: &str = "m.room.message";
pub const EVENT_ROOM_NAME: &str = "m.room.name";
pub const MSGTYPE_TEXT: &str = "m.text";

/// `POST /login` body for password login.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub identifier: UserIdentifier<'a>,
    pub password: &'a str,
    pub initial_device_display_name: &'a str,
}

impl<'a> LoginRequest<'a> {
    pub fn password(user: &'a str, password: &'a str, device_name: &'a str) -> Self {
        Self {
            kind: "m.login.password",
            identifier: UserIdentifier {
                kind: "m.id.user",
                user,
            },
            password,
            initial_device_display_name: device_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserIdentifier<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub user: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub access_token: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinResponse {
    pub room_id: String,
}

/// `m.room.message` content with `msgtype: m.text`.
#[derive(Debug, Serialize)]
pub struct TextContent<'a> {
    pub msgtype: &'static str,
    pub body: &'a str,
}

impl<'a> TextContent<'a> {
    pub fn new(body: &'a str) -> Self {
        Self {
            msgtype: MSGTYPE_TEXT,
            body,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendResponse {
    pub event_id: String,
}

/// Standard error body (`{"errcode": "M_FORBIDDEN", "error": "..."}`).
#[derive(Debug, Deserialize)]
pub struct MatrixErrorBody {
    pub errcode: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: SyncRooms,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncRooms {
    #[serde(default)]
    pub join: BTreeMap<String, JoinedRoomSync>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinedRoomSync {
    #[serde(default)]
    pub state: EventList,
    #[serde(default)]
    pub timeline: EventList,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// A client-format room event.
#[derive(Debug, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub origin_server_ts: Option<i64>,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl RawEvent {
    fn content_str(&self, field: &str) -> Option<&str> {
        self.content.get(field).and_then(serde_json::Value::as_str)
    }

    /// Room name carried by an `m.room.name` event, if non-empty.
    fn room_name(&self) -> Option<&str> {
        if self.kind != EVENT_ROOM_NAME {
            return None;
        }
        self.content_str("name").filter(|name| !name.is_empty())
    }

    /// Body of an `m.room.message` event with `msgtype: m.text`.
    fn text_body(&self) -> Option<&str> {
        if self.kind != EVENT_ROOM_MESSAGE || self.content_str("msgtype") != Some(MSGTYPE_TEXT) {
            return None;
        }
        self.content_str("body")
    }
}

impl SyncResponse {
    /// Reduce the sync response to text messages and room names.
    ///
    /// Each message carries the room name in effect when it was sent: the
    /// name from the room state, or a rename earlier in the same timeline.
    /// Messages in rooms with no name in this response are left unnamed.
    pub fn into_batch(self) -> SyncBatch {
        let mut events = Vec::new();
        let mut room_names = Vec::new();

        for (room_id, room) in self.rooms.join {
            let mut current = None;
            for event in &room.state.events {
                if let Some(name) = event.room_name() {
                    current = Some(name.to_string());
                    room_names.push((room_id.clone(), name.to_string()));
                }
            }

            for event in &room.timeline.events {
                if let Some(name) = event.room_name() {
                    current = Some(name.to_string());
                    room_names.push((room_id.clone(), name.to_string()));
                } else if let Some(body) = event.text_body() {
                    events.push(InboundEvent {
                        room_id: room_id.clone(),
                        room_name: current.clone(),
                        sender: event.sender.clone(),
                        event_id: event.event_id.clone(),
                        body: body.to_string(),
                        timestamp: event
                            .origin_server_ts
                            .and_then(DateTime::from_timestamp_millis),
                    });
                }
            }
        }

        SyncBatch {
            next_batch: self.next_batch,
            events,
            room_names,
        }
    }
}
