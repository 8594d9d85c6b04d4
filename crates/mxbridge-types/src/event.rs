//! Inbound events surfaced by the sync loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A text message received in a joined room.
///
/// Transient: handed to event sinks and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub room_id: String,
    /// Display name of the room, when one has been seen in room state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    pub sender: String,
    pub event_id: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl InboundEvent {
    /// Name used when reporting the event: the display name if known,
    /// otherwise the room id.
    pub fn display_room(&self) -> &str {
        self.room_name.as_deref().unwrap_or(&self.room_id)
    }
}

/// One round of sync results from the adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncBatch {
    /// Token to pass as `since` on the next sync.
    pub next_batch: String,
    /// Text messages, in timeline order per room.
    pub events: Vec<InboundEvent>,
    /// `(room_id, display_name)` pairs seen in this batch.
    pub room_names: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(room_name: Option<&str>) -> InboundEvent {
        InboundEvent {
            room_id: "!abc:example.org".to_string(),
            room_name: room_name.map(str::to_string),
            sender: "@alice:example.org".to_string(),
            event_id: "$1".to_string(),
            body: "hi".to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn test_display_room_prefers_name() {
        assert_eq!(event(Some("Rust")).display_room(), "Rust");
        assert_eq!(event(None).display_room(), "!abc:example.org");
    }
}
