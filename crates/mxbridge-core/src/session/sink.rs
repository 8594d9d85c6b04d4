//! Event sinks for inbound messages.
//!
//! The sync loop hands every inbound text message to each registered
//! [`EventSink`]. `LogSink` writes one log line per message; `BroadcastSink`
//! fans events out over a `tokio::sync::broadcast` channel so other tasks
//! (and tests) can observe them. Plain closures are sinks too.

use mxbridge_types::event::InboundEvent;
use tokio::sync::broadcast;

/// Receiver of inbound events.
///
/// `deliver` is synchronous and infallible: it runs inside the sync loop
/// after the sync token has been advanced, so it must not block.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &InboundEvent);
}

impl<F> EventSink for F
where
    F: Fn(&InboundEvent) + Send + Sync,
{
    fn deliver(&self, event: &InboundEvent) {
        self(event)
    }
}

/// Tracing target of the lines written by [`LogSink`].
///
/// The default log filter enables this target at info so inbound messages
/// show up without `-v`.
pub const MESSAGE_LOG_TARGET: &str = "mxbridge::messages";

/// Logs each message at info level under [`MESSAGE_LOG_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn deliver(&self, event: &InboundEvent) {
        tracing::info!(
            target: MESSAGE_LOG_TARGET,
            room_id = %event.room_id,
            sender = %event.sender,
            event_id = %event.event_id,
            "Message in {}: {}",
            event.display_room(),
            event.body
        );
    }
}

/// Multi-consumer sink built on a broadcast channel.
///
/// Cloning the sink clones the sender. Publishing with no active
/// subscribers is a no-op.
#[derive(Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<InboundEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn deliver(&self, event: &InboundEvent) {
        let _ = self.sender.send(event.clone());
    }
}

impl std::fmt::Debug for BroadcastSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastSink")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn sample_event(body: &str) -> InboundEvent {
        InboundEvent {
            room_id: "!room:example.org".to_string(),
            room_name: None,
            sender: "@alice:example.org".to_string(),
            event_id: "$evt".to_string(),
            body: body.to_string(),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn broadcast_sink_delivers_to_every_subscriber() {
        let sink = BroadcastSink::new(16);
        let mut rx1 = sink.subscribe();
        let mut rx2 = sink.subscribe();

        sink.deliver(&sample_event("hello"));

        assert_eq!(rx1.recv().await.unwrap().body, "hello");
        assert_eq!(rx2.recv().await.unwrap().body, "hello");
    }

    #[test]
    fn broadcast_sink_without_subscribers_does_not_panic() {
        let sink = BroadcastSink::new(4);
        sink.deliver(&sample_event("dropped"));
        sink.deliver(&sample_event("dropped again"));
    }

    #[test]
    fn closure_is_a_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_sink = Arc::clone(&seen);
        let sink = move |event: &InboundEvent| {
            seen_in_sink.lock().unwrap().push(event.body.clone());
        };

        sink.deliver(&sample_event("one"));
        sink.deliver(&sample_event("two"));

        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn log_sink_accepts_events() {
        LogSink.deliver(&sample_event("logged"));
    }

    #[test]
    fn debug_impl() {
        let sink = BroadcastSink::new(4);
        let _rx = sink.subscribe();
        let debug = format!("{sink:?}");
        assert!(debug.contains("BroadcastSink"));
        assert!(debug.contains("receiver_count"));
    }
}
