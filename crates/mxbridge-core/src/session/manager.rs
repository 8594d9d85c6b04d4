//! Session manager owning the single authenticated chat session.
//!
//! `SessionManager` wraps a [`ChatClient`] and tracks the one-way
//! `Disconnected -> Connected` lifecycle, the sync token, and a cache of room
//! display names. Inbound text messages are fanned out to registered
//! [`EventSink`]s.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use mxbridge_types::error::ChatError;
use mxbridge_types::event::SyncBatch;
use mxbridge_types::room::{JoinedRoom, OutboundMessage, RoomRef, SentMessage};
use mxbridge_types::session::{Credentials, SessionInfo, SessionState};

use super::backoff::Backoff;
use super::sink::EventSink;
use crate::chat::client::ChatClient;

/// Default long-poll timeout for one sync round.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the chat client and the state of the process-wide session.
///
/// Generic over `ChatClient` so tests can substitute a fake adapter
/// (mxbridge-core never depends on mxbridge-infra).
pub struct SessionManager<C: ChatClient> {
    client: C,
    state: SessionState,
    next_batch: Option<String>,
    room_names: HashMap<String, String>,
    sinks: Vec<Arc<dyn EventSink>>,
    sync_timeout: Duration,
}

impl<C: ChatClient> SessionManager<C> {
    /// Create a disconnected manager around a client bound to a homeserver.
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: SessionState::Disconnected,
            next_batch: None,
            room_names: HashMap::new(),
            sinks: Vec::new(),
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }

    /// Register a sink for inbound messages.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Override the long-poll timeout used by `sync_once`.
    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Display name of a room, if one has been seen during sync.
    pub fn room_name(&self, room_id: &str) -> Option<&str> {
        self.room_names.get(room_id).map(String::as_str)
    }

    // --- Session lifecycle ---

    /// Authenticate the client and establish the session.
    ///
    /// Calling this on an already connected session is a no-op that returns
    /// the existing session info.
    pub async fn connect(&mut self, credentials: &Credentials) -> Result<SessionInfo, ChatError> {
        if let SessionState::Connected(info) = &self.state {
            debug!(user_id = %info.user_id, "Session already connected");
            return Ok(info.clone());
        }

        info!(
            homeserver = %self.client.homeserver(),
            username = %credentials.username,
            "Logging in"
        );
        let session = self
            .client
            .login(&credentials.username, &credentials.password)
            .await?;

        info!(user_id = %session.user_id, "Session connected");
        self.state = SessionState::Connected(session.clone());
        Ok(session)
    }

    fn ensure_connected(&self) -> Result<(), ChatError> {
        if self.state.is_connected() {
            Ok(())
        } else {
            Err(ChatError::NotConnected)
        }
    }

    // --- Room operations ---

    /// Join a room by id or alias.
    pub async fn join_room(&self, room: &RoomRef) -> Result<JoinedRoom, ChatError> {
        self.ensure_connected()?;
        let joined = self.client.join_room(room).await?;
        info!(room = %room, room_id = %joined.room_id, "Joined room");
        Ok(joined)
    }

    /// Send a plain-text message.
    pub async fn send_message(&self, message: &OutboundMessage) -> Result<SentMessage, ChatError> {
        self.ensure_connected()?;
        let sent = self.client.send_text(&message.room, &message.body).await?;
        debug!(room_id = %sent.room_id, event_id = %sent.event_id, "Message sent");
        Ok(sent)
    }

    // --- Event stream ---

    /// Run one sync round and deliver new text messages to every sink.
    ///
    /// The first round of a session only primes the sync token and room
    /// names; its timeline (backlog) is not delivered. State is updated only
    /// once the adapter returns a complete batch, so dropping this future
    /// mid-flight loses nothing. Returns the number of delivered messages.
    pub async fn sync_once(&mut self) -> Result<usize, ChatError> {
        let batch = self.fetch_sync().await?;
        Ok(self.apply_sync(batch))
    }

    /// Long-poll the next batch after the current sync token.
    ///
    /// Takes `&self` and leaves session state untouched, so the request can
    /// stay in flight while other operations use the session.
    pub async fn fetch_sync(&self) -> Result<SyncBatch, ChatError> {
        self.ensure_connected()?;
        self.client
            .sync(self.next_batch.as_deref(), self.sync_timeout)
            .await
    }

    /// Advance the sync token and deliver a fetched batch to the sinks.
    ///
    /// Events keep the room name they were sent under; renames in the batch
    /// only apply to the cache afterwards.
    pub fn apply_sync(&mut self, batch: SyncBatch) -> usize {
        let initial = self.next_batch.is_none();
        self.next_batch = Some(batch.next_batch);

        if initial {
            self.room_names.extend(batch.room_names);
            debug!(
                rooms = self.room_names.len(),
                skipped = batch.events.len(),
                "Initial sync complete"
            );
            return 0;
        }

        let mut delivered = 0;
        for mut event in batch.events {
            if event.room_name.is_none() {
                event.room_name = self.room_names.get(&event.room_id).cloned();
            }
            for sink in &self.sinks {
                sink.deliver(&event);
            }
            delivered += 1;
        }
        self.room_names.extend(batch.room_names);
        delivered
    }

    /// Sync forever, delivering inbound messages to the sinks.
    ///
    /// For embedders that drive a manager directly. Inside the gateway the
    /// session worker runs the same rounds (`fetch_sync` then `apply_sync`)
    /// so commands can be served while a long-poll is pending.
    ///
    /// Sync failures are logged and retried with exponential back-off. Only
    /// returns (with `NotConnected`) when called before `connect`; otherwise
    /// runs until the future is dropped.
    pub async fn listen(&mut self) -> Result<(), ChatError> {
        self.ensure_connected()?;
        info!(sinks = self.sinks.len(), "Listening for messages");

        let mut backoff = Backoff::default();
        loop {
            match self.sync_once().await {
                Ok(delivered) => {
                    backoff.reset();
                    if delivered > 0 {
                        debug!(delivered, "Delivered inbound messages");
                    }
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "Sync failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
