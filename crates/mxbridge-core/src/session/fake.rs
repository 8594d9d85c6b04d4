//! In-memory `ChatClient` used by the session tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::SecretString;

use mxbridge_types::error::ChatError;
use mxbridge_types::event::SyncBatch;
use mxbridge_types::room::{JoinedRoom, RoomRef, SentMessage};
use mxbridge_types::session::SessionInfo;

use crate::chat::client::ChatClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Login(String),
    Join(String),
    Send(String, String),
    Sync(Option<String>),
}

#[derive(Default)]
struct FakeState {
    calls: Mutex<Vec<Call>>,
    syncs: Mutex<VecDeque<Result<SyncBatch, ChatError>>>,
    forbidden: HashSet<String>,
    reject_login: bool,
    sync_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Records every call; clones share the same record.
///
/// Scripted sync results are returned in order; once they run out, `sync`
/// pends forever (like a long-poll with nothing to report).
#[derive(Clone, Default)]
pub(crate) struct FakeClient {
    state: Arc<FakeState>,
    logged_in: bool,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn rejecting_login(self) -> Self {
        self.configure(|state| state.reject_login = true)
    }

    pub(crate) fn forbidding_room(self, room: &str) -> Self {
        let room = room.to_string();
        self.configure(move |state| {
            state.forbidden.insert(room);
        })
    }

    /// Make every scripted sync take `delay` to answer.
    pub(crate) fn with_sync_delay(self, delay: Duration) -> Self {
        self.configure(|state| state.sync_delay = Some(delay))
    }

    fn configure(mut self, f: impl FnOnce(&mut FakeState)) -> Self {
        let state = Arc::get_mut(&mut self.state).expect("configure before cloning");
        f(state);
        self
    }

    pub(crate) fn push_sync(&self, result: Result<SyncBatch, ChatError>) {
        self.state.syncs.lock().unwrap().push_back(result);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub(crate) fn sends(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send(room, body) => Some((room, body)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn sync_count(&self) -> usize {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Sync(_)))
            .count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.state.calls.lock().unwrap().push(call);
    }
}

impl ChatClient for FakeClient {
    fn homeserver(&self) -> &str {
        "https://matrix.example.org"
    }

    async fn login(
        &mut self,
        username: &str,
        _password: &SecretString,
    ) -> Result<SessionInfo, ChatError> {
        self.record(Call::Login(username.to_string()));
        if self.state.reject_login {
            return Err(ChatError::Authentication("M_FORBIDDEN: Invalid password".to_string()));
        }
        self.logged_in = true;
        Ok(SessionInfo {
            user_id: format!("@{username}:example.org"),
            device_id: Some("FAKEDEVICE".to_string()),
        })
    }

    async fn join_room(&self, room: &RoomRef) -> Result<JoinedRoom, ChatError> {
        self.record(Call::Join(room.to_string()));
        if !self.logged_in {
            return Err(ChatError::NotConnected);
        }
        if self.state.forbidden.contains(room.as_str()) {
            return Err(ChatError::RoomJoin {
                room: room.to_string(),
                reason: "M_FORBIDDEN: You are not invited to this room.".to_string(),
            });
        }
        Ok(JoinedRoom {
            room_id: room.to_string(),
        })
    }

    async fn send_text(&self, room: &RoomRef, body: &str) -> Result<SentMessage, ChatError> {
        self.record(Call::Send(room.to_string(), body.to_string()));
        if !self.logged_in {
            return Err(ChatError::NotConnected);
        }

        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        let count = self.sends().len();
        Ok(SentMessage {
            room_id: room.to_string(),
            event_id: format!("$event{count}"),
        })
    }

    async fn sync(&self, since: Option<&str>, _timeout: Duration) -> Result<SyncBatch, ChatError> {
        self.record(Call::Sync(since.map(str::to_string)));
        let next = self.state.syncs.lock().unwrap().pop_front();
        match next {
            Some(result) => {
                if let Some(delay) = self.state.sync_delay {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => std::future::pending().await,
        }
    }
}
