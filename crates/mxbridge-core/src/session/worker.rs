//! Session worker: the one task that owns the `SessionManager`.
//!
//! Every chat operation reaches the session as a [`SessionCommand`] sent
//! over a bounded `mpsc` channel by a cloneable [`SessionHandle`]; the reply
//! comes back on a `oneshot`. The worker handles commands strictly one at a
//! time. When listening is enabled, one sync long-poll stays in flight while
//! commands are handled; only a finished batch touches session state, so the
//! sync token and room names are never updated concurrently with a command.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use mxbridge_types::error::ChatError;
use mxbridge_types::event::SyncBatch;
use mxbridge_types::room::{JoinedRoom, OutboundMessage, RoomRef, SentMessage};
use mxbridge_types::session::SessionState;

use super::backoff::Backoff;
use super::manager::SessionManager;
use crate::chat::client::ChatClient;

/// Default capacity of the command channel. Senders wait when it is full.
pub const DEFAULT_COMMAND_BUFFER: usize = 64;

/// How the worker runs.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Keep a sync long-poll running alongside commands.
    pub listen: bool,
    /// Capacity of the command channel.
    pub command_buffer: usize,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            listen: false,
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

/// Requests processed by the worker.
enum SessionCommand {
    JoinRoom {
        room: RoomRef,
        reply: oneshot::Sender<Result<JoinedRoom, ChatError>>,
    },
    SendMessage {
        message: OutboundMessage,
        reply: oneshot::Sender<Result<SentMessage, ChatError>>,
    },
    Status {
        reply: oneshot::Sender<SessionState>,
    },
    Shutdown,
}

/// Cloneable handle to the session worker.
///
/// This is what the HTTP gateway holds. Once the worker has stopped, every
/// call fails with [`ChatError::SessionClosed`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Join a room through the session.
    pub async fn join_room(&self, room: RoomRef) -> Result<JoinedRoom, ChatError> {
        self.request(|reply| SessionCommand::JoinRoom { room, reply })
            .await?
    }

    /// Send a plain-text message through the session.
    pub async fn send_message(&self, message: OutboundMessage) -> Result<SentMessage, ChatError> {
        self.request(|reply| SessionCommand::SendMessage { message, reply })
            .await?
    }

    /// Current session state.
    pub async fn status(&self) -> Result<SessionState, ChatError> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    /// Ask the worker to stop after the commands already queued.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
    }

    /// Whether the worker has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, ChatError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| ChatError::SessionClosed)?;
        response.await.map_err(|_| ChatError::SessionClosed)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

/// Spawn the worker task that owns `manager`.
///
/// The manager may be connected already (the normal bootstrap path) or not;
/// in the latter case every operation fails with `NotConnected`.
pub fn spawn_session<C: ChatClient + 'static>(
    manager: SessionManager<C>,
    options: WorkerOptions,
) -> (SessionHandle, JoinHandle<()>) {
    let (commands, receiver) = mpsc::channel(options.command_buffer.max(1));
    let worker = SessionWorker {
        manager,
        commands: receiver,
        listen: options.listen,
        backoff: Backoff::default(),
    };
    let task = tokio::spawn(worker.run());
    (SessionHandle { commands }, task)
}

struct SessionWorker<C: ChatClient> {
    manager: SessionManager<C>,
    commands: mpsc::Receiver<SessionCommand>,
    listen: bool,
    backoff: Backoff,
}

impl<C: ChatClient> SessionWorker<C> {
    async fn run(mut self) {
        info!(
            listen = self.listen,
            state = %self.manager.state(),
            "Session worker started"
        );

        // The worker never connects, so this holds for its whole life.
        if self.listen && self.manager.is_connected() {
            self.run_listening().await;
        } else {
            while let Some(command) = self.commands.recv().await {
                if !handle(&self.manager, command).await {
                    break;
                }
            }
        }

        info!("Session worker stopped");
    }

    async fn run_listening(&mut self) {
        let mut retry_at: Option<Instant> = None;
        loop {
            let fetched = {
                let manager = &self.manager;
                let sync = fetch_after(manager, retry_at);
                tokio::pin!(sync);
                loop {
                    tokio::select! {
                        biased;
                        result = &mut sync => break result,
                        command = self.commands.recv() => match command {
                            Some(command) => {
                                if !handle(manager, command).await {
                                    return;
                                }
                            }
                            None => return,
                        },
                    }
                }
            };

            match fetched {
                Ok(batch) => {
                    retry_at = None;
                    self.backoff.reset();
                    let delivered = self.manager.apply_sync(batch);
                    if delivered > 0 {
                        debug!(delivered, "Delivered inbound messages");
                    }
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "Sync failed, retrying");
                    retry_at = Some(Instant::now() + delay);
                }
            }
        }
    }
}

/// Handle one command. Returns `false` once the worker should stop.
async fn handle<C: ChatClient>(manager: &SessionManager<C>, command: SessionCommand) -> bool {
    match command {
        SessionCommand::JoinRoom { room, reply } => {
            let result = manager.join_room(&room).await;
            if let Err(e) = &result {
                warn!(room = %room, error = %e, "Join failed");
            }
            let _ = reply.send(result);
        }
        SessionCommand::SendMessage { message, reply } => {
            let result = manager.send_message(&message).await;
            if let Err(e) = &result {
                warn!(room = %message.room, error = %e, "Send failed");
            }
            let _ = reply.send(result);
        }
        SessionCommand::Status { reply } => {
            let _ = reply.send(manager.state().clone());
        }
        SessionCommand::Shutdown => return false,
    }
    true
}

async fn fetch_after<C: ChatClient>(
    manager: &SessionManager<C>,
    retry_at: Option<Instant>,
) -> Result<SyncBatch, ChatError> {
    if let Some(at) = retry_at {
        tokio::time::sleep_until(at).await;
    }
    manager.fetch_sync().await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::fake::FakeClient;
    use crate::session::sink::BroadcastSink;
    use mxbridge_types::event::InboundEvent;
    use mxbridge_types::session::Credentials;

    async fn connected(client: FakeClient) -> SessionManager<FakeClient> {
        let mut manager = SessionManager::new(client);
        manager
            .connect(&Credentials::new("bridge", "secret"))
            .await
            .unwrap();
        manager
    }

    #[tokio::test]
    async fn handle_send_reaches_client_once() {
        let client = FakeClient::new();
        let (handle, _task) = spawn_session(connected(client.clone()).await, WorkerOptions::default());

        let sent = handle
            .send_message(OutboundMessage::text("!a:example.org", "ping"))
            .await
            .unwrap();

        assert_eq!(sent.room_id, "!a:example.org");
        assert_eq!(
            client.sends(),
            vec![("!a:example.org".to_string(), "ping".to_string())]
        );
    }

    #[tokio::test]
    async fn handle_status_reports_connection() {
        let (handle, _task) = spawn_session(connected(FakeClient::new()).await, WorkerOptions::default());
        assert!(handle.status().await.unwrap().is_connected());

        let (handle, _task) =
            spawn_session(SessionManager::new(FakeClient::new()), WorkerOptions::default());
        assert_eq!(handle.status().await.unwrap(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn requests_before_connect_fail_safely() {
        let client = FakeClient::new();
        let (handle, task) =
            spawn_session(SessionManager::new(client.clone()), WorkerOptions::default());

        let err = handle
            .send_message(OutboundMessage::text("!a:example.org", "too early"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotConnected));

        let err = handle
            .join_room(RoomRef::from("!a:example.org"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotConnected));

        // The worker is still alive after the failures.
        assert!(!task.is_finished());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn concurrent_requests_are_serialized() {
        let client = FakeClient::new();
        let (handle, _task) = spawn_session(connected(client.clone()).await, WorkerOptions::default());

        let mut tasks = Vec::new();
        for i in 0..16 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .send_message(OutboundMessage::text("!a:example.org", format!("msg {i}")))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(client.sends().len(), 16);
        assert_eq!(client.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn shutdown_closes_the_session() {
        let (handle, task) = spawn_session(connected(FakeClient::new()).await, WorkerOptions::default());

        handle.shutdown().await;
        task.await.unwrap();

        assert!(handle.is_closed());
        let err = handle
            .join_room(RoomRef::from("!a:example.org"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::SessionClosed));
    }

    #[tokio::test]
    async fn dropping_every_handle_stops_the_worker() {
        let (handle, task) = spawn_session(connected(FakeClient::new()).await, WorkerOptions::default());
        drop(handle);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn listening_worker_delivers_events_and_still_serves_commands() {
        let client = FakeClient::new();
        client.push_sync(Ok(SyncBatch {
            next_batch: "s1".to_string(),
            events: Vec::new(),
            room_names: vec![("!a:example.org".to_string(), "Alpha".to_string())],
        }));
        client.push_sync(Ok(SyncBatch {
            next_batch: "s2".to_string(),
            events: vec![InboundEvent {
                room_id: "!a:example.org".to_string(),
                room_name: None,
                sender: "@alice:example.org".to_string(),
                event_id: "$1".to_string(),
                body: "hello bridge".to_string(),
                timestamp: None,
            }],
            room_names: Vec::new(),
        }));

        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();
        let manager = connected(client.clone()).await.with_sink(sink);
        let (handle, _task) = spawn_session(
            manager,
            WorkerOptions {
                listen: true,
                ..WorkerOptions::default()
            },
        );

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.body, "hello bridge");
        assert_eq!(event.room_name.as_deref(), Some("Alpha"));

        // The third sync is now long-polling forever; a command must still get through.
        let joined = tokio::time::timeout(
            Duration::from_secs(5),
            handle.join_room(RoomRef::from("!a:example.org")),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(joined.room_id, "!a:example.org");
    }

    #[tokio::test(start_paused = true)]
    async fn listening_worker_backs_off_after_sync_failure() {
        let client = FakeClient::new();
        client.push_sync(Ok(SyncBatch {
            next_batch: "s1".to_string(),
            ..SyncBatch::default()
        }));
        client.push_sync(Err(ChatError::Sync("502 Bad Gateway".to_string())));
        client.push_sync(Ok(SyncBatch {
            next_batch: "s2".to_string(),
            events: vec![InboundEvent {
                room_id: "!a:example.org".to_string(),
                room_name: None,
                sender: "@alice:example.org".to_string(),
                event_id: "$2".to_string(),
                body: "recovered".to_string(),
                timestamp: None,
            }],
            room_names: Vec::new(),
        }));

        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();
        let manager = connected(client).await.with_sink(sink);
        let (_handle, _task) = spawn_session(
            manager,
            WorkerOptions {
                listen: true,
                ..WorkerOptions::default()
            },
        );

        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.body, "recovered");
        assert_eq!(event.room_name, None);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_sync_completes_under_steady_commands() {
        let client = FakeClient::new().with_sync_delay(Duration::from_millis(200));
        client.push_sync(Ok(SyncBatch {
            next_batch: "s1".to_string(),
            ..SyncBatch::default()
        }));
        client.push_sync(Ok(SyncBatch {
            next_batch: "s2".to_string(),
            events: vec![InboundEvent {
                room_id: "!a:example.org".to_string(),
                room_name: None,
                sender: "@alice:example.org".to_string(),
                event_id: "$3".to_string(),
                body: "through the traffic".to_string(),
                timestamp: None,
            }],
            room_names: Vec::new(),
        }));

        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();
        let manager = connected(client.clone()).await.with_sink(sink);
        let (handle, _task) = spawn_session(
            manager,
            WorkerOptions {
                listen: true,
                ..WorkerOptions::default()
            },
        );

        // A send every 100ms, twice as often as a sync can answer.
        let sender = {
            let handle = handle.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_millis(100));
                for i in 0.. {
                    ticker.tick().await;
                    handle
                        .send_message(OutboundMessage::text("!a:example.org", format!("tick {i}")))
                        .await
                        .unwrap();
                }
            })
        };

        let event = tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.body, "through the traffic");

        sender.abort();
        assert!(client.sends().len() >= 3);
        // Each round was issued once, not restarted per command.
        assert!(client.sync_count() <= 3);
    }
}
