//! ChatClient trait definition.
//!
//! The adapter port over an external chat-protocol client. The session
//! manager drives it; the Matrix implementation lives in mxbridge-infra
//! (`MatrixClient`) and tests substitute in-memory fakes.

use std::time::Duration;

use secrecy::SecretString;

use mxbridge_types::error::ChatError;
use mxbridge_types::event::SyncBatch;
use mxbridge_types::room::{JoinedRoom, RoomRef, SentMessage};
use mxbridge_types::session::SessionInfo;

/// Trait for chat-protocol client backends.
///
/// A client is bound to one homeserver when constructed. `login` must
/// succeed before the other calls; until then they return
/// [`ChatError::NotConnected`].
///
/// Uses native async fn in traits (RPITIT). Callers never share a client
/// between tasks: the session worker owns it, so `login` may take `&mut self`.
pub trait ChatClient: Send + Sync {
    /// Base URL of the homeserver this client talks to.
    fn homeserver(&self) -> &str;

    /// Authenticate with a password and keep the resulting access token.
    fn login(
        &mut self,
        username: &str,
        password: &SecretString,
    ) -> impl std::future::Future<Output = Result<SessionInfo, ChatError>> + Send;

    /// Join a room by id or alias. Joining a room twice is harmless.
    fn join_room(
        &self,
        room: &RoomRef,
    ) -> impl std::future::Future<Output = Result<JoinedRoom, ChatError>> + Send;

    /// Send a plain-text message to a room.
    fn send_text(
        &self,
        room: &RoomRef,
        body: &str,
    ) -> impl std::future::Future<Output = Result<SentMessage, ChatError>> + Send;

    /// Run one sync round, long-polling for up to `timeout`.
    ///
    /// `since` is the `next_batch` token of the previous round, or `None`
    /// for the initial sync.
    fn sync(
        &self,
        since: Option<&str>,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<SyncBatch, ChatError>> + Send;
}
