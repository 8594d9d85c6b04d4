//! MatrixClient -- concrete [`ChatClient`] over the Matrix client-server API.
//!
//! Talks to `/_matrix/client/v3` with password login and bearer-token
//! authentication. The access token is held as a [`SecretString`] and only
//! exposed when building request headers.

use std::time::Duration;

use reqwest::{Response, Url};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use uuid::Uuid;

use mxbridge_core::chat::ChatClient;
use mxbridge_types::error::ChatError;
use mxbridge_types::event::SyncBatch;
use mxbridge_types::room::{JoinedRoom, RoomRef, SentMessage};
use mxbridge_types::session::SessionInfo;

use super::types::{
    JoinResponse, LoginRequest, LoginResponse, MatrixErrorBody, SendResponse, SyncResponse,
    TextContent, EVENT_ROOM_MESSAGE,
};

/// Device display name registered at login unless overridden.
pub const DEFAULT_DEVICE_NAME: &str = "mxbridge";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time allowed on top of the server-side long-poll timeout.
const SYNC_GRACE: Duration = Duration::from_secs(30);

/// Matrix homeserver client.
pub struct MatrixClient {
    http: reqwest::Client,
    homeserver: Url,
    device_name: String,
    access_token: Option<SecretString>,
}

impl MatrixClient {
    pub fn new(homeserver: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            homeserver,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            access_token: None,
        }
    }

    pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = device_name.into();
        self
    }

    pub fn is_logged_in(&self) -> bool {
        self.access_token.is_some()
    }

    /// `{homeserver}/_matrix/client/v3/{segments...}`, each segment percent-encoded.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.homeserver.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["_matrix", "client", "v3"])
                .extend(segments);
        }
        url
    }

    fn token(&self) -> Result<&SecretString, ChatError> {
        self.access_token.as_ref().ok_or(ChatError::NotConnected)
    }
}

/// Turn a non-success response into a short reason string.
///
/// Prefers the Matrix `errcode: error` pair; falls back to the HTTP status
/// and raw body.
async fn error_reason(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<MatrixErrorBody>(&text) {
        Ok(MatrixErrorBody {
            errcode,
            error: Some(error),
        }) => format!("{errcode}: {error}"),
        Ok(MatrixErrorBody { errcode, error: None }) => errcode,
        Err(_) if text.is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {text}"),
    }
}

impl ChatClient for MatrixClient {
    fn homeserver(&self) -> &str {
        self.homeserver.as_str().trim_end_matches('/')
    }

    async fn login(
        &mut self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionInfo, ChatError> {
        let body = LoginRequest::password(username, password.expose_secret(), &self.device_name);

        let response = self
            .http
            .post(self.endpoint(["login"]))
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Authentication(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Authentication(error_reason(response).await));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Authentication(format!("invalid login response: {e}")))?;

        self.access_token = Some(SecretString::from(login.access_token));
        debug!(user_id = %login.user_id, "logged in to homeserver");

        Ok(SessionInfo {
            user_id: login.user_id,
            device_id: login.device_id,
        })
    }

    async fn join_room(&self, room: &RoomRef) -> Result<JoinedRoom, ChatError> {
        let token = self.token()?;
        let join_error = |reason: String| ChatError::RoomJoin {
            room: room.to_string(),
            reason,
        };

        let response = self
            .http
            .post(self.endpoint(["join", room.as_str()]))
            .bearer_auth(token.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| join_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(join_error(error_reason(response).await));
        }

        let joined: JoinResponse = response
            .json()
            .await
            .map_err(|e| join_error(format!("invalid join response: {e}")))?;

        Ok(JoinedRoom {
            room_id: joined.room_id,
        })
    }

    async fn send_text(&self, room: &RoomRef, body: &str) -> Result<SentMessage, ChatError> {
        let token = self.token()?;
        let send_error = |reason: String| ChatError::Send {
            room: room.to_string(),
            reason,
        };

        let txn_id = Uuid::now_v7().simple().to_string();
        let url = self.endpoint(["rooms", room.as_str(), "send", EVENT_ROOM_MESSAGE, txn_id.as_str()]);

        let response = self
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .json(&TextContent::new(body))
            .send()
            .await
            .map_err(|e| send_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(send_error(error_reason(response).await));
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| send_error(format!("invalid send response: {e}")))?;

        Ok(SentMessage {
            room_id: room.to_string(),
            event_id: sent.event_id,
        })
    }

    async fn sync(&self, since: Option<&str>, timeout: Duration) -> Result<SyncBatch, ChatError> {
        let token = self.token()?;

        let mut url = self.endpoint(["sync"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("timeout", &timeout.as_millis().to_string());
            if let Some(since) = since {
                query.append_pair("since", since);
            }
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .timeout(timeout + SYNC_GRACE)
            .send()
            .await
            .map_err(|e| ChatError::Sync(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Sync(error_reason(response).await));
        }

        let sync: SyncResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Sync(format!("invalid sync response: {e}")))?;

        Ok(sync.into_batch())
    }
}

impl std::fmt::Debug for MatrixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixClient")
            .field("homeserver", &self.homeserver.as_str())
            .field("device_name", &self.device_name)
            .field("logged_in", &self.access_token.is_some())
            .finish()
    }
}
