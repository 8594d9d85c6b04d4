//! Session state and login credentials.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Account credentials used by `connect`.
///
/// The password is a [`SecretString`] and never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    /// Localpart (`bridge`) or full user id (`@bridge:example.org`).
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// What the homeserver told us at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Lifecycle of the single process-wide session.
///
/// One-way: `Disconnected` until `connect` succeeds, then `Connected` for
/// the rest of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected(SessionInfo),
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connected(_) => write!(f, "connected"),
        }
    }
}
