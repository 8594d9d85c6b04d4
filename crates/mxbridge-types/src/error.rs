use thiserror::Error;

/// Errors raised while resolving process configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Errors from chat operations (adapter, session manager, session worker).
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("failed to join room '{room}': {reason}")]
    RoomJoin { room: String, reason: String },

    #[error("failed to send message to '{room}': {reason}")]
    Send { room: String, reason: String },

    #[error("sync failed: {0}")]
    Sync(String),

    #[error("session is not connected")]
    NotConnected,

    #[error("session worker has stopped")]
    SessionClosed,
}

impl ChatError {
    /// Whether the error means the session itself is unusable (as opposed to a
    /// single operation being rejected by the homeserver).
    pub fn is_session_unavailable(&self) -> bool {
        matches!(self, ChatError::NotConnected | ChatError::SessionClosed)
    }
}
