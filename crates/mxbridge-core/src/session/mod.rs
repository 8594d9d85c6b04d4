//! The process-wide chat session.
//!
//! - `manager`: `SessionManager`, owning the client and session state
//! - `worker`: the task that owns the manager, plus the `SessionHandle` used by callers
//! - `sink`: `EventSink` and the built-in sinks for inbound messages
//! - `backoff`: retry delays for the sync loop

pub mod backoff;
pub mod manager;
pub mod sink;
pub mod worker;

#[cfg(test)]
pub(crate) mod fake;

pub use manager::SessionManager;
pub use sink::{BroadcastSink, EventSink, LogSink, MESSAGE_LOG_TARGET};
pub use worker::{spawn_session, SessionHandle, WorkerOptions};
