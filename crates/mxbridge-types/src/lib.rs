//! Shared domain types for mxbridge.
//!
//! This crate contains the types passed between the HTTP gateway, the session
//! manager and the Matrix adapter: room references, outbound and inbound
//! messages, session state, credentials, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, secrecy, thiserror.

pub mod error;
pub mod event;
pub mod room;
pub mod session;
