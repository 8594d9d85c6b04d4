//! Session logic and port definitions for mxbridge.
//!
//! This crate defines the `ChatClient` port that the infrastructure layer
//! implements, the `SessionManager` that owns the one authenticated session,
//! and the worker task that serializes every chat operation through it. It
//! depends only on `mxbridge-types` -- never on `mxbridge-infra` or any HTTP
//! crate.

pub mod chat;
pub mod session;
