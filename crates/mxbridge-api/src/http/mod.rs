//! HTTP gateway for mxbridge.
//!
//! Axum router with the two chat endpoints, a health check, the `/_matrix`
//! pass-through proxy and the static web frontend.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
