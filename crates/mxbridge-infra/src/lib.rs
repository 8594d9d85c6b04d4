//! Infrastructure layer for mxbridge.
//!
//! Contains the implementation of the `ChatClient` port defined in
//! `mxbridge-core` (a Matrix client-server API client over `reqwest`), the
//! raw `/_matrix` request forwarder used by the bundled frontend, and
//! resolution of process configuration.

pub mod config;
pub mod matrix;

pub use reqwest::Url;
