//! Matrix client-server API adapter.
//!
//! - `client`: `MatrixClient`, the `ChatClient` implementation (login, join, send, sync)
//! - `proxy`: `MatrixProxy`, verbatim forwarding of `/_matrix/*` requests
//! - `types`: wire request/response shapes

pub mod client;
pub mod proxy;
pub mod types;

pub use client::MatrixClient;
pub use proxy::{MatrixProxy, ProxyError, ProxyResponse};
