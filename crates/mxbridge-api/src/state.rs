//! Shared state handed to every HTTP handler.

use mxbridge_core::session::SessionHandle;
use mxbridge_infra::matrix::MatrixProxy;

/// Cloned into each request by axum.
///
/// Holds only cheap handles: the session is owned by its worker task and
/// reached through `session`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub proxy: MatrixProxy,
}

impl AppState {
    pub fn new(session: SessionHandle, proxy: MatrixProxy) -> Self {
        Self { session, proxy }
    }
}
