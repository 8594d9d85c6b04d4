//! Application error type mapping to HTTP status codes.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use mxbridge_types::error::ChatError;

use crate::http::response::ErrorResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// The session or the homeserver rejected the operation.
    Chat(ChatError),
    /// The request body could not be used.
    MalformedRequest(String),
    /// Generic internal error.
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedRequest(rejection.body_text())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Chat(ChatError::NotConnected | ChatError::SessionClosed) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SESSION_UNAVAILABLE")
            }
            AppError::Chat(ChatError::Authentication(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AUTHENTICATION_FAILED")
            }
            AppError::Chat(ChatError::RoomJoin { .. }) => (StatusCode::BAD_GATEWAY, "ROOM_JOIN_FAILED"),
            AppError::Chat(ChatError::Send { .. }) => (StatusCode::BAD_GATEWAY, "SEND_FAILED"),
            AppError::Chat(ChatError::Sync(_)) => (StatusCode::BAD_GATEWAY, "SYNC_FAILED"),
            AppError::MalformedRequest(_) => (StatusCode::BAD_REQUEST, "MALFORMED_REQUEST"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Chat(e) => e.to_string(),
            AppError::MalformedRequest(msg) | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(%status, code, "{message}");
        } else {
            tracing::debug!(%status, code, "{message}");
        }

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
