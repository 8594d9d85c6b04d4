//! Response bodies shared by the chat endpoints.
//!
//! Success:
//! ```json
//! {"status": "success"}
//! ```
//! Failure:
//! ```json
//! {"status": "error", "error": {"code": "SEND_FAILED", "message": "..."}}
//! ```

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self { status: "success" }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: ErrorDetail,
}

/// Machine-readable code plus a human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            error: ErrorDetail {
                code,
                message: message.into(),
            },
        }
    }
}
