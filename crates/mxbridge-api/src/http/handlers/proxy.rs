//! ANY /_matrix/{*path} - forward to the homeserver.
//!
//! Lets the bundled web frontend talk to the homeserver through the gateway's
//! origin. Upstream responses (including error statuses) are relayed as-is.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use mxbridge_infra::matrix::ProxyError;

use crate::http::error::AppError;
use crate::state::AppState;

pub async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let path_and_query = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());

    let upstream = match state
        .proxy
        .forward(method, path_and_query, &headers, body.to_vec())
        .await
    {
        Ok(upstream) => upstream,
        Err(e @ ProxyError::InvalidTarget(_)) => {
            warn!(path = %uri.path(), "rejected proxy path: {e}");
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid proxy path",
                    "details": e.to_string(),
                })),
            )
                .into_response());
        }
        Err(e) => {
            error!(path = %uri.path(), "proxy error: {e}");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Proxy error occurred",
                    "details": e.to_string(),
                })),
            )
                .into_response());
        }
    };

    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = Response::builder().status(status);
    if let Some(content_type) = &upstream.content_type {
        response = response.header(header::CONTENT_TYPE, content_type);
    }

    response
        .body(Body::from(upstream.body))
        .map_err(|e| AppError::Internal(format!("failed to build proxied response: {e}")))
}
