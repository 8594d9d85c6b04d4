//! GET /health - liveness plus session state (no auth required).

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let session = match state.session.status().await {
        Ok(status) => status.to_string(),
        Err(_) => "closed".to_string(),
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "session": session,
    }))
}
