//! Chat endpoints: send a message, join a room.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use mxbridge_types::room::{OutboundMessage, RoomRef};

use crate::http::error::AppError;
use crate::http::response::StatusResponse;
use crate::state::AppState;

/// Request body for `POST /send_message`.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub room_id: String,
    pub message: String,
}

/// Request body for `POST /join_room`.
#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub room_id: String,
}

fn room_ref(room_id: String) -> Result<RoomRef, AppError> {
    if room_id.trim().is_empty() {
        return Err(AppError::MalformedRequest(
            "room_id must not be empty".to_string(),
        ));
    }
    Ok(RoomRef::new(room_id))
}

/// POST /send_message - Send a plain-text message to a room.
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Json(request) = payload?;
    let room = room_ref(request.room_id)?;

    let sent = state
        .session
        .send_message(OutboundMessage::text(room, request.message))
        .await?;

    info!(room_id = %sent.room_id, event_id = %sent.event_id, "message sent");
    Ok(Json(StatusResponse::success()))
}

/// POST /join_room - Join a room by id or alias.
pub async fn join_room(
    State(state): State<AppState>,
    payload: Result<Json<JoinRoomRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Json(request) = payload?;
    let room = room_ref(request.room_id)?;

    let joined = state.session.join_room(room).await?;

    info!(room_id = %joined.room_id, "joined room");
    Ok(Json(StatusResponse::success()))
}
