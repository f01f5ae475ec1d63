//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{Room, RoomName, StorageError},
    infrastructure::dto::{http::RoomHistoryDto, websocket::LobbyFrame},
    ui::state::AppState,
};

fn parse_room_name(raw: String) -> Result<RoomName, StatusCode> {
    RoomName::try_from(raw.clone()).map_err(|e| {
        tracing::warn!("Invalid room name '{}': {}", raw, e);
        StatusCode::BAD_REQUEST
    })
}

/// Debug endpoint to get a room's live membership (for testing purposes)
pub async fn debug_room_state(
    State(state): State<Arc<AppState>>,
    Path(room_name): Path<String>,
) -> Result<Json<Room>, StatusCode> {
    let room_name = parse_room_name(room_name)?;
    Ok(Json(state.get_room_state_usecase.execute(&room_name).await))
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// List every room with its live member count (same shape as the lobby feed)
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<LobbyFrame> {
    let snapshot = state.lobby_session_usecase.snapshot().await;
    Json(LobbyFrame::from(&snapshot))
}

/// Get a room's persisted chat history, creating the room if it is new
pub async fn get_room_history(
    State(state): State<Arc<AppState>>,
    Path(room_name): Path<String>,
) -> Result<Json<RoomHistoryDto>, StatusCode> {
    let room_name = parse_room_name(room_name)?;
    match state.get_room_history_usecase.execute(&room_name).await {
        Ok(messages) => Ok(Json(RoomHistoryDto::new(&room_name, &messages))),
        Err(StorageError::RoomNotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e @ StorageError::Unavailable(_)) => {
            tracing::error!("Failed to load history of '{}': {}", room_name, e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
