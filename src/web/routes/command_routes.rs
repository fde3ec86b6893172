use crate::cards::CardLocation;
use crate::monitor::{Actor, Reply};
use crate::web::{AppError, AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

// --- Request Structs ---

#[derive(Deserialize)]
pub struct MonitorCommandRequest {
    actor: Actor,
    target: String,
    channel_id: String,
}

#[derive(Deserialize)]
pub struct ControlRequest {
    actor: Actor,
    custom_id: String,
    channel_id: String,
    message_id: String,
}

// --- Route Handlers ---

async fn monitor_command_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<MonitorCommandRequest>,
) -> Result<Json<Reply>, AppError> {
    if payload.channel_id.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "channel_id must not be empty".to_string(),
        ));
    }
    let reply = app_state
        .commands
        .monitor(&payload.actor, &payload.target, &payload.channel_id)
        .await;
    Ok(Json(reply))
}

async fn control_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ControlRequest>,
) -> Result<Json<Reply>, AppError> {
    if payload.channel_id.is_empty() || payload.message_id.is_empty() {
        return Err(AppError::InvalidInput(
            "channel_id and message_id are required".to_string(),
        ));
    }
    let card = CardLocation {
        channel_id: payload.channel_id,
        message_id: payload.message_id,
    };
    let reply = app_state
        .commands
        .control(&payload.actor, &payload.custom_id, &card)
        .await;
    Ok(Json(reply))
}

pub fn create_commands_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/commands/monitor", post(monitor_command_handler))
        .route("/controls", post(control_handler))
}
