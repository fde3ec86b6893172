use crate::monitor::PersistedMonitorRecord;
use crate::web::{AppError, AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

async fn list_monitors_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<Vec<PersistedMonitorRecord>> {
    Json(app_state.commands.engine().registry().records())
}

async fn get_monitor_handler(
    State(app_state): State<Arc<AppState>>,
    Path(monitor_id): Path<String>,
) -> Result<Json<PersistedMonitorRecord>, AppError> {
    app_state
        .commands
        .engine()
        .registry()
        .get(&monitor_id)
        .map(|entry| Json(entry.to_record()))
        .ok_or_else(|| AppError::NotFound(format!("Monitor {monitor_id} not found")))
}

pub fn create_monitors_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/monitors", get(list_monitors_handler))
        .route("/monitors/{monitor_id}", get(get_monitor_handler))
}
