//! HTTP surface for platform adapters and operators.
use axum::Router;
use std::sync::Arc;

use crate::monitor::CommandHandler;

pub mod error;
pub mod middleware;
pub mod routes;

pub use error::AppError;

pub struct AppState {
    pub commands: CommandHandler,
    pub api_token: String,
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(routes::command_routes::create_commands_router())
        .merge(routes::monitor_routes::create_monitors_router())
        .route_layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth::api_token_middleware,
        ));

    Router::new().nest("/api", api_router).with_state(app_state)
}
