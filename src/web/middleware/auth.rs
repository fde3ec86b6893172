use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::web::{AppError, AppState};

/// Rejects any request without `Authorization: Bearer <api_token>`.
pub async fn api_token_middleware(
    State(app_state): State<Arc<AppState>>,
    req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let authorized = provided.is_some_and(|token| {
        bool::from(token.as_bytes().ct_eq(app_state.api_token.as_bytes()))
    });
    if !authorized {
        return Err(AppError::Unauthorized(
            "Missing or invalid API token".to_string(),
        ));
    }
    Ok(next.run(req).await)
}
