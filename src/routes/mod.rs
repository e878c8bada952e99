use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::state::AppState;
use crate::ApiError;

pub mod appointment;
pub mod auth;

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub(crate) fn require_field<T>(value: Option<T>, name: &'static str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Validation(format!("Missing required field: {name}")))
}

async fn health() -> &'static str {
    "OK"
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router(state.clone()))
        .merge(appointment::router(state.clone()))
        .with_state(state)
}
