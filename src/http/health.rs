//! `GET /health`.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::server::AppState;
use crate::observability::metrics;

/// 200 while serving, 503 once shutdown has begun.
pub async fn handle_health(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let response = if state.shutdown.is_shutting_down() {
        (StatusCode::SERVICE_UNAVAILABLE, "Shutting down").into_response()
    } else {
        StatusCode::OK.into_response()
    };
    metrics::record_health(started);
    response
}
