//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/ping`    : storage health (503 after a failed flush)

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn ping(State(state): State<AppState>) -> impl IntoResponse {
    if state.repo().check_health().await {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "storage unhealthy")
    }
}
