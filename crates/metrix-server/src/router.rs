//! Axum router wiring.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{api, app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/update/:mtype/:name/:value", post(api::update_path))
        .route("/update/", post(api::update_json))
        .route("/updates/", post(api::update_batch))
        .route("/value/:mtype/:name", get(api::value_path))
        .route("/value/", post(api::fetch_json))
        .route("/healthz", get(ops::healthz))
        .route("/ping", get(ops::ping))
        .with_state(state)
}
