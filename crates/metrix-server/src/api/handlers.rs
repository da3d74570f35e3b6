use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use metrix_core::error::{ErrorCode, MetricsError};
use metrix_core::Metric;

use crate::app_state::AppState;

/// Which route produced the error. Path updates report a missing name as
/// "not found" (the route does not exist), JSON updates as a bad body;
/// unknown or missing types are "not implemented" for writes but simply
/// "not found" for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    UpdatePath,
    UpdateJson,
    Lookup,
}

pub fn status_for(e: &MetricsError, lane: Lane) -> StatusCode {
    match (e.client_code(), lane) {
        (ErrorCode::NotFound, _) => StatusCode::NOT_FOUND,
        (ErrorCode::InvalidName, Lane::UpdateJson) => StatusCode::BAD_REQUEST,
        (ErrorCode::InvalidName, _) => StatusCode::NOT_FOUND,
        (ErrorCode::UnknownType | ErrorCode::InvalidType, Lane::Lookup) => StatusCode::NOT_FOUND,
        (ErrorCode::UnknownType | ErrorCode::InvalidType, _) => StatusCode::NOT_IMPLEMENTED,
        (ErrorCode::InvalidValue | ErrorCode::InvalidSignature | ErrorCode::InvalidJson, _) => {
            StatusCode::BAD_REQUEST
        }
        (ErrorCode::InvalidConfig | ErrorCode::Internal, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: MetricsError, lane: Lane) -> Response {
    let status = status_for(&e, lane);
    if status.is_server_error() {
        tracing::error!(error = %e, "request failed");
    } else {
        tracing::debug!(code = e.client_code().as_str(), error = %e, "request rejected");
    }
    (status, e.client_code().as_str()).into_response()
}

fn json_response(body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

/// `POST /update/:mtype/:name/:value`
pub async fn update_path(
    State(app): State<AppState>,
    Path((mtype, name, value)): Path<(String, String, String)>,
) -> Response {
    match app.store().update(&mtype, &name, value) {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(e) => error_response(e, Lane::UpdatePath),
    }
}

/// `POST /update/` with a JSON metric; echoes the stored metric.
pub async fn update_json(State(app): State<AppState>, body: Bytes) -> Response {
    let metric = match Metric::from_json(&body) {
        Ok(m) => m,
        Err(e) => return error_response(e, Lane::UpdateJson),
    };

    let repo = app.repo();
    if let Err(e) = repo.upsert(metric.clone()).await {
        return error_response(e, Lane::UpdateJson);
    }
    match repo.get(&metric).await.and_then(|m| m.to_json()) {
        Ok(body) => json_response(body),
        Err(e) => error_response(e, Lane::Lookup),
    }
}

/// `POST /updates/` with a JSON array of metrics.
pub async fn update_batch(State(app): State<AppState>, body: Bytes) -> Response {
    let metrics = match Metric::slice_from_json(&body) {
        Ok(m) => m,
        Err(e) => return error_response(e, Lane::UpdateJson),
    };
    match app.repo().upsert_slice(metrics).await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(e) => error_response(e, Lane::UpdateJson),
    }
}

/// `GET /value/:mtype/:name` as plain text.
pub async fn value_path(
    State(app): State<AppState>,
    Path((mtype, name)): Path<(String, String)>,
) -> Response {
    match app.store().get(&mtype, &name) {
        Ok(v) => (StatusCode::OK, v).into_response(),
        Err(e) => error_response(e, Lane::Lookup),
    }
}

/// `POST /value/` with `{id, type}`.
pub async fn fetch_json(State(app): State<AppState>, body: Bytes) -> Response {
    match app.store().fetch_json(&body) {
        Ok(body) => json_response(body),
        Err(e) => error_response(e, Lane::Lookup),
    }
}

/// `GET /` listing of every metric.
pub async fn index(State(app): State<AppState>) -> Response {
    match app.store().render_text() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => error_response(e, Lane::Lookup),
    }
}
