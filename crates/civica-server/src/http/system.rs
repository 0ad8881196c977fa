use crate::http::{json_response, request_id};
use crate::{AppState, CRATE_NAME};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde_json::json;
use std::sync::atomic::Ordering;

pub(crate) async fn healthz(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let rid = request_id(&headers, &state);
    json_response(200, &rid, &json!({"status": "ok"}))
}

pub(crate) async fn readyz(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let rid = request_id(&headers, &state);
    let ready = state.ready.load(Ordering::Relaxed) && state.accepting_requests.load(Ordering::Relaxed);
    if ready {
        json_response(200, &rid, &json!({"status": "ready"}))
    } else {
        json_response(503, &rid, &json!({"status": "unavailable"}))
    }
}

pub(crate) async fn version(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let rid = request_id(&headers, &state);
    json_response(
        200,
        &rid,
        &json!({"name": CRATE_NAME, "version": env!("CARGO_PKG_VERSION")}),
    )
}

pub(crate) async fn metrics(State(state): State<AppState>) -> Response {
    let mut resp = Response::new(axum::body::Body::from(state.metrics.render()));
    *resp.status_mut() = StatusCode::OK;
    resp.headers_mut().insert(
        "content-type",
        axum::http::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}
