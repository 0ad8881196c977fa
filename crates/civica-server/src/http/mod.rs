use crate::auth::{effective_role, Caller};
use crate::{unix_secs, AppState};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use civica_api::{map_error, ApiError};
use civica_model::{Complaint, User};
use civica_store::StoreError;
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::{error, warn};

pub(crate) mod admin;
pub(crate) mod complaints;
pub(crate) mod feedback;
pub(crate) mod media;
pub(crate) mod rewards;
pub(crate) mod system;
pub(crate) mod votes;
pub(crate) mod webhook;

/// Handler failure. Carries the wire error; the status code comes
/// from `map_error`.
#[derive(Debug)]
pub(crate) struct Reject(pub ApiError);

impl IntoResponse for Reject {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(map_error(&self.0)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_string(&json!({ "error": self.0 }))
            .unwrap_or_else(|_| r#"{"error":{"code":"Internal"}}"#.to_string());
        let mut resp = Response::new(axum::body::Body::from(body));
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            "content-type",
            axum::http::HeaderValue::from_static("application/json"),
        );
        if let Ok(value) = axum::http::HeaderValue::from_str(&self.0.request_id) {
            resp.headers_mut().insert("x-request-id", value);
        }
        resp
    }
}

pub(crate) fn json_response<T: Serialize>(status: u16, request_id: &str, body: &T) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    let payload =
        serde_json::to_string(body).unwrap_or_else(|_| r#"{"error":{"code":"Internal"}}"#.into());
    let mut resp = Response::new(axum::body::Body::from(payload));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        "content-type",
        axum::http::HeaderValue::from_static("application/json"),
    );
    if let Ok(value) = axum::http::HeaderValue::from_str(request_id) {
        resp.headers_mut().insert("x-request-id", value);
    }
    resp
}

/// Propagates an inbound `x-request-id` or mints one from the
/// process-local seed.
pub(crate) fn request_id(headers: &HeaderMap, state: &AppState) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| {
            let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
            format!("req-{id:016x}")
        })
}

pub(crate) fn invalid(request_id: &str, e: impl std::fmt::Display) -> Reject {
    Reject(ApiError::validation_failed(e.to_string()).with_request_id(request_id))
}

pub(crate) fn store_failure(request_id: &str, e: StoreError) -> Reject {
    error!(request_id, "store failure: {e}");
    Reject(ApiError::upstream("store unavailable").with_request_id(request_id))
}

pub(crate) fn parse_json_body<T: serde::de::DeserializeOwned>(
    request_id: &str,
    body: &[u8],
) -> Result<T, Reject> {
    serde_json::from_slice(body).map_err(|e| {
        Reject(ApiError::validation_failed(format!("invalid request body: {e}"))
            .with_request_id(request_id))
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolves the session token into a `Caller`, mirroring the user on
/// first sight and applying the super-admin override once.
pub(crate) async fn require_caller(
    state: &AppState,
    headers: &HeaderMap,
    request_id: &str,
) -> Result<Caller, Reject> {
    match optional_caller(state, headers, request_id).await? {
        Some(caller) => Ok(caller),
        None => Err(Reject(
            ApiError::authentication_required().with_request_id(request_id),
        )),
    }
}

/// `Ok(None)` only when no token was presented; a presented but
/// invalid token is a hard 401.
pub(crate) async fn optional_caller(
    state: &AppState,
    headers: &HeaderMap,
    request_id: &str,
) -> Result<Option<Caller>, Reject> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    let Some(principal) = state.sessions.verify(token, unix_secs()) else {
        return Err(Reject(
            ApiError::authentication_required().with_request_id(request_id),
        ));
    };

    let user = match state
        .store
        .user(&principal.user)
        .await
        .map_err(|e| store_failure(request_id, e))?
    {
        Some(user) => user,
        None => {
            // First sign-in: mirror the identity-provider principal.
            let user = User::new(
                principal.user.clone(),
                principal.email.clone(),
                String::new(),
                crate::unix_millis(),
            );
            state
                .store
                .upsert_user(user.clone())
                .await
                .map_err(|e| store_failure(request_id, e))?;
            user
        }
    };

    if !user.active {
        warn!(request_id, user = user.id.as_str(), "inactive user denied");
        return Err(Reject(
            ApiError::authorization_denied("account disabled").with_request_id(request_id),
        ));
    }

    let role = effective_role(&user, &state.config.super_admin_email);
    Ok(Some(Caller { user, role }))
}

pub(crate) async fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
    request_id: &str,
) -> Result<Caller, Reject> {
    let caller = require_caller(state, headers, request_id).await?;
    if !caller.is_admin() {
        return Err(Reject(
            ApiError::authorization_denied("admin role required").with_request_id(request_id),
        ));
    }
    Ok(caller)
}

/// Hidden complaints are visible to their owner and to admins only.
pub(crate) fn complaint_visible_to(complaint: &Complaint, caller: Option<&Caller>) -> bool {
    if complaint.is_visible {
        return true;
    }
    match caller {
        Some(c) => c.is_admin() || c.user.id == complaint.owner,
        None => false,
    }
}
