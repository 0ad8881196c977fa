use crate::http::{invalid, json_response, parse_json_body, request_id, store_failure, Reject};
use crate::{unix_millis, unix_secs, AppState};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use civica_api::{ApiError, IdentityEvent, IdentityEventKind};
use civica_model::{EmailAddress, User, UserId};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Verifies `x-civica-timestamp` / `x-civica-signature` against
/// `HMAC-SHA256(secret, "<ts>\n<body>")`. Mandatory; there is no
/// unsigned mode.
fn verify_signature(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    now_secs: u64,
) -> Result<(), ()> {
    let ts_raw = headers
        .get("x-civica-timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or(())?;
    let ts: u64 = ts_raw.trim().parse().map_err(|_| ())?;
    let skew = now_secs.abs_diff(ts);
    if skew > state.config.webhook_max_skew_secs {
        return Err(());
    }

    let sig_hex = headers
        .get("x-civica-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(())?;
    let sig = hex::decode(sig_hex.trim()).map_err(|_| ())?;

    let mut mac = HmacSha256::new_from_slice(state.config.webhook_secret.as_bytes())
        .map_err(|_| ())?;
    mac.update(ts_raw.trim().as_bytes());
    mac.update(b"\n");
    mac.update(body);
    mac.verify_slice(&sig).map_err(|_| ())
}

pub(crate) async fn identity_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    if verify_signature(&state, &headers, &body, unix_secs()).is_err() {
        warn!(request_id = rid, "webhook signature rejected");
        return Err(Reject(
            ApiError::authentication_required().with_request_id(&rid),
        ));
    }

    let event: IdentityEvent = parse_json_body(&rid, &body)?;
    let id = UserId::parse(&event.user_id).map_err(|e| invalid(&rid, e))?;

    match event.kind {
        IdentityEventKind::UserCreated | IdentityEventKind::UserUpdated => {
            let existing = state
                .store
                .user(&id)
                .await
                .map_err(|e| store_failure(&rid, e))?;
            let user = match existing {
                Some(mut user) => {
                    if let Some(email) = &event.email {
                        user.email = EmailAddress::parse(email).map_err(|e| invalid(&rid, e))?;
                    }
                    if let Some(name) = &event.name {
                        user.name = name.clone();
                    }
                    user
                }
                None => {
                    let email = event
                        .email
                        .as_deref()
                        .ok_or_else(|| invalid(&rid, "email is required for a new user"))?;
                    let email = EmailAddress::parse(email).map_err(|e| invalid(&rid, e))?;
                    User::new(id, email, event.name.unwrap_or_default(), unix_millis())
                }
            };
            state
                .store
                .upsert_user(user.clone())
                .await
                .map_err(|e| store_failure(&rid, e))?;
            info!(request_id = rid, user = user.id.as_str(), "identity event mirrored");
        }
        IdentityEventKind::UserDeleted => {
            let removed = state
                .store
                .delete_user(&id)
                .await
                .map_err(|e| store_failure(&rid, e))?;
            info!(request_id = rid, user = id.as_str(), removed, "identity deletion mirrored");
        }
    }

    Ok(json_response(200, &rid, &json!({"status": "accepted"})))
}

/// Test/tooling helper: signs a webhook payload the way the provider
/// does.
#[must_use]
pub fn sign_webhook(secret: &str, timestamp_secs: u64, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp_secs.to_string().as_bytes());
    mac.update(b"\n");
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}
