use crate::http::{json_response, request_id, require_caller, store_failure, Reject};
use crate::{unix_millis, AppState};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;

pub(crate) async fn get_rewards(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let caller = require_caller(&state, &headers, &rid).await?;
    let profile = state
        .rewards
        .profile(&caller.user.id, unix_millis())
        .await
        .map_err(|e| store_failure(&rid, e))?;
    Ok(json_response(200, &rid, &profile))
}

pub(crate) async fn refresh_rewards(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let caller = require_caller(&state, &headers, &rid).await?;
    let profile = state
        .rewards
        .refresh(&caller.user.id, unix_millis())
        .await
        .map_err(|e| store_failure(&rid, e))?;
    Ok(json_response(200, &rid, &profile))
}
