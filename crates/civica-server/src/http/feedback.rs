use crate::http::complaints::parse_id;
use crate::http::{
    complaint_visible_to, invalid, json_response, optional_caller, parse_json_body, request_id,
    require_caller, store_failure, Reject,
};
use crate::{unix_millis, AppState};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use civica_api::{ApiError, FeedbackRequest};
use civica_model::{FeedbackText, RewardEvent};
use serde_json::json;
use tracing::warn;

pub(crate) async fn add_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let caller = require_caller(&state, &headers, &rid).await?;
    let id = parse_id(&rid, &id)?;
    let req: FeedbackRequest = parse_json_body(&rid, &body)?;
    let text = FeedbackText::parse(&req.text).map_err(|e| invalid(&rid, e))?;

    let complaint = state
        .store
        .complaint(&id)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    if !matches!(&complaint, Some(c) if complaint_visible_to(c, Some(&caller))) {
        return Err(Reject(ApiError::not_found("complaint").with_request_id(&rid)));
    }

    let now = unix_millis();
    let feedback = state
        .store
        .insert_feedback(&id, &caller.user.id, text, now)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    if let Err(e) = state
        .rewards
        .apply(&caller.user.id, RewardEvent::AddedComment, now)
        .await
    {
        warn!(request_id = rid, "rewards event failed: {e}");
    }
    Ok(json_response(201, &rid, &feedback))
}

pub(crate) async fn list_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let caller = optional_caller(&state, &headers, &rid).await?;
    let id = parse_id(&rid, &id)?;

    let complaint = state
        .store
        .complaint(&id)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    if !matches!(&complaint, Some(c) if complaint_visible_to(c, caller.as_ref())) {
        return Err(Reject(ApiError::not_found("complaint").with_request_id(&rid)));
    }

    let feedback = state
        .store
        .list_feedback(&id)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    Ok(json_response(200, &rid, &json!({"feedback": feedback})))
}
