use crate::http::complaints::parse_id;
use crate::http::{json_response, request_id, require_caller, store_failure, Reject};
use crate::{unix_millis, AppState};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use civica_api::ApiError;
use civica_model::RewardEvent;
use civica_store::{UnvoteOutcome, VoteOutcome};
use serde_json::json;
use tracing::warn;

pub(crate) async fn add_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let caller = require_caller(&state, &headers, &rid).await?;
    let id = parse_id(&rid, &id)?;
    let now = unix_millis();

    let outcome = state
        .store
        .add_vote(&id, &caller.user.id, now)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    match outcome {
        VoteOutcome::MissingComplaint => {
            Err(Reject(ApiError::not_found("complaint").with_request_id(&rid)))
        }
        VoteOutcome::Duplicate => Err(Reject(
            ApiError::conflict("vote already recorded").with_request_id(&rid),
        )),
        VoteOutcome::Added { votes } => {
            match state.store.complaint(&id).await {
                Ok(Some(complaint)) if complaint.owner != caller.user.id => {
                    if let Err(e) = state
                        .rewards
                        .apply(&complaint.owner, RewardEvent::ReceivedVote, now)
                        .await
                    {
                        warn!(request_id = rid, "rewards event failed: {e}");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(request_id = rid, "owner lookup failed: {e}"),
            }
            Ok(json_response(
                200,
                &rid,
                &json!({"complaint": id, "votes": votes}),
            ))
        }
    }
}

pub(crate) async fn remove_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let caller = require_caller(&state, &headers, &rid).await?;
    let id = parse_id(&rid, &id)?;

    let outcome = state
        .store
        .remove_vote(&id, &caller.user.id)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    match outcome {
        UnvoteOutcome::MissingComplaint => {
            Err(Reject(ApiError::not_found("complaint").with_request_id(&rid)))
        }
        UnvoteOutcome::Missing => Err(Reject(
            ApiError::conflict("no vote to remove").with_request_id(&rid),
        )),
        UnvoteOutcome::Removed { votes } => Ok(json_response(
            200,
            &rid,
            &json!({"complaint": id, "votes": votes}),
        )),
    }
}
