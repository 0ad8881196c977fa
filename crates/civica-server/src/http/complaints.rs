use crate::http::{
    complaint_visible_to, invalid, json_response, optional_caller, parse_json_body, request_id,
    require_admin, require_caller, store_failure, Reject,
};
use crate::{unix_millis, AppState};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use civica_api::{
    parse_list_params, ApiError, ComplaintListResponse, CreateComplaintRequest, PageInfo,
    UpdateStatusRequest,
};
use civica_model::{
    Category, Complaint, ComplaintId, ComplaintStatus, Description, RewardEvent, Title,
};
use civica_store::ComplaintQuery;
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

pub(crate) fn parse_id(request_id: &str, raw: &str) -> Result<ComplaintId, Reject> {
    ComplaintId::parse(raw).map_err(|e| invalid(request_id, e))
}

pub(crate) async fn create_complaint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let caller = require_caller(&state, &headers, &rid).await?;
    let req: CreateComplaintRequest = parse_json_body(&rid, &body)?;

    let title = Title::parse(&req.title).map_err(|e| invalid(&rid, e))?;
    let description = Description::parse(&req.description).map_err(|e| invalid(&rid, e))?;
    let category = Category::parse(&req.category).map_err(|e| invalid(&rid, e))?;
    req.location.validate().map_err(|e| invalid(&rid, e))?;
    if req.image_urls.is_empty() {
        return Err(invalid(&rid, "at least one image url is required"));
    }
    if req.image_urls.iter().any(|u| !u.starts_with("http")) {
        return Err(invalid(&rid, "image urls must be absolute"));
    }

    let now = unix_millis();
    let complaint = Complaint::submit(
        state.next_complaint_id(now),
        caller.user.id.clone(),
        title,
        description,
        category,
        req.location,
        req.image_urls,
        now,
    );
    state
        .store
        .insert_complaint(complaint.clone())
        .await
        .map_err(|e| store_failure(&rid, e))?;
    info!(request_id = rid, complaint = complaint.id.as_str(), "complaint created");

    // Secondary effects never fail the write.
    if let Err(e) = state
        .notifier
        .complaint_submitted(&caller.user.email, &complaint)
        .await
    {
        warn!(request_id = rid, "submission email failed: {e}");
    }
    if let Err(e) = state
        .rewards
        .apply(&caller.user.id, RewardEvent::SubmittedComplaint, now)
        .await
    {
        warn!(request_id = rid, "rewards event failed: {e}");
    }

    Ok(json_response(201, &rid, &complaint))
}

pub(crate) async fn list_complaints(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let list = parse_list_params(
        &params,
        state.config.default_page_size,
        state.config.max_page_size,
    )
    .map_err(|e| Reject(e.with_request_id(&rid)))?;
    let caller = optional_caller(&state, &headers, &rid).await?;
    if caller.is_none() && !list.public {
        return Err(Reject(
            ApiError::authentication_required().with_request_id(&rid),
        ));
    }

    let restricted = caller.as_ref().map_or(true, |c| !c.is_admin());
    let offset = list.offset();
    let query = ComplaintQuery {
        text: list.text,
        category: list.category,
        status: list.status,
        owner: None,
        visible_only: restricted,
        include_owner: caller
            .as_ref()
            .filter(|c| !c.is_admin())
            .map(|c| c.user.id.clone()),
        offset,
        limit: list.per_page,
    };
    let page = state
        .store
        .list_complaints(&query)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    Ok(json_response(
        200,
        &rid,
        &ComplaintListResponse {
            complaints: page.complaints,
            page: PageInfo {
                page: list.page,
                per_page: list.per_page,
                total: page.total,
            },
        },
    ))
}

pub(crate) async fn get_complaint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let id = parse_id(&rid, &id)?;
    let caller = optional_caller(&state, &headers, &rid).await?;
    let complaint = state
        .store
        .complaint(&id)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    match complaint {
        Some(c) if complaint_visible_to(&c, caller.as_ref()) => Ok(json_response(200, &rid, &c)),
        _ => Err(Reject(ApiError::not_found("complaint").with_request_id(&rid))),
    }
}

pub(crate) async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    require_admin(&state, &headers, &rid).await?;
    let id = parse_id(&rid, &id)?;
    let req: UpdateStatusRequest = parse_json_body(&rid, &body)?;
    let next = ComplaintStatus::parse(&req.status).map_err(|e| invalid(&rid, e))?;

    let mut complaint = state
        .store
        .complaint(&id)
        .await
        .map_err(|e| store_failure(&rid, e))?
        .ok_or_else(|| Reject(ApiError::not_found("complaint").with_request_id(&rid)))?;
    let previous = complaint.status;
    if previous == next {
        return Ok(json_response(200, &rid, &complaint));
    }

    let now = unix_millis();
    complaint.status = next;
    complaint.updated_ms = now;
    state
        .store
        .update_complaint(complaint.clone())
        .await
        .map_err(|e| store_failure(&rid, e))?;
    info!(
        request_id = rid,
        complaint = complaint.id.as_str(),
        from = previous.as_str(),
        to = next.as_str(),
        "status updated"
    );

    if next == ComplaintStatus::Completed {
        if let Err(e) = state
            .rewards
            .apply(&complaint.owner, RewardEvent::ResolvedComplaint, now)
            .await
        {
            warn!(request_id = rid, "rewards event failed: {e}");
        }
    }
    match state.store.user(&complaint.owner).await {
        Ok(Some(owner)) => {
            if let Err(e) = state
                .notifier
                .status_changed(&owner.email, &complaint, previous)
                .await
            {
                warn!(request_id = rid, "status email failed: {e}");
            }
        }
        Ok(None) => {}
        Err(e) => warn!(request_id = rid, "owner lookup failed: {e}"),
    }

    Ok(json_response(200, &rid, &complaint))
}

pub(crate) async fn toggle_fake(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    require_admin(&state, &headers, &rid).await?;
    let id = parse_id(&rid, &id)?;
    let mut complaint = state
        .store
        .complaint(&id)
        .await
        .map_err(|e| store_failure(&rid, e))?
        .ok_or_else(|| Reject(ApiError::not_found("complaint").with_request_id(&rid)))?;

    let now = unix_millis();
    if now.saturating_sub(complaint.created_ms) > state.config.fake_flag_window_ms {
        return Err(Reject(
            ApiError::conflict("fake flag window has elapsed").with_request_id(&rid),
        ));
    }
    complaint.is_fake = !complaint.is_fake;
    complaint.updated_ms = now;
    state
        .store
        .update_complaint(complaint.clone())
        .await
        .map_err(|e| store_failure(&rid, e))?;
    Ok(json_response(200, &rid, &complaint))
}

pub(crate) async fn toggle_visibility(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    require_admin(&state, &headers, &rid).await?;
    let id = parse_id(&rid, &id)?;
    let mut complaint = state
        .store
        .complaint(&id)
        .await
        .map_err(|e| store_failure(&rid, e))?
        .ok_or_else(|| Reject(ApiError::not_found("complaint").with_request_id(&rid)))?;
    complaint.is_visible = !complaint.is_visible;
    complaint.updated_ms = unix_millis();
    state
        .store
        .update_complaint(complaint.clone())
        .await
        .map_err(|e| store_failure(&rid, e))?;
    Ok(json_response(200, &rid, &complaint))
}

pub(crate) async fn delete_complaint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let caller = require_caller(&state, &headers, &rid).await?;
    let id = parse_id(&rid, &id)?;
    let complaint = state
        .store
        .complaint(&id)
        .await
        .map_err(|e| store_failure(&rid, e))?
        .ok_or_else(|| Reject(ApiError::not_found("complaint").with_request_id(&rid)))?;
    if complaint.owner != caller.user.id && !caller.is_admin() {
        return Err(Reject(
            ApiError::authorization_denied("owner or admin required").with_request_id(&rid),
        ));
    }
    state
        .store
        .delete_complaint(&id)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    info!(request_id = rid, complaint = id.as_str(), "complaint deleted");
    Ok(json_response(200, &rid, &json!({"status": "deleted"})))
}
