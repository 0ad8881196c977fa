use crate::http::complaints::parse_id;
use crate::http::{
    invalid, json_response, parse_json_body, request_id, require_admin, require_caller,
    store_failure, Reject,
};
use crate::{unix_millis, AppState};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use civica_api::{
    parse_list_params, ApiError, ComplaintListResponse, PageInfo, RoleChangeRequest,
};
use civica_model::{EmailAddress, Role, User, UserId};
use civica_store::ComplaintQuery;
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

/// Placeholder id used when the configured super-admin has never
/// signed in; replaced by the real principal on first sign-in.
const SUPER_ADMIN_PLACEHOLDER_ID: &str = "super-admin";

pub(crate) async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    require_admin(&state, &headers, &rid).await?;

    let by_status = state
        .store
        .count_by_status()
        .await
        .map_err(|e| store_failure(&rid, e))?;
    let total: u64 = by_status.iter().map(|(_, n)| n).sum();
    let mut tiles = serde_json::Map::new();
    for (status, count) in &by_status {
        tiles.insert(status.as_str().to_string(), json!(count));
    }

    let long_pending = match unix_millis().checked_sub(state.config.long_pending_after_ms) {
        Some(cutoff) => state
            .store
            .count_long_pending(cutoff)
            .await
            .map_err(|e| store_failure(&rid, e))?,
        None => 0,
    };

    Ok(json_response(
        200,
        &rid,
        &json!({
            "by_status": tiles,
            "total": total,
            "long_pending": long_pending,
        }),
    ))
}

pub(crate) async fn list_all_complaints(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    require_admin(&state, &headers, &rid).await?;
    let list = parse_list_params(
        &params,
        state.config.default_page_size,
        state.config.max_page_size,
    )
    .map_err(|e| Reject(e.with_request_id(&rid)))?;

    let offset = list.offset();
    let query = ComplaintQuery {
        text: list.text,
        category: list.category,
        status: list.status,
        owner: None,
        visible_only: false,
        include_owner: None,
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

/// Force-synchronizes the configured super-admin document so the
/// console always shows it with the resolved role, then lists users.
pub(crate) async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    require_admin(&state, &headers, &rid).await?;

    let super_admin = state
        .store
        .user_by_email(&state.config.super_admin_email)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    match super_admin {
        Some(user) if user.role != Role::SuperAdmin => {
            state
                .store
                .set_role(&user.id, Role::SuperAdmin)
                .await
                .map_err(|e| store_failure(&rid, e))?;
        }
        Some(_) => {}
        None => {
            let Ok(id) = UserId::parse(SUPER_ADMIN_PLACEHOLDER_ID) else {
                return Err(Reject(
                    ApiError::new(
                        civica_api::ApiErrorCode::Internal,
                        "super-admin placeholder id invalid",
                        json!({}),
                        rid.as_str(),
                    ),
                ));
            };
            let mut user = User::new(
                id,
                state.config.super_admin_email.clone(),
                String::new(),
                unix_millis(),
            );
            user.role = Role::SuperAdmin;
            state
                .store
                .upsert_user(user)
                .await
                .map_err(|e| store_failure(&rid, e))?;
        }
    }

    let users = state
        .store
        .list_users()
        .await
        .map_err(|e| store_failure(&rid, e))?;
    Ok(json_response(200, &rid, &json!({"users": users})))
}

pub(crate) async fn change_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    let caller = require_caller(&state, &headers, &rid).await?;
    if caller.role != Role::SuperAdmin {
        return Err(Reject(
            ApiError::authorization_denied("super-admin role required").with_request_id(&rid),
        ));
    }

    let req: RoleChangeRequest = parse_json_body(&rid, &body)?;
    let email = EmailAddress::parse(&req.email).map_err(|e| invalid(&rid, e))?;
    let role = Role::parse(&req.role).map_err(|e| invalid(&rid, e))?;
    if role == Role::SuperAdmin {
        return Err(invalid(&rid, "role must be user or admin"));
    }
    if email == state.config.super_admin_email {
        return Err(Reject(
            ApiError::conflict("the super-admin role is fixed").with_request_id(&rid),
        ));
    }

    let user = state
        .store
        .user_by_email(&email)
        .await
        .map_err(|e| store_failure(&rid, e))?
        .ok_or_else(|| Reject(ApiError::not_found("user").with_request_id(&rid)))?;
    state
        .store
        .set_role(&user.id, role)
        .await
        .map_err(|e| store_failure(&rid, e))?;
    info!(
        request_id = rid,
        user = user.id.as_str(),
        role = role.as_str(),
        "role changed"
    );
    Ok(json_response(
        200,
        &rid,
        &json!({"email": email, "role": role}),
    ))
}

pub(crate) async fn report_long_pending(
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
    if complaint.status.is_terminal() {
        return Err(Reject(
            ApiError::conflict("complaint is already closed").with_request_id(&rid),
        ));
    }
    let now = unix_millis();
    if now.saturating_sub(complaint.created_ms) < state.config.long_pending_after_ms {
        return Err(Reject(
            ApiError::conflict("complaint is not long-pending yet").with_request_id(&rid),
        ));
    }
    if complaint.reported_to_super_admin {
        return Err(Reject(
            ApiError::conflict("complaint already reported").with_request_id(&rid),
        ));
    }

    complaint.reported_to_super_admin = true;
    complaint.updated_ms = now;
    state
        .store
        .update_complaint(complaint.clone())
        .await
        .map_err(|e| store_failure(&rid, e))?;
    if let Err(e) = state
        .notifier
        .long_pending_reported(&state.config.super_admin_email, &complaint)
        .await
    {
        warn!(request_id = rid, "report email failed: {e}");
    }
    Ok(json_response(200, &rid, &complaint))
}
