use crate::http::{invalid, json_response, request_id, require_caller, Reject};
use crate::{images::sniff_image, AppState};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use civica_api::{ApiError, ApiErrorCode, ImageUploadResponse};
use serde_json::json;
use tracing::{error, info};

pub(crate) async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Reject> {
    let rid = request_id(&headers, &state);
    require_caller(&state, &headers, &rid).await?;

    if body.len() > state.config.max_image_bytes {
        return Err(Reject(ApiError::new(
            ApiErrorCode::PayloadTooLarge,
            "image exceeds size limit",
            json!({"max_bytes": state.config.max_image_bytes}),
            rid.as_str(),
        )));
    }
    let Some(content_type) = sniff_image(&body) else {
        return Err(invalid(&rid, "unsupported image format; expected JPEG, PNG or GIF"));
    };

    let url = state
        .images
        .upload(&body, content_type)
        .await
        .map_err(|e| {
            error!(request_id = rid, "image upload failed: {e}");
            Reject(ApiError::upstream("image host unavailable").with_request_id(&rid))
        })?;
    info!(request_id = rid, bytes = body.len(), content_type, "image uploaded");
    Ok(json_response(201, &rid, &ImageUploadResponse { url }))
}
