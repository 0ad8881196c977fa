use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Error taxonomy surfaced by every endpoint as `{"error": ApiError}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiErrorCode {
    AuthenticationRequired,
    AuthorizationDenied,
    ValidationFailed,
    NotFound,
    Conflict,
    PayloadTooLarge,
    UpstreamFailure,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
    pub request_id: String,
}

impl ApiError {
    #[must_use]
    pub fn new(
        code: ApiErrorCode,
        message: impl Into<String>,
        details: Value,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            request_id: request_id.into(),
        }
    }

    #[must_use]
    pub fn authentication_required() -> Self {
        Self::new(
            ApiErrorCode::AuthenticationRequired,
            "authentication required",
            json!({}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn authorization_denied(reason: &str) -> Self {
        Self::new(
            ApiErrorCode::AuthorizationDenied,
            "authorization denied",
            json!({"reason": reason}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            message,
            json!({}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(
            ApiErrorCode::NotFound,
            format!("{what} not found"),
            json!({"resource": what}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message, json!({}), "req-unknown")
    }

    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(
            ApiErrorCode::UpstreamFailure,
            message,
            json!({}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = request_id.to_string();
        self
    }
}

/// Maps a wire error to its conventional HTTP status code.
#[must_use]
pub fn map_error(error: &ApiError) -> u16 {
    match error.code {
        ApiErrorCode::AuthenticationRequired => 401,
        ApiErrorCode::AuthorizationDenied => 403,
        ApiErrorCode::ValidationFailed => 400,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::Conflict => 409,
        ApiErrorCode::PayloadTooLarge => 413,
        ApiErrorCode::UpstreamFailure => 502,
        ApiErrorCode::Internal => 500,
    }
}

const _: fn() = || {
    fn assert_traits<T: Serialize + for<'de> Deserialize<'de>>() {}
    assert_traits::<ApiErrorCode>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_conventional() {
        assert_eq!(map_error(&ApiError::authentication_required()), 401);
        assert_eq!(map_error(&ApiError::authorization_denied("role")), 403);
        assert_eq!(map_error(&ApiError::validation_failed("bad")), 400);
        assert_eq!(map_error(&ApiError::not_found("complaint")), 404);
        assert_eq!(map_error(&ApiError::conflict("duplicate vote")), 409);
        assert_eq!(map_error(&ApiError::upstream("db down")), 502);
    }

    #[test]
    fn error_serializes_code_as_variant_name() {
        let err = ApiError::conflict("duplicate vote").with_request_id("req-1");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "Conflict");
        assert_eq!(json["request_id"], "req-1");
    }
}
