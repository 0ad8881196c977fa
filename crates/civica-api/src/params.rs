use crate::errors::ApiError;
use civica_model::{Category, ComplaintStatus};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: usize,
    pub per_page: usize,
    pub text: Option<String>,
    pub category: Option<Category>,
    pub status: Option<ComplaintStatus>,
    pub public: bool,
}

impl ListParams {
    /// Zero-based row offset for this page. Saturates so absurd page
    /// numbers yield an empty page instead of overflowing.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// Parses the complaint list query string. `page` is 1-based;
/// `per_page` is clamped to the configured ceiling.
pub fn parse_list_params(
    params: &HashMap<String, String>,
    default_per_page: usize,
    max_per_page: usize,
) -> Result<ListParams, ApiError> {
    let page = match params.get("page") {
        None => 1,
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| ApiError::validation_failed("page must be a positive integer"))?,
    };
    let per_page = match params.get("per_page") {
        None => default_per_page,
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| ApiError::validation_failed("per_page must be a positive integer"))?,
    }
    .min(max_per_page);

    let text = params
        .get("q")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let category = match params.get("category") {
        None => None,
        Some(raw) => Some(
            Category::parse(raw).map_err(|e| ApiError::validation_failed(e.to_string()))?,
        ),
    };
    let status = match params.get("status") {
        None => None,
        Some(raw) => Some(
            ComplaintStatus::parse(raw).map_err(|e| ApiError::validation_failed(e.to_string()))?,
        ),
    };
    let public = params
        .get("public")
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    Ok(ListParams {
        page,
        per_page,
        text,
        category,
        status,
        public,
    })
}
