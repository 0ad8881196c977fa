#![forbid(unsafe_code)]

mod dto;
mod errors;
mod params;

pub use dto::{
    ComplaintListResponse, CreateComplaintRequest, FeedbackRequest, IdentityEvent,
    IdentityEventKind, ImageUploadResponse, PageInfo, RoleChangeRequest, UpdateStatusRequest,
};
pub use errors::{map_error, ApiError, ApiErrorCode};
pub use params::{parse_list_params, ListParams};

pub const CRATE_NAME: &str = "civica-api";
