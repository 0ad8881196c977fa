#![forbid(unsafe_code)]
//! Civica model SSOT.
//!
//! ```compile_fail
//! use civica_model::ComplaintStatus;
//!
//! fn exhaustive_match(s: ComplaintStatus) -> &'static str {
//!     match s {
//!         ComplaintStatus::Pending => "p",
//!         ComplaintStatus::InProgress => "i",
//!         ComplaintStatus::Completed => "c",
//!     }
//! }
//! ```

mod complaint;
mod ids;
mod rewards;
mod user;

pub use complaint::{
    Category, Complaint, ComplaintStatus, Feedback, Location, Vote, ADDRESS_MAX_LEN,
};
pub use ids::{
    parse_complaint_id, parse_email, parse_user_id, ComplaintId, Description, EmailAddress,
    FeedbackText, Title, UserId, ValidationError, DESCRIPTION_MAX_LEN, EMAIL_MAX_LEN, ID_MAX_LEN,
    TEXT_MAX_LEN, TITLE_MAX_LEN,
};
pub use rewards::{
    badge_catalog, ActivityCounts, BadgeMetric, BadgeSpec, BadgeState, RewardEvent, RewardStats,
    RewardsProfile, LEVEL_POINTS, POINTS_COMMENT_ADDED, POINTS_COMPLAINT_RESOLVED,
    POINTS_COMPLAINT_SUBMITTED, POINTS_VOTE_RECEIVED,
};
pub use user::{Role, User};

pub const CRATE_NAME: &str = "civica-model";
