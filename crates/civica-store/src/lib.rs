#![forbid(unsafe_code)]

use async_trait::async_trait;
use civica_model::{
    ActivityCounts, Category, Complaint, ComplaintId, ComplaintStatus, EmailAddress, Feedback,
    FeedbackText, RewardsProfile, Role, User, UserId,
};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const CRATE_NAME: &str = "civica-store";

#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for StoreError {}

/// Filter for complaint listings. `visible_only` hides complaints with
/// `is_visible = false` except those owned by `include_owner`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplaintQuery {
    pub text: Option<String>,
    pub category: Option<Category>,
    pub status: Option<ComplaintStatus>,
    pub owner: Option<UserId>,
    pub visible_only: bool,
    pub include_owner: Option<UserId>,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplaintPage {
    pub complaints: Vec<Complaint>,
    pub total: u64,
}

/// Result of the atomic vote write (record insert + counter bump).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Added { votes: u64 },
    Duplicate,
    MissingComplaint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnvoteOutcome {
    Removed { votes: u64 },
    Missing,
    MissingComplaint,
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn upsert_user(&self, user: User) -> Result<(), StoreError>;
    async fn user(&self, id: &UserId) -> Result<Option<User>, StoreError>;
    async fn user_by_email(&self, email: &EmailAddress) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn set_role(&self, id: &UserId, role: Role) -> Result<bool, StoreError>;
    async fn set_active(&self, id: &UserId, active: bool) -> Result<bool, StoreError>;
    async fn delete_user(&self, id: &UserId) -> Result<bool, StoreError>;

    async fn insert_complaint(&self, complaint: Complaint) -> Result<(), StoreError>;
    async fn complaint(&self, id: &ComplaintId) -> Result<Option<Complaint>, StoreError>;
    async fn update_complaint(&self, complaint: Complaint) -> Result<bool, StoreError>;
    async fn delete_complaint(&self, id: &ComplaintId) -> Result<bool, StoreError>;
    async fn list_complaints(&self, query: &ComplaintQuery) -> Result<ComplaintPage, StoreError>;
    async fn count_by_status(&self) -> Result<Vec<(ComplaintStatus, u64)>, StoreError>;
    /// Counts non-terminal complaints created at or before the cutoff.
    async fn count_long_pending(&self, created_before_ms: u64) -> Result<u64, StoreError>;

    /// Inserts the (complaint, user) vote record and bumps the
    /// denormalized counter as one atomic operation.
    async fn add_vote(
        &self,
        complaint: &ComplaintId,
        user: &UserId,
        now_ms: u64,
    ) -> Result<VoteOutcome, StoreError>;
    /// Removes the vote record and decrements the counter, floored at
    /// zero, as one atomic operation.
    async fn remove_vote(
        &self,
        complaint: &ComplaintId,
        user: &UserId,
    ) -> Result<UnvoteOutcome, StoreError>;
    async fn count_votes(&self, complaint: &ComplaintId) -> Result<u64, StoreError>;

    async fn insert_feedback(
        &self,
        complaint: &ComplaintId,
        user: &UserId,
        text: FeedbackText,
        now_ms: u64,
    ) -> Result<Feedback, StoreError>;
    /// Newest-first, no pagination ceiling.
    async fn list_feedback(&self, complaint: &ComplaintId) -> Result<Vec<Feedback>, StoreError>;

    async fn rewards(&self, user: &UserId) -> Result<Option<RewardsProfile>, StoreError>;
    /// Whole-document write, last-writer-wins.
    async fn put_rewards(&self, profile: RewardsProfile) -> Result<(), StoreError>;
    /// Source-of-truth counts backing the UPDATE_STATS recomputation.
    async fn user_activity_counts(&self, user: &UserId) -> Result<ActivityCounts, StoreError>;
}
