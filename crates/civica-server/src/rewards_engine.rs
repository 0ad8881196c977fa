use civica_model::{RewardEvent, RewardsProfile, UserId};
use civica_store::{DocumentStore, StoreError};
use std::sync::Arc;

/// In-process rewards application: read the profile, mutate, write it
/// back whole-document. Writes are last-writer-wins; concurrent events
/// for the same user may lose a bump, which the refresh endpoint
/// repairs from source-of-truth counts.
#[derive(Clone)]
pub struct RewardsEngine {
    store: Arc<dyn DocumentStore>,
}

impl RewardsEngine {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load_or_create(
        &self,
        user: &UserId,
        now_ms: u64,
    ) -> Result<RewardsProfile, StoreError> {
        match self.store.rewards(user).await? {
            Some(profile) => Ok(profile),
            None => Ok(RewardsProfile::new(user.clone(), now_ms)),
        }
    }

    /// Caller's profile, persisted zeroed on first read.
    pub async fn profile(&self, user: &UserId, now_ms: u64) -> Result<RewardsProfile, StoreError> {
        match self.store.rewards(user).await? {
            Some(profile) => Ok(profile),
            None => {
                let profile = RewardsProfile::new(user.clone(), now_ms);
                self.store.put_rewards(profile.clone()).await?;
                Ok(profile)
            }
        }
    }

    pub async fn apply(
        &self,
        user: &UserId,
        event: RewardEvent,
        now_ms: u64,
    ) -> Result<RewardsProfile, StoreError> {
        let mut profile = self.load_or_create(user, now_ms).await?;
        profile.apply_event(event, now_ms);
        self.store.put_rewards(profile.clone()).await?;
        Ok(profile)
    }

    /// UPDATE_STATS: recompute from the store's activity counts.
    pub async fn refresh(&self, user: &UserId, now_ms: u64) -> Result<RewardsProfile, StoreError> {
        let counts = self.store.user_activity_counts(user).await?;
        let mut profile = self.load_or_create(user, now_ms).await?;
        profile.recompute(counts, now_ms);
        self.store.put_rewards(profile.clone()).await?;
        Ok(profile)
    }
}
