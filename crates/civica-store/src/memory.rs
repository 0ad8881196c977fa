use crate::{
    ComplaintPage, ComplaintQuery, DocumentStore, StoreError, UnvoteOutcome, VoteOutcome,
};
use async_trait::async_trait;
use civica_model::{
    ActivityCounts, Complaint, ComplaintId, ComplaintStatus, EmailAddress, Feedback, FeedbackText,
    RewardsProfile, Role, User, UserId, Vote,
};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    complaints: HashMap<ComplaintId, Complaint>,
    votes: HashMap<(ComplaintId, UserId), Vote>,
    feedback: Vec<Feedback>,
    rewards: HashMap<UserId, RewardsProfile>,
    feedback_seq: u64,
}

/// In-memory backend for tests and local development. A single mutex
/// over all collections makes the vote record + counter write atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn filtered<'a>(inner: &'a Inner, query: &ComplaintQuery) -> Vec<&'a Complaint> {
    let mut rows: Vec<&Complaint> = inner
        .complaints
        .values()
        .filter(|c| {
            if let Some(category) = query.category {
                if c.category != category {
                    return false;
                }
            }
            if let Some(status) = query.status {
                if c.status != status {
                    return false;
                }
            }
            if let Some(owner) = &query.owner {
                if &c.owner != owner {
                    return false;
                }
            }
            if query.visible_only && !c.is_visible {
                if query.include_owner.as_ref() != Some(&c.owner) {
                    return false;
                }
            }
            if let Some(text) = &query.text {
                if !c.matches_text(text) {
                    return false;
                }
            }
            true
        })
        .collect();
    rows.sort_by(|a, b| {
        b.created_ms
            .cmp(&a.created_ms)
            .then_with(|| b.id.cmp(&a.id))
    });
    rows
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert_user(&self, user: User) -> Result<(), StoreError> {
        self.inner.lock().await.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.users.get(id).cloned())
    }

    async fn user_by_email(&self, email: &EmailAddress) -> Result<Option<User>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.inner.lock().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn set_role(&self, id: &UserId, role: Role) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.users.get_mut(id) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_active(&self, id: &UserId, active: bool) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.users.get_mut(id) {
            Some(user) => {
                user.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: &UserId) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.users.remove(id).is_some())
    }

    async fn insert_complaint(&self, complaint: Complaint) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .complaints
            .insert(complaint.id.clone(), complaint);
        Ok(())
    }

    async fn complaint(&self, id: &ComplaintId) -> Result<Option<Complaint>, StoreError> {
        Ok(self.inner.lock().await.complaints.get(id).cloned())
    }

    async fn update_complaint(&self, complaint: Complaint) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.complaints.contains_key(&complaint.id) {
            return Ok(false);
        }
        inner.complaints.insert(complaint.id.clone(), complaint);
        Ok(true)
    }

    async fn delete_complaint(&self, id: &ComplaintId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let removed = inner.complaints.remove(id).is_some();
        if removed {
            inner.votes.retain(|(complaint, _), _| complaint != id);
            inner.feedback.retain(|f| &f.complaint != id);
        }
        Ok(removed)
    }

    async fn list_complaints(&self, query: &ComplaintQuery) -> Result<ComplaintPage, StoreError> {
        let inner = self.inner.lock().await;
        let rows = filtered(&inner, query);
        let total = rows.len() as u64;
        let complaints = rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();
        Ok(ComplaintPage { complaints, total })
    }

    async fn count_by_status(&self) -> Result<Vec<(ComplaintStatus, u64)>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(ComplaintStatus::all()
            .into_iter()
            .map(|status| {
                let count = inner
                    .complaints
                    .values()
                    .filter(|c| c.status == status)
                    .count() as u64;
                (status, count)
            })
            .collect())
    }

    async fn count_long_pending(&self, created_before_ms: u64) -> Result<u64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .complaints
            .values()
            .filter(|c| !c.status.is_terminal() && c.created_ms <= created_before_ms)
            .count() as u64)
    }

    async fn add_vote(
        &self,
        complaint: &ComplaintId,
        user: &UserId,
        now_ms: u64,
    ) -> Result<VoteOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.complaints.contains_key(complaint) {
            return Ok(VoteOutcome::MissingComplaint);
        }
        let key = (complaint.clone(), user.clone());
        if inner.votes.contains_key(&key) {
            return Ok(VoteOutcome::Duplicate);
        }
        inner.votes.insert(
            key,
            Vote {
                complaint: complaint.clone(),
                user: user.clone(),
                created_ms: now_ms,
            },
        );
        let entry = inner
            .complaints
            .get_mut(complaint)
            .ok_or_else(|| StoreError("complaint vanished during vote".to_string()))?;
        entry.votes += 1;
        entry.updated_ms = now_ms;
        Ok(VoteOutcome::Added { votes: entry.votes })
    }

    async fn remove_vote(
        &self,
        complaint: &ComplaintId,
        user: &UserId,
    ) -> Result<UnvoteOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.complaints.contains_key(complaint) {
            return Ok(UnvoteOutcome::MissingComplaint);
        }
        let key = (complaint.clone(), user.clone());
        if inner.votes.remove(&key).is_none() {
            return Ok(UnvoteOutcome::Missing);
        }
        let entry = inner
            .complaints
            .get_mut(complaint)
            .ok_or_else(|| StoreError("complaint vanished during unvote".to_string()))?;
        entry.votes = entry.votes.saturating_sub(1);
        Ok(UnvoteOutcome::Removed { votes: entry.votes })
    }

    async fn count_votes(&self, complaint: &ComplaintId) -> Result<u64, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .votes
            .keys()
            .filter(|(c, _)| c == complaint)
            .count() as u64)
    }

    async fn insert_feedback(
        &self,
        complaint: &ComplaintId,
        user: &UserId,
        text: FeedbackText,
        now_ms: u64,
    ) -> Result<Feedback, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.feedback_seq += 1;
        let entry = Feedback {
            id: inner.feedback_seq,
            complaint: complaint.clone(),
            user: user.clone(),
            text,
            created_ms: now_ms,
        };
        inner.feedback.push(entry.clone());
        Ok(entry)
    }

    async fn list_feedback(&self, complaint: &ComplaintId) -> Result<Vec<Feedback>, StoreError> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<Feedback> = inner
            .feedback
            .iter()
            .filter(|f| &f.complaint == complaint)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_ms.cmp(&a.created_ms).then_with(|| b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn rewards(&self, user: &UserId) -> Result<Option<RewardsProfile>, StoreError> {
        Ok(self.inner.lock().await.rewards.get(user).cloned())
    }

    async fn put_rewards(&self, profile: RewardsProfile) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .rewards
            .insert(profile.user.clone(), profile);
        Ok(())
    }

    async fn user_activity_counts(&self, user: &UserId) -> Result<ActivityCounts, StoreError> {
        let inner = self.inner.lock().await;
        let complaints = inner
            .complaints
            .values()
            .filter(|c| &c.owner == user)
            .count() as u64;
        let completed_complaints = inner
            .complaints
            .values()
            .filter(|c| &c.owner == user && c.status == ComplaintStatus::Completed)
            .count() as u64;
        let comments = inner.feedback.iter().filter(|f| &f.user == user).count() as u64;
        let votes_received = inner
            .votes
            .values()
            .filter(|v| {
                inner
                    .complaints
                    .get(&v.complaint)
                    .is_some_and(|c| &c.owner == user)
            })
            .count() as u64;
        Ok(ActivityCounts {
            complaints,
            completed_complaints,
            comments,
            votes_received,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civica_model::{Category, Description, Location, Title};

    fn complaint(seed: u64, owner: &str, now_ms: u64) -> Complaint {
        Complaint::submit(
            ComplaintId::from_seed(seed),
            UserId::parse(owner).unwrap(),
            Title::parse(&format!("title {seed}")).unwrap(),
            Description::parse("overflowing garbage bin").unwrap(),
            Category::Garbage,
            Location {
                latitude: 1.0,
                longitude: 2.0,
                address: "Main St".to_string(),
            },
            vec!["https://img.example/a.jpg".to_string()],
            now_ms,
        )
    }

    #[tokio::test]
    async fn vote_then_unvote_restores_counter() {
        let store = MemoryStore::new();
        store.insert_complaint(complaint(1, "owner", 10)).await.unwrap();
        let id = ComplaintId::from_seed(1);
        let voter = UserId::parse("voter").unwrap();

        let outcome = store.add_vote(&id, &voter, 20).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Added { votes: 1 });
        assert_eq!(
            store.add_vote(&id, &voter, 21).await.unwrap(),
            VoteOutcome::Duplicate
        );
        assert_eq!(store.complaint(&id).await.unwrap().unwrap().votes, 1);

        let outcome = store.remove_vote(&id, &voter).await.unwrap();
        assert_eq!(outcome, UnvoteOutcome::Removed { votes: 0 });
        assert_eq!(
            store.remove_vote(&id, &voter).await.unwrap(),
            UnvoteOutcome::Missing
        );
        assert_eq!(store.count_votes(&id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn listing_applies_visibility_and_text_filters() {
        let store = MemoryStore::new();
        let mut hidden = complaint(1, "alice", 10);
        hidden.is_visible = false;
        store.insert_complaint(hidden).await.unwrap();
        store.insert_complaint(complaint(2, "bob", 20)).await.unwrap();

        let public = store
            .list_complaints(&ComplaintQuery {
                visible_only: true,
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(public.total, 1);
        assert_eq!(public.complaints[0].id, ComplaintId::from_seed(2));

        let with_own = store
            .list_complaints(&ComplaintQuery {
                visible_only: true,
                include_owner: Some(UserId::parse("alice").unwrap()),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(with_own.total, 2);
        // Newest first.
        assert_eq!(with_own.complaints[0].id, ComplaintId::from_seed(2));

        let text = store
            .list_complaints(&ComplaintQuery {
                text: Some("TITLE 2".to_string()),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(text.total, 1);
    }

    #[tokio::test]
    async fn long_pending_count_skips_terminal_complaints() {
        let store = MemoryStore::new();
        store.insert_complaint(complaint(1, "alice", 10)).await.unwrap();
        let mut done = complaint(2, "alice", 10);
        done.status = ComplaintStatus::Completed;
        store.insert_complaint(done).await.unwrap();
        store.insert_complaint(complaint(3, "bob", 500)).await.unwrap();

        assert_eq!(store.count_long_pending(100).await.unwrap(), 1);
        assert_eq!(store.count_long_pending(500).await.unwrap(), 2);
        assert_eq!(store.count_long_pending(5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn activity_counts_reflect_source_of_truth() {
        let store = MemoryStore::new();
        let owner = UserId::parse("alice").unwrap();
        store.insert_complaint(complaint(1, "alice", 10)).await.unwrap();
        let mut done = complaint(2, "alice", 11);
        done.status = ComplaintStatus::Completed;
        store.insert_complaint(done).await.unwrap();
        store.insert_complaint(complaint(3, "bob", 12)).await.unwrap();

        let voter = UserId::parse("bob").unwrap();
        store
            .add_vote(&ComplaintId::from_seed(1), &voter, 13)
            .await
            .unwrap();
        store
            .insert_feedback(
                &ComplaintId::from_seed(3),
                &owner,
                FeedbackText::parse("any update?").unwrap(),
                14,
            )
            .await
            .unwrap();

        let counts = store.user_activity_counts(&owner).await.unwrap();
        assert_eq!(counts.complaints, 2);
        assert_eq!(counts.completed_complaints, 1);
        assert_eq!(counts.comments, 1);
        assert_eq!(counts.votes_received, 1);
    }
}
