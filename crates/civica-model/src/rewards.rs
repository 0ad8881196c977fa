use crate::ids::UserId;
use serde::{Deserialize, Serialize};

pub const POINTS_COMPLAINT_SUBMITTED: u64 = 15;
pub const POINTS_COMPLAINT_RESOLVED: u64 = 50;
pub const POINTS_VOTE_RECEIVED: u64 = 5;
pub const POINTS_COMMENT_ADDED: u64 = 5;

/// Points per level: level = points / LEVEL_POINTS + 1.
pub const LEVEL_POINTS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeMetric {
    Complaints,
    CompletedComplaints,
    Comments,
    VotesReceived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeSpec {
    pub id: &'static str,
    pub metric: BadgeMetric,
    pub threshold: u64,
    pub bonus: u64,
}

/// Fixed badge catalog; thresholds and one-time bonuses are product
/// constants, not configuration.
#[must_use]
pub const fn badge_catalog() -> &'static [BadgeSpec] {
    &[
        BadgeSpec {
            id: "first-complaint",
            metric: BadgeMetric::Complaints,
            threshold: 1,
            bonus: 25,
        },
        BadgeSpec {
            id: "active-citizen",
            metric: BadgeMetric::Complaints,
            threshold: 5,
            bonus: 50,
        },
        BadgeSpec {
            id: "civic-voice",
            metric: BadgeMetric::Comments,
            threshold: 10,
            bonus: 30,
        },
        BadgeSpec {
            id: "problem-solver",
            metric: BadgeMetric::CompletedComplaints,
            threshold: 5,
            bonus: 75,
        },
        BadgeSpec {
            id: "community-pillar",
            metric: BadgeMetric::VotesReceived,
            threshold: 50,
            bonus: 100,
        },
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewardStats {
    pub complaints: u64,
    pub completed_complaints: u64,
    pub pending_complaints: u64,
    pub votes_received: u64,
    pub comments: u64,
}

impl RewardStats {
    #[must_use]
    pub const fn metric_count(&self, metric: BadgeMetric) -> u64 {
        match metric {
            BadgeMetric::Complaints => self.complaints,
            BadgeMetric::CompletedComplaints => self.completed_complaints,
            BadgeMetric::Comments => self.comments,
            BadgeMetric::VotesReceived => self.votes_received,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BadgeState {
    pub id: String,
    pub unlocked: bool,
    pub progress_pct: u8,
}

/// Source-of-truth counts used by the UPDATE_STATS recomputation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    pub complaints: u64,
    pub completed_complaints: u64,
    pub comments: u64,
    pub votes_received: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardEvent {
    SubmittedComplaint,
    ResolvedComplaint,
    ReceivedVote,
    AddedComment,
}

impl RewardEvent {
    #[must_use]
    pub const fn points(self) -> u64 {
        match self {
            Self::SubmittedComplaint => POINTS_COMPLAINT_SUBMITTED,
            Self::ResolvedComplaint => POINTS_COMPLAINT_RESOLVED,
            Self::ReceivedVote => POINTS_VOTE_RECEIVED,
            Self::AddedComment => POINTS_COMMENT_ADDED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewardsProfile {
    pub user: UserId,
    pub points: u64,
    pub level: u32,
    pub next_level_points: u64,
    pub badges: Vec<BadgeState>,
    pub stats: RewardStats,
    pub updated_ms: u64,
}

impl RewardsProfile {
    #[must_use]
    pub fn new(user: UserId, now_ms: u64) -> Self {
        let badges = badge_catalog()
            .iter()
            .map(|spec| BadgeState {
                id: spec.id.to_string(),
                unlocked: false,
                progress_pct: 0,
            })
            .collect();
        let mut profile = Self {
            user,
            points: 0,
            level: 1,
            next_level_points: LEVEL_POINTS,
            badges,
            stats: RewardStats::default(),
            updated_ms: now_ms,
        };
        profile.refresh_level();
        profile
    }

    /// Applies one qualifying lifecycle event: bump the implied stat,
    /// add the event points, then unlock any newly earned badges and
    /// re-derive level. Unlocked badges never re-lock.
    pub fn apply_event(&mut self, event: RewardEvent, now_ms: u64) {
        match event {
            RewardEvent::SubmittedComplaint => {
                self.stats.complaints += 1;
                self.stats.pending_complaints += 1;
            }
            RewardEvent::ResolvedComplaint => {
                self.stats.completed_complaints += 1;
                self.stats.pending_complaints = self.stats.pending_complaints.saturating_sub(1);
            }
            RewardEvent::ReceivedVote => self.stats.votes_received += 1,
            RewardEvent::AddedComment => self.stats.comments += 1,
        }
        self.points += event.points();
        self.refresh_badges();
        self.refresh_level();
        self.updated_ms = now_ms;
    }

    /// UPDATE_STATS: replace the incrementally maintained stats with
    /// source-of-truth counts and re-derive badges and level. Points
    /// only grow by newly earned badge bonuses, so running this twice
    /// with no intervening events is a no-op.
    pub fn recompute(&mut self, counts: ActivityCounts, now_ms: u64) {
        self.stats = RewardStats {
            complaints: counts.complaints,
            completed_complaints: counts.completed_complaints,
            pending_complaints: counts
                .complaints
                .saturating_sub(counts.completed_complaints),
            votes_received: counts.votes_received,
            comments: counts.comments,
        };
        self.refresh_badges();
        self.refresh_level();
        self.updated_ms = now_ms;
    }

    fn refresh_badges(&mut self) {
        for spec in badge_catalog() {
            let count = self.stats.metric_count(spec.metric);
            let Some(state) = self.badges.iter_mut().find(|b| b.id == spec.id) else {
                // Catalog grew since this profile was written; add the
                // missing badge locked.
                self.badges.push(BadgeState {
                    id: spec.id.to_string(),
                    unlocked: false,
                    progress_pct: 0,
                });
                continue;
            };
            if state.unlocked {
                state.progress_pct = 100;
                continue;
            }
            if count >= spec.threshold {
                state.unlocked = true;
                state.progress_pct = 100;
                self.points += spec.bonus;
            } else {
                let pct = count.saturating_mul(100) / spec.threshold;
                state.progress_pct = pct.min(99) as u8;
            }
        }
    }

    fn refresh_level(&mut self) {
        self.level = (self.points / LEVEL_POINTS + 1) as u32;
        self.next_level_points = u64::from(self.level) * LEVEL_POINTS;
    }
}
