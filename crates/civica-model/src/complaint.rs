use crate::ids::{ComplaintId, Description, FeedbackText, Title, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const ADDRESS_MAX_LEN: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Pothole,
    Garbage,
    StreetLight,
    WaterSupply,
    Sewage,
    Electricity,
    Other,
}

impl Category {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "pothole" => Ok(Self::Pothole),
            "garbage" => Ok(Self::Garbage),
            "street-light" => Ok(Self::StreetLight),
            "water-supply" => Ok(Self::WaterSupply),
            "sewage" => Ok(Self::Sewage),
            "electricity" => Ok(Self::Electricity),
            "other" => Ok(Self::Other),
            other => Err(ValidationError(format!("unknown category: {other}"))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pothole => "pothole",
            Self::Garbage => "garbage",
            Self::StreetLight => "street-light",
            Self::WaterSupply => "water-supply",
            Self::Sewage => "sewage",
            Self::Electricity => "electricity",
            Self::Other => "other",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl ComplaintStatus {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "pending" => Ok(Self::Pending),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            other => Err(ValidationError(format!(
                "status must be one of pending/in-progress/completed/rejected, got {other}"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    /// Terminal statuses cannot be long-pending or reported.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    pub const fn all() -> [Self; 4] {
        [
            Self::Pending,
            Self::InProgress,
            Self::Completed,
            Self::Rejected,
        ]
    }
}

impl Display for ComplaintStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl Location {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError(
                "latitude must be within [-90, 90]".to_string(),
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError(
                "longitude must be within [-180, 180]".to_string(),
            ));
        }
        let address = self.address.trim();
        if address.is_empty() {
            return Err(ValidationError("address must not be empty".to_string()));
        }
        if address.len() > ADDRESS_MAX_LEN {
            return Err(ValidationError(format!(
                "address exceeds max length {ADDRESS_MAX_LEN}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Complaint {
    pub id: ComplaintId,
    pub owner: UserId,
    pub title: Title,
    pub description: Description,
    pub category: Category,
    pub status: ComplaintStatus,
    pub location: Location,
    pub image_urls: Vec<String>,
    pub votes: u64,
    pub is_fake: bool,
    pub is_visible: bool,
    pub reported_to_super_admin: bool,
    pub created_ms: u64,
    pub updated_ms: u64,
}

impl Complaint {
    /// New complaints always start pending, visible, un-flagged and
    /// with a zeroed vote counter.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn submit(
        id: ComplaintId,
        owner: UserId,
        title: Title,
        description: Description,
        category: Category,
        location: Location,
        image_urls: Vec<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            owner,
            title,
            description,
            category,
            status: ComplaintStatus::Pending,
            location,
            image_urls,
            votes: 0,
            is_fake: false,
            is_visible: true,
            reported_to_super_admin: false,
            created_ms: now_ms,
            updated_ms: now_ms,
        }
    }

    #[must_use]
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.title.as_str().to_ascii_lowercase().contains(&needle)
            || self
                .description
                .as_str()
                .to_ascii_lowercase()
                .contains(&needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Vote {
    pub complaint: ComplaintId,
    pub user: UserId,
    pub created_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Feedback {
    pub id: u64,
    pub complaint: ComplaintId,
    pub user: UserId,
    pub text: FeedbackText,
    pub created_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_only_the_four_values() {
        for s in ComplaintStatus::all() {
            assert_eq!(ComplaintStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(ComplaintStatus::parse("done").is_err());
        assert!(ComplaintStatus::parse("").is_err());
    }

    #[test]
    fn location_bounds_are_enforced() {
        let mut loc = Location {
            latitude: 12.97,
            longitude: 77.59,
            address: "MG Road".to_string(),
        };
        assert!(loc.validate().is_ok());
        loc.latitude = 91.0;
        assert!(loc.validate().is_err());
        loc.latitude = 12.97;
        loc.longitude = -181.0;
        assert!(loc.validate().is_err());
        loc.longitude = 77.59;
        loc.address = " ".to_string();
        assert!(loc.validate().is_err());
    }

    #[test]
    fn submit_sets_lifecycle_defaults() {
        let c = Complaint::submit(
            ComplaintId::from_seed(1),
            UserId::parse("u1").unwrap(),
            Title::parse("Broken light").unwrap(),
            Description::parse("Street light out on 5th").unwrap(),
            Category::StreetLight,
            Location {
                latitude: 0.0,
                longitude: 0.0,
                address: "5th Ave".to_string(),
            },
            vec!["https://img.example/1.jpg".to_string()],
            42,
        );
        assert_eq!(c.status, ComplaintStatus::Pending);
        assert_eq!(c.votes, 0);
        assert!(c.is_visible);
        assert!(!c.is_fake);
        assert!(!c.reported_to_super_admin);
        assert!(c.matches_text("LIGHT"));
        assert!(!c.matches_text("garbage"));
    }
}
