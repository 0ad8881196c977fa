use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub const ID_MAX_LEN: usize = 64;
pub const EMAIL_MAX_LEN: usize = 254;
pub const TITLE_MAX_LEN: usize = 120;
pub const DESCRIPTION_MAX_LEN: usize = 4000;
pub const TEXT_MAX_LEN: usize = 2000;

pub fn parse_user_id(input: &str) -> Result<UserId, ValidationError> {
    UserId::parse(input)
}

pub fn parse_complaint_id(input: &str) -> Result<ComplaintId, ValidationError> {
    ComplaintId::parse(input)
}

pub fn parse_email(input: &str) -> Result<EmailAddress, ValidationError> {
    EmailAddress::parse(input)
}

/// Identity-provider subject id. Opaque to the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("user id must not be empty".to_string()));
        }
        if s.len() > ID_MAX_LEN {
            return Err(ValidationError(format!(
                "user id exceeds max length {ID_MAX_LEN}"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError(
                "user id must match [A-Za-z0-9_-]+".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-generated complaint id, `cmp-<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ComplaintId(String);

impl ComplaintId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError(
                "complaint id must not be empty".to_string(),
            ));
        }
        if s.len() > ID_MAX_LEN {
            return Err(ValidationError(format!(
                "complaint id exceeds max length {ID_MAX_LEN}"
            )));
        }
        let Some(tail) = s.strip_prefix("cmp-") else {
            return Err(ValidationError(
                "complaint id must start with cmp-".to_string(),
            ));
        };
        if tail.is_empty() || !tail.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError(
                "complaint id suffix must be hex".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self(format!("cmp-{seed:016x}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ComplaintId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim().to_ascii_lowercase();
        if s.is_empty() {
            return Err(ValidationError("email must not be empty".to_string()));
        }
        if s.len() > EMAIL_MAX_LEN {
            return Err(ValidationError(format!(
                "email exceeds max length {EMAIL_MAX_LEN}"
            )));
        }
        let Some((local, domain)) = s.split_once('@') else {
            return Err(ValidationError("email must contain '@'".to_string()));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(ValidationError(
                "email must be <local>@<domain>".to_string(),
            ));
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(ValidationError("email domain is malformed".to_string()));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ValidationError(
                "email must not contain whitespace".to_string(),
            ));
        }
        Ok(Self(s))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Title(String);

impl Title {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("title must not be empty".to_string()));
        }
        if s.len() > TITLE_MAX_LEN {
            return Err(ValidationError(format!(
                "title exceeds max length {TITLE_MAX_LEN}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Title {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Description(String);

impl Description {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError(
                "description must not be empty".to_string(),
            ));
        }
        if s.len() > DESCRIPTION_MAX_LEN {
            return Err(ValidationError(format!(
                "description exceeds max length {DESCRIPTION_MAX_LEN}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackText(String);

impl FeedbackText {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError(
                "feedback text must not be empty".to_string(),
            ));
        }
        if s.len() > TEXT_MAX_LEN {
            return Err(ValidationError(format!(
                "feedback text exceeds max length {TEXT_MAX_LEN}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_rejects_empty_and_bad_chars() {
        assert!(UserId::parse("").is_err());
        assert!(UserId::parse("has space").is_err());
        assert!(UserId::parse(&"x".repeat(ID_MAX_LEN + 1)).is_err());
        assert_eq!(UserId::parse(" usr_1 ").unwrap().as_str(), "usr_1");
    }

    #[test]
    fn complaint_id_requires_cmp_prefix_and_hex_suffix() {
        assert!(ComplaintId::parse("cmp-").is_err());
        assert!(ComplaintId::parse("cmp-zz").is_err());
        assert!(ComplaintId::parse("abc-12").is_err());
        let id = ComplaintId::from_seed(7);
        assert_eq!(ComplaintId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn email_is_lowercased_and_shape_checked() {
        assert_eq!(
            EmailAddress::parse("Alice@Example.COM").unwrap().as_str(),
            "alice@example.com"
        );
        assert!(EmailAddress::parse("nodomain@").is_err());
        assert!(EmailAddress::parse("@nolocal.tld").is_err());
        assert!(EmailAddress::parse("no-at.example.com").is_err());
        assert!(EmailAddress::parse("a@b").is_err());
    }

    #[test]
    fn title_and_description_trim_and_bound() {
        assert!(Title::parse("   ").is_err());
        assert_eq!(Title::parse(" pothole ").unwrap().as_str(), "pothole");
        assert!(Description::parse(&"d".repeat(DESCRIPTION_MAX_LEN + 1)).is_err());
        assert!(FeedbackText::parse("").is_err());
    }
}
