use crate::ids::{EmailAddress, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "super-admin" => Ok(Self::SuperAdmin),
            other => Err(ValidationError(format!("unknown role: {other}"))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super-admin",
        }
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local mirror of an identity-provider principal. Created on first
/// sign-in or via the identity webhook; role mutated by admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub name: String,
    pub role: Role,
    pub active: bool,
    pub created_ms: u64,
}

impl User {
    #[must_use]
    pub fn new(id: UserId, email: EmailAddress, name: String, now_ms: u64) -> Self {
        Self {
            id,
            email,
            name,
            role: Role::User,
            active: true,
            created_ms: now_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_wire_spelling() {
        for (raw, role) in [
            ("user", Role::User),
            ("admin", Role::Admin),
            ("super-admin", Role::SuperAdmin),
        ] {
            assert_eq!(Role::parse(raw).unwrap(), role);
            assert_eq!(role.as_str(), raw);
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{raw}\""));
        }
        assert!(Role::parse("root").is_err());
    }

    #[test]
    fn admin_check_covers_super_admin() {
        assert!(!Role::User.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(Role::SuperAdmin.is_admin());
    }
}
