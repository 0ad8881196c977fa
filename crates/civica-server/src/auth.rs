use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use civica_model::{EmailAddress, Role, User, UserId};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sessions older than this are rejected regardless of signature.
pub const SESSION_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;
const SESSION_FUTURE_SKEW_SECS: u64 = 300;

/// Verified identity-provider claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user: UserId,
    pub email: EmailAddress,
    pub issued_at_secs: u64,
}

pub trait SessionVerifier: Send + Sync + 'static {
    fn verify(&self, token: &str, now_secs: u64) -> Option<Principal>;
}

fn session_signature(
    secret: &[u8],
    user_id: &str,
    email: &str,
    issued_at_secs: u64,
) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(user_id.as_bytes());
    mac.update(b"\n");
    mac.update(email.as_bytes());
    mac.update(b"\n");
    mac.update(issued_at_secs.to_string().as_bytes());
    mac.update(b"\n");
    Some(mac.finalize().into_bytes().to_vec())
}

/// Builds a `v1.` session token the way the identity provider does.
/// Production tokens come from the provider; this exists for tooling
/// and tests.
#[must_use]
pub fn sign_session_token(
    secret: &str,
    user: &UserId,
    email: &EmailAddress,
    issued_at_secs: u64,
) -> Option<String> {
    let sig = session_signature(
        secret.as_bytes(),
        user.as_str(),
        email.as_str(),
        issued_at_secs,
    )?;
    Some(format!(
        "v1.{}.{}.{}.{}",
        URL_SAFE_NO_PAD.encode(user.as_str()),
        URL_SAFE_NO_PAD.encode(email.as_str()),
        issued_at_secs,
        hex::encode(sig)
    ))
}

/// Checks the HMAC signature and issued-at bounds of a `v1.` token.
pub struct HmacSessionVerifier {
    secret: String,
    max_age_secs: u64,
}

impl HmacSessionVerifier {
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            max_age_secs: SESSION_MAX_AGE_SECS,
        }
    }
}

impl SessionVerifier for HmacSessionVerifier {
    fn verify(&self, token: &str, now_secs: u64) -> Option<Principal> {
        let mut parts = token.split('.');
        if parts.next()? != "v1" {
            return None;
        }
        let user_raw = URL_SAFE_NO_PAD.decode(parts.next()?).ok()?;
        let email_raw = URL_SAFE_NO_PAD.decode(parts.next()?).ok()?;
        let issued_at_secs: u64 = parts.next()?.parse().ok()?;
        let sig = hex::decode(parts.next()?).ok()?;
        if parts.next().is_some() {
            return None;
        }

        let user_str = std::str::from_utf8(&user_raw).ok()?;
        let email_str = std::str::from_utf8(&email_raw).ok()?;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(user_str.as_bytes());
        mac.update(b"\n");
        mac.update(email_str.as_bytes());
        mac.update(b"\n");
        mac.update(issued_at_secs.to_string().as_bytes());
        mac.update(b"\n");
        mac.verify_slice(&sig).ok()?;

        if issued_at_secs > now_secs + SESSION_FUTURE_SKEW_SECS {
            return None;
        }
        if now_secs.saturating_sub(issued_at_secs) > self.max_age_secs {
            return None;
        }

        Some(Principal {
            user: UserId::parse(user_str).ok()?,
            email: EmailAddress::parse(email_str).ok()?,
            issued_at_secs,
        })
    }
}

/// A resolved caller: the mirrored user document plus the effective
/// role. The configured super-admin email resolves to `super-admin`
/// here, at the single derivation point, regardless of the stored role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user: User,
    pub role: Role,
}

impl Caller {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[must_use]
pub fn effective_role(user: &User, super_admin_email: &EmailAddress) -> Role {
    if user.email == *super_admin_email {
        Role::SuperAdmin
    } else {
        user.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> (UserId, EmailAddress) {
        (
            UserId::parse("usr_1").unwrap(),
            EmailAddress::parse("a@b.example").unwrap(),
        )
    }

    #[test]
    fn signed_token_round_trips() {
        let (user, email) = principal();
        let token = sign_session_token("s3cret", &user, &email, 1_000).unwrap();
        let verifier = HmacSessionVerifier::new("s3cret".to_string());
        let p = verifier.verify(&token, 1_100).unwrap();
        assert_eq!(p.user, user);
        assert_eq!(p.email, email);
        assert_eq!(p.issued_at_secs, 1_000);
    }

    #[test]
    fn wrong_secret_and_tampering_are_rejected() {
        let (user, email) = principal();
        let token = sign_session_token("s3cret", &user, &email, 1_000).unwrap();
        let verifier = HmacSessionVerifier::new("other".to_string());
        assert!(verifier.verify(&token, 1_100).is_none());

        let verifier = HmacSessionVerifier::new("s3cret".to_string());
        let mut tampered = token.clone();
        tampered.truncate(token.len() - 2);
        assert!(verifier.verify(&tampered, 1_100).is_none());
        assert!(verifier.verify("v1.not.a.token", 1_100).is_none());
    }

    #[test]
    fn expiry_and_future_issuance_are_rejected() {
        let (user, email) = principal();
        let verifier = HmacSessionVerifier::new("s3cret".to_string());

        let stale = sign_session_token("s3cret", &user, &email, 0).unwrap();
        assert!(verifier.verify(&stale, SESSION_MAX_AGE_SECS + 1).is_none());

        let future = sign_session_token("s3cret", &user, &email, 10_000).unwrap();
        assert!(verifier.verify(&future, 1_000).is_none());
    }

    #[test]
    fn super_admin_email_overrides_stored_role() {
        let root = EmailAddress::parse("root@civica.example").unwrap();
        let mut user = User::new(
            UserId::parse("usr_1").unwrap(),
            root.clone(),
            "Root".to_string(),
            0,
        );
        assert_eq!(effective_role(&user, &root), Role::SuperAdmin);
        user.email = EmailAddress::parse("other@civica.example").unwrap();
        assert_eq!(effective_role(&user, &root), Role::User);
    }
}
