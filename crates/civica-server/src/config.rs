use civica_model::EmailAddress;
use std::env;
use std::time::Duration;

pub fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

pub fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

pub fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

pub fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Startup configuration, read from `CIVICA_*` once; no reload.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    /// Empty means the in-memory backend.
    pub db_path: String,
    pub max_body_bytes: usize,
    pub super_admin_email: EmailAddress,
    pub session_secret: String,
    pub webhook_secret: String,
    pub webhook_max_skew_secs: u64,
    pub email_relay_url: Option<String>,
    pub email_relay_token: Option<String>,
    pub email_from: String,
    pub image_host_url: Option<String>,
    pub image_host_key: Option<String>,
    pub map_api_key: Option<String>,
    pub max_image_bytes: usize,
    pub fake_flag_window_ms: u64,
    pub long_pending_after_ms: u64,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Outbound call budget for the email relay and image host.
    pub request_timeout: Duration,
    pub shutdown_drain_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let super_admin_email = env::var("CIVICA_SUPER_ADMIN_EMAIL")
            .map_err(|_| "CIVICA_SUPER_ADMIN_EMAIL is required".to_string())?;
        let super_admin_email = EmailAddress::parse(&super_admin_email)
            .map_err(|e| format!("CIVICA_SUPER_ADMIN_EMAIL: {e}"))?;
        let session_secret = env::var("CIVICA_SESSION_SECRET")
            .map_err(|_| "CIVICA_SESSION_SECRET is required".to_string())?;
        let webhook_secret = env::var("CIVICA_WEBHOOK_SECRET")
            .map_err(|_| "CIVICA_WEBHOOK_SECRET is required".to_string())?;

        let cfg = Self {
            bind: env::var("CIVICA_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            db_path: env::var("CIVICA_DB_PATH").unwrap_or_default(),
            max_body_bytes: env_usize("CIVICA_MAX_BODY_BYTES", 64 * 1024),
            super_admin_email,
            session_secret,
            webhook_secret,
            webhook_max_skew_secs: env_u64("CIVICA_WEBHOOK_MAX_SKEW_SECS", 300),
            email_relay_url: env_opt("CIVICA_EMAIL_RELAY_URL"),
            email_relay_token: env_opt("CIVICA_EMAIL_RELAY_TOKEN"),
            email_from: env::var("CIVICA_EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@civica.example".to_string()),
            image_host_url: env_opt("CIVICA_IMAGE_HOST_URL"),
            image_host_key: env_opt("CIVICA_IMAGE_HOST_KEY"),
            map_api_key: env_opt("CIVICA_MAP_API_KEY"),
            max_image_bytes: env_usize("CIVICA_MAX_IMAGE_BYTES", 5 * 1024 * 1024),
            fake_flag_window_ms: env_u64("CIVICA_FAKE_FLAG_WINDOW_MS", 24 * 60 * 60 * 1000),
            long_pending_after_ms: env_u64(
                "CIVICA_LONG_PENDING_AFTER_MS",
                7 * 24 * 60 * 60 * 1000,
            ),
            default_page_size: env_usize("CIVICA_DEFAULT_PAGE_SIZE", 20),
            max_page_size: env_usize("CIVICA_MAX_PAGE_SIZE", 100),
            request_timeout: env_duration_ms("CIVICA_REQUEST_TIMEOUT_MS", 5000),
            shutdown_drain_ms: env_u64("CIVICA_SHUTDOWN_DRAIN_MS", 5000),
        };
        validate_startup_config(&cfg)?;
        Ok(cfg)
    }
}

/// Rejects configurations that would start but misbehave at runtime.
pub fn validate_startup_config(cfg: &AppConfig) -> Result<(), String> {
    if cfg.session_secret.trim().is_empty() {
        return Err("CIVICA_SESSION_SECRET must not be empty".to_string());
    }
    if cfg.webhook_secret.trim().is_empty() {
        return Err("CIVICA_WEBHOOK_SECRET must not be empty".to_string());
    }
    if cfg.max_body_bytes == 0 {
        return Err("CIVICA_MAX_BODY_BYTES must be positive".to_string());
    }
    if cfg.max_image_bytes == 0 {
        return Err("CIVICA_MAX_IMAGE_BYTES must be positive".to_string());
    }
    if cfg.default_page_size == 0 || cfg.max_page_size == 0 {
        return Err("page sizes must be positive".to_string());
    }
    if cfg.default_page_size > cfg.max_page_size {
        return Err("CIVICA_DEFAULT_PAGE_SIZE exceeds CIVICA_MAX_PAGE_SIZE".to_string());
    }
    if cfg.email_relay_url.is_some() && cfg.email_from.trim().is_empty() {
        return Err("CIVICA_EMAIL_FROM must be set when the relay is configured".to_string());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        bind: "127.0.0.1:0".to_string(),
        db_path: String::new(),
        max_body_bytes: 64 * 1024,
        super_admin_email: EmailAddress::parse("root@civica.example").unwrap(),
        session_secret: "session-secret".to_string(),
        webhook_secret: "webhook-secret".to_string(),
        webhook_max_skew_secs: 300,
        email_relay_url: None,
        email_relay_token: None,
        email_from: "no-reply@civica.example".to_string(),
        image_host_url: None,
        image_host_key: None,
        map_api_key: None,
        max_image_bytes: 5 * 1024 * 1024,
        fake_flag_window_ms: 24 * 60 * 60 * 1000,
        long_pending_after_ms: 7 * 24 * 60 * 60 * 1000,
        default_page_size: 20,
        max_page_size: 100,
        request_timeout: Duration::from_millis(5000),
        shutdown_drain_ms: 100,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_rejects_zero_limits_and_empty_secrets() {
        let good = test_config();
        assert!(validate_startup_config(&good).is_ok());

        let mut cfg = good.clone();
        cfg.session_secret = "  ".to_string();
        assert!(validate_startup_config(&cfg).is_err());

        let mut cfg = good.clone();
        cfg.max_image_bytes = 0;
        assert!(validate_startup_config(&cfg).is_err());

        let mut cfg = good.clone();
        cfg.default_page_size = 500;
        assert!(validate_startup_config(&cfg).is_err());
    }

    #[test]
    fn env_bool_accepts_common_spellings() {
        std::env::remove_var("CIVICA_TEST_FLAG_UNSET");
        assert!(env_bool("CIVICA_TEST_FLAG_UNSET", true));
        assert!(!env_bool("CIVICA_TEST_FLAG_UNSET", false));
    }
}
