#![forbid(unsafe_code)]

use axum::extract::{DefaultBodyLimit, MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::Router;
use civica_model::ComplaintId;
use civica_store::DocumentStore;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod auth;
mod config;
mod http;
mod images;
mod notify;
mod rewards_engine;

pub use auth::{
    effective_role, sign_session_token, Caller, HmacSessionVerifier, Principal, SessionVerifier,
    SESSION_MAX_AGE_SECS,
};
pub use config::{validate_startup_config, AppConfig};
pub use http::webhook::sign_webhook;
pub use images::{sniff_image, FakeImageHost, HttpImageHost, ImageHost, ImageHostError};
pub use notify::{
    HttpNotifier, LogNotifier, Notifier, NotifyError, NotifyRecord, RecordingNotifier,
};
pub use rewards_engine::RewardsEngine;

pub const CRATE_NAME: &str = "civica-server";

#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[must_use]
pub fn unix_secs() -> u64 {
    unix_millis() / 1000
}

/// Per-route request counters and a latency sum, rendered as plain
/// text at `/metrics`.
#[derive(Default)]
pub struct RequestMetrics {
    requests_total: AtomicU64,
    latency_micros_total: AtomicU64,
    by_route: Mutex<BTreeMap<(String, u16), u64>>,
}

impl RequestMetrics {
    pub fn record(&self, route: &str, status: u16, elapsed: Duration) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.latency_micros_total
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        if let Ok(mut map) = self.by_route.lock() {
            *map.entry((route.to_string(), status)).or_insert(0) += 1;
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "civica_requests_total {}\n",
            self.requests_total.load(Ordering::Relaxed)
        ));
        out.push_str(&format!(
            "civica_request_latency_micros_total {}\n",
            self.latency_micros_total.load(Ordering::Relaxed)
        ));
        if let Ok(map) = self.by_route.lock() {
            for ((route, status), count) in map.iter() {
                out.push_str(&format!(
                    "civica_requests{{route=\"{route}\",status=\"{status}\"}} {count}\n"
                ));
            }
        }
        out
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionVerifier>,
    pub notifier: Arc<dyn Notifier>,
    pub images: Arc<dyn ImageHost>,
    pub rewards: RewardsEngine,
    pub metrics: Arc<RequestMetrics>,
    pub request_id_seed: Arc<AtomicU64>,
    pub complaint_id_seed: Arc<AtomicU64>,
    pub ready: Arc<AtomicBool>,
    pub accepting_requests: Arc<AtomicBool>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: AppConfig,
        sessions: Arc<dyn SessionVerifier>,
        notifier: Arc<dyn Notifier>,
        images: Arc<dyn ImageHost>,
    ) -> Self {
        let rewards = RewardsEngine::new(store.clone());
        Self {
            store,
            config: Arc::new(config),
            sessions,
            notifier,
            images,
            rewards,
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            complaint_id_seed: Arc::new(AtomicU64::new(1)),
            ready: Arc::new(AtomicBool::new(true)),
            accepting_requests: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Server-generated complaint ids: timestamp-prefixed so they sort
    /// roughly by creation, with a process-local counter for
    /// uniqueness within a millisecond.
    #[must_use]
    pub fn next_complaint_id(&self, now_ms: u64) -> ComplaintId {
        let n = self.complaint_id_seed.fetch_add(1, Ordering::Relaxed);
        ComplaintId::from_seed((now_ms << 20) | (n & 0xFFFFF))
    }
}

async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let start = Instant::now();
    let resp = next.run(req).await;
    state
        .metrics
        .record(&route, resp.status().as_u16(), start.elapsed());
    resp
}

pub fn build_router(state: AppState) -> Router {
    let image_body_limit = state.config.max_image_bytes.saturating_add(1024);
    Router::new()
        .route("/healthz", get(http::system::healthz))
        .route("/readyz", get(http::system::readyz))
        .route("/v1/version", get(http::system::version))
        .route("/metrics", get(http::system::metrics))
        .route(
            "/v1/complaints",
            post(http::complaints::create_complaint).get(http::complaints::list_complaints),
        )
        .route(
            "/v1/complaints/:id",
            get(http::complaints::get_complaint).delete(http::complaints::delete_complaint),
        )
        .route(
            "/v1/complaints/:id/status",
            patch(http::complaints::update_status),
        )
        .route("/v1/complaints/:id/fake", post(http::complaints::toggle_fake))
        .route(
            "/v1/complaints/:id/visibility",
            post(http::complaints::toggle_visibility),
        )
        .route(
            "/v1/complaints/:id/vote",
            post(http::votes::add_vote).delete(http::votes::remove_vote),
        )
        .route(
            "/v1/complaints/:id/feedback",
            post(http::feedback::add_feedback).get(http::feedback::list_feedback),
        )
        .route("/v1/rewards", get(http::rewards::get_rewards))
        .route("/v1/rewards/refresh", post(http::rewards::refresh_rewards))
        .route("/v1/admin/dashboard", get(http::admin::dashboard))
        .route("/v1/admin/complaints", get(http::admin::list_all_complaints))
        .route("/v1/admin/users", get(http::admin::list_users))
        .route("/v1/admin/users/role", post(http::admin::change_role))
        .route(
            "/v1/admin/complaints/:id/report",
            post(http::admin::report_long_pending),
        )
        .route(
            "/v1/images",
            post(http::media::upload_image).layer(DefaultBodyLimit::max(image_body_limit)),
        )
        .route("/v1/webhooks/identity", post(http::webhook::identity_event))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config::env_bool("CIVICA_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
