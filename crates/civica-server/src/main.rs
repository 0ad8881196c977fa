#![forbid(unsafe_code)]

use civica_server::{
    build_router, init_tracing, AppConfig, AppState, FakeImageHost, HmacSessionVerifier,
    HttpImageHost, HttpNotifier, ImageHost, LogNotifier, Notifier,
};
use civica_store::{DocumentStore, MemoryStore, SqliteStore};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();
    let config = AppConfig::from_env()?;

    let store: Arc<dyn DocumentStore> = if config.db_path.trim().is_empty() {
        info!("using in-memory store");
        Arc::new(MemoryStore::default())
    } else {
        info!(path = config.db_path.as_str(), "opening sqlite store");
        Arc::new(SqliteStore::open(Path::new(&config.db_path)).map_err(|e| e.to_string())?)
    };

    let notifier: Arc<dyn Notifier> = match &config.email_relay_url {
        Some(url) => Arc::new(
            HttpNotifier::new(
                url.clone(),
                config.email_relay_token.clone(),
                config.email_from.clone(),
                config.request_timeout,
            )
            .map_err(|e| e.to_string())?,
        ),
        None => {
            warn!("no email relay configured; notifications are log-only");
            Arc::new(LogNotifier)
        }
    };
    let images: Arc<dyn ImageHost> = match &config.image_host_url {
        Some(url) => Arc::new(
            HttpImageHost::new(
                url.clone(),
                config.image_host_key.clone(),
                config.request_timeout,
            )
            .map_err(|e| e.to_string())?,
        ),
        None => {
            warn!("no image host configured; uploads return placeholder urls");
            Arc::new(FakeImageHost)
        }
    };

    let sessions = Arc::new(HmacSessionVerifier::new(config.session_secret.clone()));
    let bind = config.bind.clone();
    let drain_ms = config.shutdown_drain_ms;
    let state = AppState::new(store, config, sessions, notifier, images);
    let app = build_router(state.clone());

    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|e| format!("bind {bind} failed: {e}"))?;
    info!("civica-server listening on {bind}");

    let accepting = state.accepting_requests.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            accepting.store(false, Ordering::Relaxed);
            tokio::time::sleep(Duration::from_millis(drain_ms)).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
