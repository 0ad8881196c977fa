use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use civica_model::{
    Category, Complaint, ComplaintId, ComplaintStatus, Description, EmailAddress, Location, Title,
    UserId,
};
use civica_server::{
    build_router, sign_session_token, sign_webhook, unix_millis, unix_secs, AppConfig, AppState,
    FakeImageHost, HmacSessionVerifier, NotifyRecord, RecordingNotifier,
};
use civica_store::{DocumentStore, MemoryStore};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const SESSION_SECRET: &str = "session-secret";
const WEBHOOK_SECRET: &str = "webhook-secret";

fn test_config() -> AppConfig {
    AppConfig {
        bind: "127.0.0.1:0".to_string(),
        db_path: String::new(),
        max_body_bytes: 64 * 1024,
        super_admin_email: EmailAddress::parse("root@civica.example").unwrap(),
        session_secret: SESSION_SECRET.to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        webhook_max_skew_secs: 300,
        email_relay_url: None,
        email_relay_token: None,
        email_from: "no-reply@civica.example".to_string(),
        image_host_url: None,
        image_host_key: None,
        map_api_key: None,
        max_image_bytes: 1024,
        fake_flag_window_ms: 24 * 60 * 60 * 1000,
        long_pending_after_ms: 7 * 24 * 60 * 60 * 1000,
        default_page_size: 20,
        max_page_size: 100,
        request_timeout: Duration::from_millis(2000),
        shutdown_drain_ms: 10,
    }
}

async fn spawn_app() -> (SocketAddr, Arc<MemoryStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(
        store.clone(),
        test_config(),
        Arc::new(HmacSessionVerifier::new(SESSION_SECRET.to_string())),
        notifier.clone(),
        Arc::new(FakeImageHost),
    );
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (addr, store, notifier)
}

fn token(user: &str, email: &str) -> String {
    sign_session_token(
        SESSION_SECRET,
        &UserId::parse(user).unwrap(),
        &EmailAddress::parse(email).unwrap(),
        unix_secs(),
    )
    .expect("sign token")
}

async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> (u16, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (name, value) in headers {
        req.push_str(&format!("{name}: {value}\r\n"));
    }
    req.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
    stream.write_all(req.as_bytes()).await.expect("write head");
    stream.write_all(body).await.expect("write body");
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.expect("read response");
    let response = String::from_utf8_lossy(&response).to_string();
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    (status, body.to_string())
}

async fn send_json(
    addr: SocketAddr,
    method: &str,
    path: &str,
    bearer: Option<&str>,
    body: Option<&Value>,
) -> (u16, Value) {
    let payload = body.map(|b| b.to_string()).unwrap_or_default();
    let auth;
    let mut headers: Vec<(&str, &str)> = vec![("Content-Type", "application/json")];
    if let Some(tok) = bearer {
        auth = format!("Bearer {tok}");
        headers.push(("Authorization", &auth));
    }
    let (status, raw) = send_raw(addr, method, path, &headers, payload.as_bytes()).await;
    let value = serde_json::from_str(&raw).unwrap_or(Value::Null);
    (status, value)
}

fn seeded_complaint(seed: u64, owner: &str, created_ms: u64) -> Complaint {
    Complaint::submit(
        ComplaintId::from_seed(seed),
        UserId::parse(owner).unwrap(),
        Title::parse(&format!("Pothole {seed}")).unwrap(),
        Description::parse("Deep pothole near the school crossing.").unwrap(),
        Category::Pothole,
        Location {
            latitude: 12.97,
            longitude: 77.59,
            address: "School Rd".to_string(),
        },
        vec!["https://img.example/p.jpg".to_string()],
        created_ms,
    )
}

#[tokio::test]
async fn webhook_rejects_missing_stale_and_forged_signatures() {
    let (addr, store, _) = spawn_app().await;
    let body = json!({"type": "user.created", "user_id": "hook_1",
        "email": "hook@ex.example", "name": "Hook"})
    .to_string();
    let raw = body.as_bytes();

    let (status, _) = send_raw(addr, "POST", "/v1/webhooks/identity", &[], raw).await;
    assert_eq!(status, 401);

    let ts = unix_secs().to_string();
    let forged = sign_webhook("wrong-secret", unix_secs(), raw).unwrap();
    let headers = [
        ("x-civica-timestamp", ts.as_str()),
        ("x-civica-signature", forged.as_str()),
    ];
    let (status, _) = send_raw(addr, "POST", "/v1/webhooks/identity", &headers, raw).await;
    assert_eq!(status, 401);

    let stale_ts = (unix_secs() - 4000).to_string();
    let stale_sig = sign_webhook(WEBHOOK_SECRET, unix_secs() - 4000, raw).unwrap();
    let headers = [
        ("x-civica-timestamp", stale_ts.as_str()),
        ("x-civica-signature", stale_sig.as_str()),
    ];
    let (status, _) = send_raw(addr, "POST", "/v1/webhooks/identity", &headers, raw).await;
    assert_eq!(status, 401);

    assert!(store
        .user(&UserId::parse("hook_1").unwrap())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn webhook_mirrors_the_user_lifecycle() {
    let (addr, store, _) = spawn_app().await;
    let post = |body: String, addr: SocketAddr| async move {
        let ts = unix_secs();
        let sig = sign_webhook(WEBHOOK_SECRET, ts, body.as_bytes()).unwrap();
        let ts = ts.to_string();
        let headers = [
            ("x-civica-timestamp", ts.as_str()),
            ("x-civica-signature", sig.as_str()),
            ("Content-Type", "application/json"),
        ];
        send_raw(addr, "POST", "/v1/webhooks/identity", &headers, body.as_bytes()).await
    };

    let created = json!({"type": "user.created", "user_id": "hook_1",
        "email": "hook@ex.example", "name": "Hook"})
    .to_string();
    let (status, _) = post(created, addr).await;
    assert_eq!(status, 200);
    let user = store
        .user(&UserId::parse("hook_1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.email.as_str(), "hook@ex.example");
    assert_eq!(user.name, "Hook");

    let updated = json!({"type": "user.updated", "user_id": "hook_1",
        "email": "new@ex.example", "name": null})
    .to_string();
    let (status, _) = post(updated, addr).await;
    assert_eq!(status, 200);
    let user = store
        .user(&UserId::parse("hook_1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.email.as_str(), "new@ex.example");
    assert_eq!(user.name, "Hook");

    let deleted = json!({"type": "user.deleted", "user_id": "hook_1",
        "email": null, "name": null})
    .to_string();
    let (status, _) = post(deleted, addr).await;
    assert_eq!(status, 200);
    assert!(store
        .user(&UserId::parse("hook_1").unwrap())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn dashboard_aggregates_status_tiles_and_long_pending() {
    let (addr, store, _) = spawn_app().await;
    let root = token("root", "root@civica.example");

    let now = unix_millis();
    store.insert_complaint(seeded_complaint(1, "alice", now)).await.unwrap();
    store.insert_complaint(seeded_complaint(2, "alice", 0)).await.unwrap();
    let mut done = seeded_complaint(3, "bob", now);
    done.status = ComplaintStatus::Completed;
    store.insert_complaint(done).await.unwrap();

    let (status, body) = send_json(addr, "GET", "/v1/admin/dashboard", Some(&root), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 3);
    assert_eq!(body["by_status"]["pending"], 2);
    assert_eq!(body["by_status"]["completed"], 1);
    assert_eq!(body["long_pending"], 1);

    let alice = token("alice", "alice@ex.example");
    let (status, _) = send_json(addr, "GET", "/v1/admin/dashboard", Some(&alice), None).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn admin_listing_includes_hidden_complaints() {
    let (addr, store, _) = spawn_app().await;
    let root = token("root", "root@civica.example");

    let mut hidden = seeded_complaint(1, "alice", unix_millis());
    hidden.is_visible = false;
    store.insert_complaint(hidden).await.unwrap();

    let (_, public) = send_json(addr, "GET", "/v1/complaints?public=true", None, None).await;
    assert_eq!(public["page"]["total"], 0);

    let (status, all) = send_json(addr, "GET", "/v1/admin/complaints", Some(&root), None).await;
    assert_eq!(status, 200);
    assert_eq!(all["page"]["total"], 1);
}

#[tokio::test]
async fn super_admin_is_force_synced_and_never_demotable() {
    let (addr, _, _) = spawn_app().await;
    let root = token("root", "root@civica.example");
    let bob = token("bob", "bob@ex.example");

    // Bob signs in so the mirror exists.
    send_json(addr, "GET", "/v1/rewards", Some(&bob), None).await;

    let (status, users) = send_json(addr, "GET", "/v1/admin/users", Some(&root), None).await;
    assert_eq!(status, 200);
    let listed = users["users"].as_array().unwrap();
    assert!(listed
        .iter()
        .any(|u| u["email"] == "root@civica.example" && u["role"] == "super-admin"));

    let (status, _) = send_json(
        addr,
        "POST",
        "/v1/admin/users/role",
        Some(&root),
        Some(&json!({"email": "bob@ex.example", "role": "admin"})),
    )
    .await;
    assert_eq!(status, 200);

    // Bob is now an admin but cannot grant roles.
    let (status, _) = send_json(
        addr,
        "POST",
        "/v1/admin/users/role",
        Some(&bob),
        Some(&json!({"email": "bob@ex.example", "role": "user"})),
    )
    .await;
    assert_eq!(status, 403);
    let (status, _) = send_json(addr, "GET", "/v1/admin/dashboard", Some(&bob), None).await;
    assert_eq!(status, 200);

    let (status, body) = send_json(
        addr,
        "POST",
        "/v1/admin/users/role",
        Some(&root),
        Some(&json!({"email": "root@civica.example", "role": "user"})),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "Conflict");

    let (status, _) = send_json(
        addr,
        "POST",
        "/v1/admin/users/role",
        Some(&root),
        Some(&json!({"email": "bob@ex.example", "role": "super-admin"})),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = send_json(
        addr,
        "POST",
        "/v1/admin/users/role",
        Some(&root),
        Some(&json!({"email": "ghost@ex.example", "role": "admin"})),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn fake_flag_honors_the_review_window() {
    let (addr, store, _) = spawn_app().await;
    let root = token("root", "root@civica.example");

    let fresh = seeded_complaint(1, "alice", unix_millis());
    let fresh_id = fresh.id.clone();
    store.insert_complaint(fresh).await.unwrap();
    let old = seeded_complaint(2, "alice", 0);
    let old_id = old.id.clone();
    store.insert_complaint(old).await.unwrap();

    let (status, flagged) = send_json(
        addr,
        "POST",
        &format!("/v1/complaints/{fresh_id}/fake"),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(flagged["is_fake"], true);

    let (status, body) = send_json(
        addr,
        "POST",
        &format!("/v1/complaints/{old_id}/fake"),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "Conflict");
}

#[tokio::test]
async fn long_pending_report_requires_age_and_happens_once() {
    let (addr, store, notifier) = spawn_app().await;
    let root = token("root", "root@civica.example");

    let old = seeded_complaint(1, "alice", 0);
    let old_id = old.id.clone();
    store.insert_complaint(old).await.unwrap();
    let fresh = seeded_complaint(2, "alice", unix_millis());
    let fresh_id = fresh.id.clone();
    store.insert_complaint(fresh).await.unwrap();

    let (status, _) = send_json(
        addr,
        "POST",
        &format!("/v1/admin/complaints/{fresh_id}/report"),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(status, 409);

    let (status, reported) = send_json(
        addr,
        "POST",
        &format!("/v1/admin/complaints/{old_id}/report"),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(reported["reported_to_super_admin"], true);

    let (status, _) = send_json(
        addr,
        "POST",
        &format!("/v1/admin/complaints/{old_id}/report"),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(status, 409);

    let records = notifier.records().await;
    assert!(records.iter().any(
        |r| matches!(r, NotifyRecord::LongPendingReported { to, .. } if to == "root@civica.example")
    ));
}

#[tokio::test]
async fn inactive_users_are_denied() {
    let (addr, store, _) = spawn_app().await;
    let bob = token("bob", "bob@ex.example");

    // First request mirrors the user.
    let (status, _) = send_json(addr, "GET", "/v1/rewards", Some(&bob), None).await;
    assert_eq!(status, 200);

    store
        .set_active(&UserId::parse("bob").unwrap(), false)
        .await
        .unwrap();
    let (status, body) = send_json(addr, "GET", "/v1/rewards", Some(&bob), None).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "AuthorizationDenied");
}
