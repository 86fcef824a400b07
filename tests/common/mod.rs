//! In-process mock of the console backend
//!
//! Speaks the `{ code, data, message }` envelope over real HTTP on an
//! ephemeral port. Access tokens are HS256 JWTs, refresh tokens are UUIDs.
//! Counters and switches let tests force expiry, revocation and 403s.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use pulse_console::api::AutoConfirm;
use pulse_console::config::ConsoleConfig;
use pulse_console::persistence::{FileStore, Persistence};
use pulse_console::router::resolver::OverrideModules;
use pulse_console::Console;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
const SECRET: &[u8] = b"mock-backend-secret";

#[derive(Debug, Serialize)]
struct AccessClaims {
    sub: String,
    exp: i64,
    iat: i64,
    jti: String,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

/// Route console logs through the test harness; RUST_LOG selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct MockBackend {
    access_tokens: Mutex<HashSet<String>>,
    refresh_tokens: Mutex<HashSet<String>>,
    refresh_delay: Mutex<Duration>,
    view_tree: Mutex<Value>,
    codes: Mutex<Vec<String>>,
    forbid_tree: AtomicBool,
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub tree_calls: AtomicUsize,
    pub code_calls: AtomicUsize,
}

pub fn node(id: i64, name: &str, path: &str, kind: &str) -> Value {
    json!({
        "node": {
            "id": id,
            "name": name,
            "path": path,
            "component": path,
            "type": kind,
            "parentId": 0,
            "order": id,
            "icon": "Menu",
            "isValid": true
        },
        "hasPermission": true,
        "children": []
    })
}

/// System directory with two menus
pub fn default_tree() -> Value {
    let mut system = node(1, "System", "/system", "DIRECTORY");
    system["children"] = json!([
        node(2, "Users", "/system/user", "MENU"),
        node(3, "Roles", "/system/role", "MENU"),
    ]);
    json!([system])
}

fn envelope(code: i32, data: Value, message: &str) -> Json<Value> {
    Json(json!({ "code": code, "data": data, "message": message }))
}

fn ok(data: Value) -> Json<Value> {
    envelope(200, data, "success")
}

impl MockBackend {
    fn new() -> Self {
        Self {
            access_tokens: Mutex::new(HashSet::new()),
            refresh_tokens: Mutex::new(HashSet::new()),
            refresh_delay: Mutex::new(Duration::ZERO),
            view_tree: Mutex::new(default_tree()),
            codes: Mutex::new(vec!["user:add".to_string(), "user:edit".to_string()]),
            forbid_tree: AtomicBool::new(false),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            tree_calls: AtomicUsize::new(0),
            code_calls: AtomicUsize::new(0),
        }
    }

    /// Every outstanding access token now answers with code 401
    pub fn expire_access_tokens(&self) {
        self.access_tokens.lock().unwrap().clear();
    }

    pub fn revoke_refresh_tokens(&self) {
        self.refresh_tokens.lock().unwrap().clear();
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn set_view_tree(&self, tree: Value) {
        *self.view_tree.lock().unwrap() = tree;
    }

    pub fn set_codes(&self, codes: &[&str]) {
        *self.codes.lock().unwrap() = codes.iter().map(|c| c.to_string()).collect();
    }

    pub fn forbid_tree(&self, forbid: bool) {
        self.forbid_tree.store(forbid, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn issue(&self, username: &str) -> Value {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: username.to_string(),
            exp: now + 3600,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };
        let access = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET))
            .expect("mint access token");
        let refresh = Uuid::new_v4().to_string();

        self.access_tokens.lock().unwrap().insert(access.clone());
        self.refresh_tokens.lock().unwrap().insert(refresh.clone());
        json!({ "accessToken": access, "refreshToken": refresh, "username": username })
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| self.access_tokens.lock().unwrap().contains(token))
            .unwrap_or(false)
    }
}

type Shared = Arc<MockBackend>;

async fn login(State(backend): State<Shared>, Json(body): Json<LoginBody>) -> Json<Value> {
    backend.login_calls.fetch_add(1, Ordering::SeqCst);
    if body.username != USERNAME || body.password != PASSWORD {
        return envelope(400, Value::Null, "Invalid username or password");
    }
    ok(backend.issue(&body.username))
}

async fn refresh(State(backend): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *backend.refresh_delay.lock().unwrap();
    tokio::time::sleep(delay).await;

    let token = params.get("refreshToken").cloned().unwrap_or_default();
    if !backend.refresh_tokens.lock().unwrap().remove(&token) {
        return envelope(401, Value::Null, "Refresh token expired");
    }
    ok(backend.issue(USERNAME))
}

async fn logout(State(backend): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    backend.logout_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(token) = params.get("refreshToken") {
        backend.refresh_tokens.lock().unwrap().remove(token);
    }
    ok(Value::Null)
}

async fn user(State(backend): State<Shared>, headers: HeaderMap) -> Json<Value> {
    if !backend.authorized(&headers) {
        return envelope(401, Value::Null, "Token expired");
    }
    ok(json!({
        "id": 1,
        "username": USERNAME,
        "name": "Administrator",
        "avatarUrl": "",
        "roles": [{ "id": 1, "name": "admin" }],
        "isValid": true
    }))
}

async fn view_tree(State(backend): State<Shared>, headers: HeaderMap) -> Json<Value> {
    backend.tree_calls.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return envelope(401, Value::Null, "Token expired");
    }
    if backend.forbid_tree.load(Ordering::SeqCst) {
        return envelope(403, Value::Null, "Permission denied");
    }
    let tree = backend.view_tree.lock().unwrap().clone();
    ok(tree)
}

async fn menu_tree(State(backend): State<Shared>, headers: HeaderMap) -> Json<Value> {
    if !backend.authorized(&headers) {
        return envelope(401, Value::Null, "Token expired");
    }
    let tree = backend.view_tree.lock().unwrap().clone();
    ok(tree)
}

async fn codes(State(backend): State<Shared>, headers: HeaderMap) -> Json<Value> {
    backend.code_calls.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return envelope(401, Value::Null, "Token expired");
    }
    let codes = backend.codes.lock().unwrap().clone();
    ok(json!(codes))
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub base_url: String,
    pub backend: Shared,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        init_tracing();
        let backend = Arc::new(MockBackend::new());

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/refresh", get(refresh))
            .route("/api/user/logout", get(logout))
            .route("/api/user/get", get(user))
            .route("/api/permission/view/tree", get(view_tree))
            .route("/api/permission/menu/tree", get(menu_tree))
            .route("/api/permission/codes", get(codes))
            .with_state(Arc::clone(&backend));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock backend")?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend");
        });

        Ok(Self {
            addr,
            base_url: format!("http://{}/api/", addr),
            backend,
        })
    }

    pub fn config(&self) -> ConsoleConfig {
        let mut config = ConsoleConfig::development();
        config.api.base_url = self.base_url.clone();
        config.api.timeout_secs = 5;
        config
    }

    pub fn console(&self) -> Result<Arc<Console>> {
        self.console_with(self.config(), Persistence::in_memory())
    }

    pub fn console_with(&self, config: ConsoleConfig, persistence: Persistence) -> Result<Arc<Console>> {
        let console = Console::connect(config, persistence, Arc::new(AutoConfirm), OverrideModules::default())?;
        Ok(console)
    }
}

/// File-backed persistence under a fresh temp directory
pub fn temp_persistence() -> (Persistence, PathBuf) {
    let root = std::env::temp_dir().join(format!("pulse-test-{}", Uuid::new_v4().simple()));
    let persistence = Persistence::new(
        Arc::new(FileStore::new(root.join("durable"))),
        Arc::new(FileStore::new(root.join("session"))),
    );
    (persistence, root)
}
