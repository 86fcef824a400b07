//! In-memory collaborators for unit tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::api::{AuthApi, Confirm, PermissionApi, UserProfileApi};
use crate::error::ApiError;
use crate::types::{PermissionKind, PermissionNode, PermissionTreeEntry, TokenPair, UserProfile};

pub const PASSWORD: &str = "secret";

fn entry(id: i64, name: &str, path: &str, kind: PermissionKind) -> PermissionTreeEntry {
    PermissionTreeEntry {
        node: PermissionNode {
            id,
            name: name.to_string(),
            path: path.to_string(),
            component: path.to_string(),
            kind,
            parent_id: 0,
            order: id as i32,
            icon: String::new(),
            permission_code: None,
            is_valid: true,
        },
        has_permission: true,
        children: Vec::new(),
    }
}

pub fn directory(id: i64, name: &str, path: &str) -> PermissionTreeEntry {
    let mut dir = entry(id, name, path, PermissionKind::Directory);
    dir.node.component = String::new();
    dir
}

pub fn menu(id: i64, name: &str, path: &str) -> PermissionTreeEntry {
    entry(id, name, path, PermissionKind::Menu)
}

pub fn page(id: i64, name: &str, path: &str) -> PermissionTreeEntry {
    entry(id, name, path, PermissionKind::Page)
}

pub fn button(id: i64, name: &str) -> PermissionTreeEntry {
    let mut button = entry(id, name, "", PermissionKind::Button);
    button.node.component = String::new();
    button.node.permission_code = Some(format!("{}:click", name.to_lowercase()));
    button
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Token endpoints backed by counters; refresh tokens are `refresh-<n>`
#[derive(Default)]
pub struct FakeAuthApi {
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    issued: AtomicUsize,
    refresh_delay: Mutex<Duration>,
    fail_refresh: AtomicBool,
    fail_logout: AtomicBool,
}

impl FakeAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *lock(&self.refresh_delay) = delay;
    }

    pub fn fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    pub fn fail_logout(&self, fail: bool) {
        self.fail_logout.store(fail, Ordering::SeqCst);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    fn issue(&self, username: &str) -> TokenPair {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        TokenPair {
            access_token: format!("access-{}", n),
            refresh_token: format!("refresh-{}", n),
            username: Some(username.to_string()),
        }
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if password != PASSWORD {
            return Err(ApiError::bad_request("Invalid username or password"));
        }
        Ok(self.issue(username))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.refresh_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_refresh.load(Ordering::SeqCst) || !refresh_token.starts_with("refresh-") {
            return Err(ApiError::unauthorized("Refresh token expired"));
        }
        Ok(self.issue("admin"))
    }

    async fn logout(&self, _refresh_token: &str) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(ApiError::transport("connection reset"));
        }
        Ok(())
    }
}

pub struct FakePermissionApi {
    tree: Mutex<Vec<PermissionTreeEntry>>,
    codes: Mutex<Vec<String>>,
    delay: Mutex<Duration>,
    fail_tree: AtomicBool,
    fail_codes: AtomicBool,
    tree_calls: AtomicUsize,
    menu_calls: AtomicUsize,
    code_calls: AtomicUsize,
}

impl FakePermissionApi {
    pub fn new(tree: Vec<PermissionTreeEntry>) -> Self {
        Self {
            tree: Mutex::new(tree),
            codes: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
            fail_tree: AtomicBool::new(false),
            fail_codes: AtomicBool::new(false),
            tree_calls: AtomicUsize::new(0),
            menu_calls: AtomicUsize::new(0),
            code_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_tree(&self, tree: Vec<PermissionTreeEntry>) {
        *lock(&self.tree) = tree;
    }

    pub fn set_codes(&self, codes: Vec<&str>) {
        *lock(&self.codes) = codes.into_iter().map(String::from).collect();
    }

    /// Delay applied to view tree fetches
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = delay;
    }

    pub fn fail_next_tree(&self) {
        self.fail_tree.store(true, Ordering::SeqCst);
    }

    pub fn fail_codes(&self, fail: bool) {
        self.fail_codes.store(fail, Ordering::SeqCst);
    }

    pub fn tree_calls(&self) -> usize {
        self.tree_calls.load(Ordering::SeqCst)
    }

    pub fn menu_calls(&self) -> usize {
        self.menu_calls.load(Ordering::SeqCst)
    }

    pub fn code_calls(&self) -> usize {
        self.code_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionApi for FakePermissionApi {
    async fn get_view_tree(&self) -> Result<Vec<PermissionTreeEntry>, ApiError> {
        self.tree_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_tree.swap(false, Ordering::SeqCst) {
            return Err(ApiError::transport("connection refused"));
        }
        Ok(lock(&self.tree).clone())
    }

    async fn get_menu_tree(&self, _target_role_id: Option<i64>) -> Result<Vec<PermissionTreeEntry>, ApiError> {
        self.menu_calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.tree).clone())
    }

    async fn get_permission_codes(&self) -> Result<Vec<String>, ApiError> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_codes.load(Ordering::SeqCst) {
            return Err(ApiError::from_envelope(500, "permission service down"));
        }
        Ok(lock(&self.codes).clone())
    }
}

#[derive(Default)]
pub struct FakeUserApi {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl FakeUserApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserProfileApi for FakeUserApi {
    async fn get_user(&self) -> Result<UserProfile, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::from_envelope(500, "profile unavailable"));
        }
        Ok(UserProfile {
            id: 1,
            username: "admin".to_string(),
            name: "Administrator".to_string(),
            avatar_url: String::new(),
            sex: None,
            signature: None,
            roles: Vec::new(),
            is_valid: true,
        })
    }
}

/// Answers every confirmation with a fixed value and counts prompts
pub struct ScriptedConfirm {
    answer: bool,
    prompts: AtomicUsize,
}

impl ScriptedConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirm for ScriptedConfirm {
    async fn confirm(&self, _title: &str, _message: &str) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}
