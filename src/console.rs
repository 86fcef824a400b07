//! Console composition root
//!
//! Owns one of each coordinator (session, refresh, permissions, routes, tabs)
//! and runs the flows that cross them: login, silent refresh, logout teardown
//! and guarded navigation.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use crate::api::{AuthApi, AutoConfirm, Confirm, HttpClient, PermissionApi, SessionHooks, UserProfileApi};
use crate::config::ConsoleConfig;
use crate::error::{ApiError, NavigationError};
use crate::permission::PermissionStore;
use crate::persistence::{Persistence, StorageClass};
use crate::router::resolver::OverrideModules;
use crate::router::{
    evaluate, ComponentResolver, GuardDecision, MemoryRouter, RedirectReason, ResolvedRoute, RouteRegistrar,
    Router,
};
use crate::session::{RefreshCoordinator, RefreshTicket, SessionStore};
use crate::tabs::{PageCache, TabItem, TabManager, TabsSnapshot};
use crate::user::UserStore;

const TABS_KEY: &str = "tabs";
const PAGE_CACHE_KEY: &str = "page-cache";
const LOCATION_KEY: &str = "location";

/// One hop taken by the guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub from: String,
    pub to: String,
    pub reason: RedirectReason,
}

/// Where a navigation ended up and how it got there
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub requested: String,
    pub location: String,
    pub redirects: Vec<Redirect>,
}

impl Navigation {
    /// Landed on the requested path without any redirect
    pub fn allowed(&self) -> bool {
        self.redirects.is_empty()
    }

    pub fn last_reason(&self) -> Option<RedirectReason> {
        self.redirects.last().map(|r| r.reason)
    }
}

pub struct ConsoleBuilder {
    config: ConsoleConfig,
    auth: Arc<dyn AuthApi>,
    permissions: Arc<dyn PermissionApi>,
    users: Arc<dyn UserProfileApi>,
    persistence: Persistence,
    session: Option<Arc<SessionStore>>,
    confirm: Arc<dyn Confirm>,
    overrides: OverrideModules,
}

impl ConsoleBuilder {
    pub fn persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = persistence;
        self
    }

    /// Share a session store with other components (e.g. the HTTP client)
    pub fn session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn overrides(mut self, overrides: OverrideModules) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn build(self) -> Arc<Console> {
        let ConsoleBuilder {
            config,
            auth,
            permissions,
            users,
            persistence,
            session,
            confirm,
            overrides,
        } = self;

        let session = session.unwrap_or_else(|| Arc::new(SessionStore::new(persistence.clone())));
        let permissions = Arc::new(PermissionStore::new(permissions));
        let router: Arc<dyn Router> = Arc::new(MemoryRouter::with_static_routes(
            &config.routes,
            &config.tabs.home_title,
            &config.tabs.home_icon,
        ));
        let resolver =
            ComponentResolver::standard(overrides, &config.routes.views_prefix, &config.routes.views_extension);
        let registrar = Arc::new(RouteRegistrar::new(
            Arc::clone(&router),
            Arc::clone(&permissions),
            resolver,
            config.routes.layout_route.clone(),
            config.routes.protected_routes.clone(),
        ));

        let home = TabItem::new(
            config.routes.home_path.clone(),
            config.tabs.home_title.clone(),
            config.tabs.home_icon.clone(),
        );
        let tabs = TabManager::restore(
            home,
            persistence.read::<TabsSnapshot>(StorageClass::Session, TABS_KEY).unwrap_or_default(),
            persistence.read::<PageCache>(StorageClass::Session, PAGE_CACHE_KEY).unwrap_or_default(),
        );

        let location = persistence
            .read::<String>(StorageClass::Session, LOCATION_KEY)
            .unwrap_or_else(|| {
                if session.logged_in() {
                    config.routes.home_path.clone()
                } else {
                    config.routes.login_path.clone()
                }
            });

        Arc::new_cyclic(|me| Console {
            me: me.clone(),
            config,
            persistence,
            session,
            refresh: RefreshCoordinator::new(),
            auth,
            permissions,
            user: UserStore::new(users),
            router,
            registrar,
            tabs: Mutex::new(tabs),
            location: RwLock::new(location),
            confirm,
            refetching_codes: AtomicBool::new(false),
        })
    }
}

pub struct Console {
    me: Weak<Console>,
    config: ConsoleConfig,
    persistence: Persistence,
    session: Arc<SessionStore>,
    refresh: RefreshCoordinator,
    auth: Arc<dyn AuthApi>,
    permissions: Arc<PermissionStore>,
    user: UserStore,
    router: Arc<dyn Router>,
    registrar: Arc<RouteRegistrar>,
    tabs: Mutex<TabManager>,
    location: RwLock<String>,
    confirm: Arc<dyn Confirm>,
    refetching_codes: AtomicBool,
}

impl Console {
    pub fn builder(
        config: ConsoleConfig,
        auth: Arc<dyn AuthApi>,
        permissions: Arc<dyn PermissionApi>,
        users: Arc<dyn UserProfileApi>,
    ) -> ConsoleBuilder {
        ConsoleBuilder {
            config,
            auth,
            permissions,
            users,
            persistence: Persistence::in_memory(),
            session: None,
            confirm: Arc::new(AutoConfirm),
            overrides: OverrideModules::default(),
        }
    }

    /// Console backed by the HTTP client, with the client's 401/403 recovery
    /// wired back into this console
    pub fn connect(
        config: ConsoleConfig,
        persistence: Persistence,
        confirm: Arc<dyn Confirm>,
        overrides: OverrideModules,
    ) -> Result<Arc<Console>, ApiError> {
        let session = Arc::new(SessionStore::new(persistence.clone()));
        let http = Arc::new(HttpClient::new(&config.api, Arc::clone(&session))?);
        tracing::debug!("Connecting console to {}", http.base_url());

        let console = Console::builder(config, http.clone(), http.clone(), http.clone())
            .persistence(persistence)
            .session(session)
            .confirm(confirm)
            .overrides(overrides)
            .build();

        let hooks: Weak<Console> = Arc::downgrade(&console);
        let hooks: Weak<dyn SessionHooks> = hooks;
        http.attach_hooks(hooks);
        Ok(console)
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn permissions(&self) -> &Arc<PermissionStore> {
        &self.permissions
    }

    pub fn user(&self) -> &UserStore {
        &self.user
    }

    pub fn router(&self) -> &Arc<dyn Router> {
        &self.router
    }

    pub fn registrar(&self) -> &Arc<RouteRegistrar> {
        &self.registrar
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    pub fn location(&self) -> String {
        self.location.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_location(&self, path: &str) {
        *self.location.write().unwrap_or_else(PoisonError::into_inner) = path.to_string();
        self.persistence.write(StorageClass::Session, LOCATION_KEY, &path);
    }

    fn lock_tabs(&self) -> MutexGuard<'_, TabManager> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate tabs and persist the result to session storage
    pub fn with_tabs<R>(&self, f: impl FnOnce(&mut TabManager) -> R) -> R {
        let mut tabs = self.lock_tabs();
        let result = f(&mut tabs);
        self.persistence.write(StorageClass::Session, TABS_KEY, &tabs.snapshot());
        self.persistence.write(StorageClass::Session, PAGE_CACHE_KEY, tabs.page_cache());
        result
    }

    pub fn tabs(&self) -> Vec<TabItem> {
        self.lock_tabs().tabs().to_vec()
    }

    pub fn active_tab(&self) -> Option<String> {
        self.lock_tabs().active_tab().map(str::to_string)
    }

    /// Restore-time warm-up for an already authenticated session
    pub async fn bootstrap(&self) -> bool {
        if !self.session.logged_in() {
            return false;
        }
        self.with_tabs(TabManager::ensure_home_tab);
        if !self.config.routes.eager_route_loading {
            return true;
        }
        self.registrar.ensure_routes_loaded().await
    }

    /// Exchange credentials, then load profile, permissions and routes.
    /// Tokens are kept even if a later step fails.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        let tokens = match self.auth.login(username, password).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!("Login failed for {}: {}", username, e);
                return false;
            }
        };

        self.refresh.reset();
        self.session.set_auth(tokens);
        tracing::info!("User {} authenticated", username);

        // The header can live without a profile
        self.user.fetch_profile().await;

        if let Err(e) = self.permissions.fetch_permission_codes().await {
            tracing::error!("Failed to load permission codes: {}", e);
            return false;
        }
        if let Err(e) = self.permissions.fetch_menu_tree().await {
            tracing::error!("Failed to load menu tree: {}", e);
            return false;
        }

        if self.config.routes.eager_route_loading && !self.registrar.reload_routes().await {
            tracing::warn!("Dynamic routes not loaded at login; will retry on navigation");
        }

        self.with_tabs(TabManager::initialize);
        true
    }

    /// Single-flight silent refresh. Concurrent callers share one network
    /// call and its result; a failed refresh logs the user out.
    pub async fn refresh_auth(&self) -> bool {
        let Some(console) = self.me.upgrade() else {
            return false;
        };
        self.refresh.run(move |ticket| console.perform_refresh(ticket)).await
    }

    /// A flight superseded by logout or a new login has its outcome dropped:
    /// no tokens written back, no second teardown.
    async fn perform_refresh(self: Arc<Self>, ticket: RefreshTicket) -> bool {
        let refresh_token = self.session.refresh_token();
        if refresh_token.is_empty() {
            tracing::warn!("No refresh token available, logging out");
            self.logout(false, true).await;
            return false;
        }

        tracing::debug!("Refreshing access token");
        match self.auth.refresh(&refresh_token).await {
            Ok(tokens) => {
                if ticket.commit(|| self.session.set_auth(tokens)) {
                    tracing::info!("Access token refreshed");
                    true
                } else {
                    tracing::debug!("Token refresh superseded, discarding new tokens");
                    false
                }
            }
            Err(e) if ticket.is_current() => {
                tracing::warn!("Token refresh failed, logging out: {}", e);
                self.logout(false, true).await;
                false
            }
            Err(e) => {
                tracing::debug!("Superseded token refresh failed: {}", e);
                false
            }
        }
    }

    /// Full teardown. Returns false only when the user cancels the prompt.
    pub async fn logout(&self, show_success: bool, skip_confirm: bool) -> bool {
        if !skip_confirm
            && !self
                .confirm
                .confirm("Log out", "Are you sure you want to log out?")
                .await
        {
            tracing::debug!("Logout cancelled");
            return false;
        }

        let refresh_token = self.session.refresh_token();
        if !refresh_token.is_empty() {
            if let Err(e) = self.auth.logout(&refresh_token).await {
                tracing::warn!("Server-side logout failed, clearing local session anyway: {}", e);
            }
        }

        self.clear_auth();
        self.user.clear();
        self.with_tabs(TabManager::clear_all_tabs);
        self.permissions.clear_view_data();
        let removed = self.registrar.clear_dynamic_routes();
        self.registrar.reset_routes_loaded_state();
        self.set_location(&self.config.routes.login_path);

        if show_success {
            tracing::info!("Logged out ({} dynamic routes removed)", removed);
        } else {
            tracing::debug!("Session torn down ({} dynamic routes removed)", removed);
        }
        true
    }

    /// Zero the tokens and detach any in-flight refresh
    pub fn clear_auth(&self) {
        self.session.clear();
        self.refresh.reset();
    }

    /// Walk the guard until it allows a path, then open a tab for it
    pub async fn navigate(&self, path: &str) -> Result<Navigation, NavigationError> {
        let routes = &self.config.routes;
        let mut target = path.to_string();
        let mut redirects: Vec<Redirect> = Vec::new();
        let mut retried_load = false;

        loop {
            let resolved = self.router.resolve(&target);
            let decision = evaluate(&resolved, self.session.logged_in(), routes);

            let (to, reason) = match decision {
                GuardDecision::Allow => {
                    self.arrive(&resolved);
                    return Ok(Navigation {
                        requested: path.to_string(),
                        location: resolved.path,
                        redirects,
                    });
                }
                GuardDecision::Redirect { to, reason } => (to, reason),
            };

            // A miss may only mean routes are not registered yet
            if reason == RedirectReason::NotFound && !retried_load && !self.registrar.is_loaded() {
                retried_load = true;
                if self.registrar.ensure_routes_loaded().await {
                    continue;
                }
            }

            if reason.closes_tab() {
                self.with_tabs(|tabs| {
                    if let Some(next) = tabs.remove_tab(&resolved.path) {
                        tabs.set_active_tab(next);
                    }
                });
            }

            tracing::debug!("Guard redirect {} -> {} ({:?})", resolved.path, to, reason);
            redirects.push(Redirect {
                from: resolved.path,
                to: to.clone(),
                reason,
            });
            if redirects.len() > routes.max_redirects {
                return Err(NavigationError::TooManyRedirects {
                    path: path.to_string(),
                    limit: routes.max_redirects,
                });
            }
            target = to;
        }
    }

    fn arrive(&self, resolved: &ResolvedRoute) {
        self.set_location(&resolved.path);

        let in_layout = resolved.matched.len() > 1
            && resolved
                .matched
                .first()
                .map(|root| root.name == self.config.routes.layout_route)
                .unwrap_or(false);
        if !in_layout {
            return;
        }

        let tab = TabItem::new(
            resolved.path.clone(),
            resolved.meta.title.clone().unwrap_or_else(|| resolved.path.clone()),
            resolved.meta.icon.clone().unwrap_or_default(),
        );
        self.with_tabs(|tabs| {
            tabs.ensure_home_tab();
            tabs.add_tab(tab);
        });
    }

    /// Close a tab; when it was active, move to the tab that takes its place
    pub async fn close_tab(&self, path: &str) -> Result<Option<Navigation>, NavigationError> {
        match self.with_tabs(|tabs| tabs.remove_tab(path)) {
            Some(next) => self.navigate(&next).await.map(Some),
            None => Ok(None),
        }
    }

    /// Close every tab but Home and go there
    pub async fn clear_tabs(&self) -> Result<Navigation, NavigationError> {
        self.with_tabs(TabManager::clear_tabs);
        self.navigate(&self.config.routes.home_path).await
    }

    pub fn save_to_cache(&self, path: &str, data: Map<String, Value>) -> bool {
        self.with_tabs(|tabs| tabs.save_to_cache(path, data))
    }

    pub fn update_cache(&self, path: &str, partial: Map<String, Value>) -> bool {
        self.with_tabs(|tabs| tabs.update_cache(path, partial))
    }

    pub fn cached(&self, path: &str) -> Option<Map<String, Value>> {
        self.lock_tabs().cached(path).cloned()
    }
}

#[async_trait]
impl SessionHooks for Console {
    async fn reauthenticate(&self) -> bool {
        self.refresh_auth().await
    }

    async fn permissions_changed(&self) {
        // A 403 on the codes endpoint itself must not loop back here
        if self.refetching_codes.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.permissions.fetch_permission_codes().await {
            Ok(count) => tracing::info!("Permission codes reloaded ({} granted)", count),
            Err(e) => tracing::warn!("Failed to reload permission codes: {}", e),
        }
        self.refetching_codes.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouteLoadState;
    use crate::testing::{menu, FakeAuthApi, FakePermissionApi, FakeUserApi, ScriptedConfirm, PASSWORD};
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        console: Arc<Console>,
        auth: Arc<FakeAuthApi>,
        permissions: Arc<FakePermissionApi>,
        users: Arc<FakeUserApi>,
    }

    fn harness_with(config: ConsoleConfig) -> Harness {
        let auth = Arc::new(FakeAuthApi::new());
        let permissions = Arc::new(FakePermissionApi::new(vec![
            menu(1, "Users", "/system/user"),
            menu(2, "Roles", "/system/role"),
        ]));
        let users = Arc::new(FakeUserApi::new());
        let console = Console::builder(config, auth.clone(), permissions.clone(), users.clone()).build();
        Harness {
            console,
            auth,
            permissions,
            users,
        }
    }

    fn harness() -> Harness {
        harness_with(ConsoleConfig::development())
    }

    fn tab_paths(console: &Console) -> Vec<String> {
        console.tabs().into_iter().map(|t| t.path).collect()
    }

    fn state(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_login_end_to_end() {
        let h = harness();
        assert!(h.console.login("admin", PASSWORD).await);
        assert!(h.console.session().logged_in());
        assert_eq!(h.users.calls(), 1);

        let mut names = h.console.registrar().dynamic_route_names();
        names.sort();
        assert_eq!(names, vec!["Roles".to_string(), "Users".to_string()]);

        let nav = h.console.navigate("/system/user").await.unwrap();
        assert!(nav.allowed());
        assert_eq!(h.console.location(), "/system/user");
        assert_eq!(tab_paths(&h.console), vec!["/home", "/system/user"]);
        assert_eq!(h.console.active_tab().as_deref(), Some("/system/user"));
    }

    #[tokio::test]
    async fn test_bad_credentials_leave_no_session() {
        let h = harness();
        assert!(!h.console.login("admin", "wrong").await);
        assert!(!h.console.session().logged_in());
        assert_eq!(h.permissions.tree_calls(), 0);
        assert!(h.console.tabs().is_empty());
    }

    #[tokio::test]
    async fn test_profile_failure_does_not_block_login() {
        let h = harness();
        h.users.fail(true);
        assert!(h.console.login("admin", PASSWORD).await);
        assert!(h.console.user().profile().is_none());
        assert!(h.console.registrar().is_loaded());
    }

    #[tokio::test]
    async fn test_permission_code_failure_fails_login_but_keeps_tokens() {
        let h = harness();
        h.permissions.fail_codes(true);
        assert!(!h.console.login("admin", PASSWORD).await);
        assert!(h.console.session().logged_in());
        assert!(!h.console.registrar().is_loaded());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_calls_share_one_request() {
        let h = harness();
        assert!(h.console.login("admin", PASSWORD).await);
        h.auth.set_refresh_delay(Duration::from_millis(40));

        let calls: Vec<_> = (0..6)
            .map(|_| {
                let console = Arc::clone(&h.console);
                tokio::spawn(async move { console.refresh_auth().await })
            })
            .collect();
        let mut results = Vec::new();
        for call in calls {
            results.push(call.await.unwrap());
        }

        assert!(results.iter().all(|ok| *ok));
        assert_eq!(h.auth.refresh_calls(), 1);
        assert!(!h.console.is_refreshing());
        assert_eq!(h.console.session().access_token(), "access-2");
    }

    #[tokio::test]
    async fn test_failed_refresh_forces_logout_for_every_waiter() {
        let h = harness();
        assert!(h.console.login("admin", PASSWORD).await);
        h.console.navigate("/system/user").await.unwrap();
        h.auth.fail_refresh(true);
        h.auth.set_refresh_delay(Duration::from_millis(20));

        let (a, b) = tokio::join!(h.console.refresh_auth(), h.console.refresh_auth());
        assert!(!a && !b);
        assert_eq!(h.auth.refresh_calls(), 1);
        assert!(!h.console.session().logged_in());
        assert_eq!(h.console.location(), "/login");
        assert!(h.console.tabs().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_finishing_after_logout_is_discarded() {
        let h = harness();
        assert!(h.console.login("admin", PASSWORD).await);
        h.auth.set_refresh_delay(Duration::from_millis(60));

        let pending = {
            let console = Arc::clone(&h.console);
            tokio::spawn(async move { console.refresh_auth().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(h.console.is_refreshing());

        assert!(h.console.logout(false, true).await);
        assert!(!pending.await.unwrap());

        assert_eq!(h.auth.refresh_calls(), 1);
        assert!(!h.console.session().logged_in());
        assert!(h.console.session().refresh_token().is_empty());
        assert!(!h.console.is_refreshing());
        assert_eq!(h.console.location(), "/login");
    }

    #[tokio::test]
    async fn test_stale_refresh_failure_does_not_log_out_a_new_session() {
        let h = harness();
        assert!(h.console.login("admin", PASSWORD).await);
        h.auth.fail_refresh(true);
        h.auth.set_refresh_delay(Duration::from_millis(60));

        let pending = {
            let console = Arc::clone(&h.console);
            tokio::spawn(async move { console.refresh_auth().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(h.console.login("admin", PASSWORD).await);
        assert!(!pending.await.unwrap());

        assert!(h.console.session().logged_in());
        assert_eq!(h.console.session().access_token(), "access-2");
        assert_eq!(h.auth.logout_calls(), 0);
        assert_eq!(tab_paths(&h.console), vec!["/home"]);
    }

    #[tokio::test]
    async fn test_logout_tears_everything_down() {
        let h = harness();
        assert!(h.console.login("admin", PASSWORD).await);
        h.console.navigate("/system/user").await.unwrap();
        assert!(h.console.save_to_cache("/system/user", state(json!({"page": 2}))));

        assert!(h.console.logout(true, true).await);
        assert_eq!(h.auth.logout_calls(), 1);
        assert!(!h.console.session().logged_in());
        assert!(h.console.tabs().is_empty());
        assert!(h.console.cached("/system/user").is_none());
        assert_eq!(h.console.registrar().state(), RouteLoadState::NotLoaded);
        assert!(h.console.registrar().dynamic_route_names().is_empty());
        assert!(!h.console.permissions().has_permission("user:add"));
        assert_eq!(h.console.location(), "/login");
    }

    #[tokio::test]
    async fn test_logout_survives_server_failure_and_honours_cancel() {
        let auth = Arc::new(FakeAuthApi::new());
        let confirm = Arc::new(ScriptedConfirm::new(false));
        let console = Console::builder(
            ConsoleConfig::development(),
            auth.clone(),
            Arc::new(FakePermissionApi::new(vec![menu(1, "Users", "/system/user")])),
            Arc::new(FakeUserApi::new()),
        )
        .confirm(confirm.clone())
        .build();
        assert!(console.login("admin", PASSWORD).await);

        assert!(!console.logout(true, false).await);
        assert_eq!(confirm.prompts(), 1);
        assert!(console.session().logged_in());

        auth.fail_logout(true);
        assert!(console.logout(false, true).await);
        assert!(!console.session().logged_in());
    }

    #[tokio::test]
    async fn test_anonymous_navigation_lands_on_login() {
        let h = harness();
        let nav = h.console.navigate("/system/user").await.unwrap();
        assert_eq!(nav.location, "/login");
        assert_eq!(nav.last_reason(), Some(RedirectReason::LoginRequired));
        assert!(h.console.tabs().is_empty());
    }

    #[tokio::test]
    async fn test_root_and_login_redirect_home_when_signed_in() {
        let h = harness();
        assert!(h.console.login("admin", PASSWORD).await);
        for path in ["/", "/login"] {
            let nav = h.console.navigate(path).await.unwrap();
            assert_eq!(nav.location, "/home");
        }
        assert_eq!(tab_paths(&h.console), vec!["/home"]);
    }

    #[tokio::test]
    async fn test_forbidden_route_closes_its_tab() {
        let h = harness();
        let mut locked = menu(3, "Audit", "/audit");
        locked.has_permission = false;
        h.permissions.set_tree(vec![menu(1, "Users", "/system/user"), locked]);
        assert!(h.console.login("admin", PASSWORD).await);

        // Tab left over from before the permission change
        h.console.with_tabs(|tabs| tabs.add_tab(TabItem::new("/audit", "Audit", "")));

        let nav = h.console.navigate("/audit").await.unwrap();
        assert_eq!(nav.location, "/403");
        assert_eq!(nav.last_reason(), Some(RedirectReason::PermissionDenied));
        assert!(!tab_paths(&h.console).contains(&"/audit".to_string()));
        assert_eq!(h.console.active_tab().as_deref(), Some("/home"));
    }

    #[tokio::test]
    async fn test_rejected_active_tab_hands_focus_to_an_open_tab() {
        let h = harness();
        assert!(h.console.login("admin", PASSWORD).await);
        h.console.navigate("/system/user").await.unwrap();
        h.console.navigate("/system/role").await.unwrap();
        h.console.navigate("/system/user").await.unwrap();
        assert_eq!(h.console.active_tab().as_deref(), Some("/system/user"));

        // Users loses permission, Roles is retired
        let mut users = menu(1, "Users", "/system/user");
        users.has_permission = false;
        let mut roles = menu(2, "Roles", "/system/role");
        roles.node.is_valid = false;
        h.permissions.set_tree(vec![users, roles]);
        assert!(h.console.registrar().reload_routes().await);

        let nav = h.console.navigate("/system/user").await.unwrap();
        assert_eq!(nav.location, "/403");
        assert_eq!(tab_paths(&h.console), vec!["/home", "/system/role"]);
        assert_eq!(h.console.active_tab().as_deref(), Some("/system/role"));

        let nav = h.console.navigate("/system/role").await.unwrap();
        assert_eq!(nav.location, "/503");
        assert_eq!(nav.last_reason(), Some(RedirectReason::Unavailable));
        assert_eq!(tab_paths(&h.console), vec!["/home"]);
        assert_eq!(h.console.active_tab().as_deref(), Some("/home"));
    }

    #[tokio::test]
    async fn test_lazy_mode_loads_routes_on_first_miss() {
        let mut config = ConsoleConfig::development();
        config.routes.eager_route_loading = false;
        let h = harness_with(config);

        assert!(h.console.login("admin", PASSWORD).await);
        assert_eq!(h.permissions.tree_calls(), 0);

        let nav = h.console.navigate("/system/role").await.unwrap();
        assert!(nav.allowed());
        assert_eq!(h.permissions.tree_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_path_goes_to_not_found_after_one_load_attempt() {
        let mut config = ConsoleConfig::development();
        config.routes.eager_route_loading = false;
        let h = harness_with(config);
        assert!(h.console.login("admin", PASSWORD).await);

        let nav = h.console.navigate("/nowhere").await.unwrap();
        assert_eq!(nav.location, "/404");
        assert_eq!(h.permissions.tree_calls(), 1);

        h.console.navigate("/still-nowhere").await.unwrap();
        assert_eq!(h.permissions.tree_calls(), 1);
    }

    #[tokio::test]
    async fn test_closing_active_tab_moves_to_its_neighbour() {
        let h = harness();
        assert!(h.console.login("admin", PASSWORD).await);
        h.console.navigate("/system/user").await.unwrap();
        h.console.navigate("/system/role").await.unwrap();
        h.console.navigate("/system/user").await.unwrap();

        let nav = h.console.close_tab("/system/user").await.unwrap().unwrap();
        assert_eq!(nav.location, "/system/role");
        assert_eq!(tab_paths(&h.console), vec!["/home", "/system/role"]);
        assert!(h.console.close_tab("/home").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tabs_and_cache_survive_a_restart_with_shared_storage() {
        let persistence = Persistence::in_memory();
        let build = || {
            Console::builder(
                ConsoleConfig::development(),
                Arc::new(FakeAuthApi::new()),
                Arc::new(FakePermissionApi::new(vec![menu(1, "Users", "/system/user")])),
                Arc::new(FakeUserApi::new()),
            )
            .persistence(persistence.clone())
            .build()
        };

        let first = build();
        assert!(first.login("admin", PASSWORD).await);
        first.navigate("/system/user").await.unwrap();
        assert!(first.save_to_cache("/system/user", state(json!({"page": 4}))));

        let second = build();
        assert!(second.session().logged_in());
        assert_eq!(second.location(), "/system/user");
        assert_eq!(second.cached("/system/user"), Some(state(json!({"page": 4}))));

        // Fresh process: routes come back through the guard's lazy load
        let nav = second.navigate("/system/user").await.unwrap();
        assert!(nav.allowed());
    }
}
