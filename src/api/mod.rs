//! Collaborator contracts consumed by the console core
//!
//! The core never talks to a transport directly; everything network-bound goes
//! through these traits so tests can substitute in-memory fakes.

pub mod http;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{PermissionTreeEntry, TokenPair, UserProfile};

pub use http::HttpClient;

/// Token exchange endpoints
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token pair. Fails on invalid credentials.
    async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError>;

    /// Exchange a refresh token for a new pair. Fails on invalid or expired tokens.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;

    /// Best-effort server-side session revocation
    async fn logout(&self, refresh_token: &str) -> Result<(), ApiError>;
}

/// Permission tree and permission code endpoints
#[async_trait]
pub trait PermissionApi: Send + Sync {
    /// Tree of navigable views for the current user. Empty when the user has none.
    async fn get_view_tree(&self) -> Result<Vec<PermissionTreeEntry>, ApiError>;

    /// Sidebar menu tree, optionally as seen by another role
    async fn get_menu_tree(&self, target_role_id: Option<i64>) -> Result<Vec<PermissionTreeEntry>, ApiError>;

    /// Flat list of permission codes granted to the current user
    async fn get_permission_codes(&self) -> Result<Vec<String>, ApiError>;
}

#[async_trait]
pub trait UserProfileApi: Send + Sync {
    async fn get_user(&self) -> Result<UserProfile, ApiError>;
}

/// Callbacks the HTTP layer uses to recover from auth failures
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Refresh the session; `true` means the request may be retried with the new token
    async fn reauthenticate(&self) -> bool;

    /// The backend rejected a request as forbidden; permission data may be stale
    async fn permissions_changed(&self);
}

/// Interactive confirmation, e.g. "really log out?"
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, title: &str, message: &str) -> bool;
}

/// Confirms everything; used when no interactive surface exists
pub struct AutoConfirm;

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, _title: &str, _message: &str) -> bool {
        true
    }
}
