//! reqwest implementation of the backend collaborators
//!
//! Every response is a `{ code, data, message }` envelope. A protected request
//! answered with code 401 is re-sent once after the attached hooks refresh the
//! session; code 403 asks the hooks to re-fetch permission codes. The token
//! endpoints themselves never take the retry path.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use url::Url;

use super::{AuthApi, PermissionApi, SessionHooks, UserProfileApi};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::session::SessionStore;
use crate::types::{ApiEnvelope, PermissionTreeEntry, TokenPair, UserProfile};

const SUCCESS: i32 = 200;

#[derive(Debug, Clone)]
struct Request {
    url: Url,
    body: Option<Value>,
}

impl Request {
    fn get(url: Url) -> Self {
        Self { url, body: None }
    }

    fn post(url: Url, body: Value) -> Self {
        Self { url, body: Some(body) }
    }
}

pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
    hooks: RwLock<Option<Weak<dyn SessionHooks>>>,
}

impl HttpClient {
    pub fn new(config: &ApiConfig, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        // Url::join drops the last segment unless the base ends with '/'
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            session,
            hooks: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Install the recovery callbacks. Held weakly; the owner keeps them alive.
    pub fn attach_hooks(&self, hooks: Weak<dyn SessionHooks>) {
        *self.hooks.write().unwrap_or_else(PoisonError::into_inner) = Some(hooks);
    }

    fn hooks(&self) -> Option<Arc<dyn SessionHooks>> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// One round trip, decoded from the envelope
    async fn execute<T: DeserializeOwned>(&self, request: &Request) -> Result<Option<T>, ApiError> {
        let mut builder = match &request.body {
            Some(body) => self.client.post(request.url.clone()).json(body),
            None => self.client.get(request.url.clone()),
        };

        let token = self.session.access_token();
        if !token.is_empty() {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!("{} {}", if request.body.is_some() { "POST" } else { "GET" }, request.url.path());
        let response = builder.send().await?;
        let status = response.status();

        let envelope: ApiEnvelope<T> = match response.json().await {
            Ok(envelope) => envelope,
            // Non-envelope bodies on error statuses are classified by the status itself
            Err(_) if !status.is_success() => {
                return Err(ApiError::from_envelope(
                    i32::from(status.as_u16()),
                    status.canonical_reason().unwrap_or("request failed"),
                ));
            }
            Err(e) => return Err(ApiError::decode(e.to_string())),
        };

        if envelope.code == SUCCESS {
            Ok(envelope.data)
        } else {
            Err(ApiError::from_envelope(envelope.code, envelope.message))
        }
    }

    /// Request that may trigger a session refresh and a single retry
    async fn protected<T: DeserializeOwned>(&self, request: Request) -> Result<Option<T>, ApiError> {
        let result = match self.execute(&request).await {
            Err(ApiError::Unauthorized(message)) => {
                let refreshed = match self.hooks() {
                    Some(hooks) => hooks.reauthenticate().await,
                    None => false,
                };
                if refreshed {
                    tracing::debug!("Retrying {} after token refresh", request.url.path());
                    self.execute(&request).await
                } else {
                    Err(ApiError::Unauthorized(message))
                }
            }
            other => other,
        };

        if let Err(ApiError::Forbidden(_)) = &result {
            if let Some(hooks) = self.hooks() {
                hooks.permissions_changed().await;
            }
        }

        result
    }

    fn require<T>(data: Option<T>, what: &str) -> Result<T, ApiError> {
        data.ok_or_else(|| ApiError::empty_payload(format!("{} response carried no data", what)))
    }
}

#[async_trait]
impl AuthApi for HttpClient {
    async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let url = self.endpoint("auth/login", &[])?;
        let request = Request::post(url, json!({ "username": username, "password": password }));
        Self::require(self.execute(&request).await?, "login")
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let url = self.endpoint("auth/refresh", &[("refreshToken", refresh_token)])?;
        Self::require(self.execute(&Request::get(url)).await?, "refresh")
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), ApiError> {
        let url = self.endpoint("user/logout", &[("refreshToken", refresh_token)])?;
        self.execute::<Value>(&Request::get(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl PermissionApi for HttpClient {
    async fn get_view_tree(&self) -> Result<Vec<PermissionTreeEntry>, ApiError> {
        let url = self.endpoint("permission/view/tree", &[])?;
        Ok(self.protected(Request::get(url)).await?.unwrap_or_default())
    }

    async fn get_menu_tree(&self, target_role_id: Option<i64>) -> Result<Vec<PermissionTreeEntry>, ApiError> {
        let role = target_role_id.map(|id| id.to_string());
        let query: Vec<(&str, &str)> = role.iter().map(|id| ("targetRoleId", id.as_str())).collect();
        let url = self.endpoint("permission/menu/tree", &query)?;
        Ok(self.protected(Request::get(url)).await?.unwrap_or_default())
    }

    async fn get_permission_codes(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint("permission/codes", &[])?;
        Ok(self.protected(Request::get(url)).await?.unwrap_or_default())
    }
}

#[async_trait]
impl UserProfileApi for HttpClient {
    async fn get_user(&self) -> Result<UserProfile, ApiError> {
        let url = self.endpoint("user/get", &[])?;
        Self::require(self.protected(Request::get(url)).await?, "user")
    }
}
