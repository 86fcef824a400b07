//! Session state: the token pair, its persistence, and refresh coordination

pub mod claims;
pub mod refresh;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::persistence::{Persistence, StorageClass};
use crate::types::TokenPair;

pub use claims::{peek_claims, TokenClaims};
pub use refresh::{RefreshCoordinator, RefreshTicket};

const SESSION_KEY: &str = "auth";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn logged_in(&self) -> bool {
        !self.access_token.is_empty()
    }
}

/// Owner of the process-wide session; durable across restarts
pub struct SessionStore {
    session: RwLock<Session>,
    persistence: Persistence,
}

impl SessionStore {
    /// Restore the last persisted session, if any
    pub fn new(persistence: Persistence) -> Self {
        let session: Session = persistence
            .read(StorageClass::Durable, SESSION_KEY)
            .unwrap_or_default();

        if session.logged_in() {
            tracing::debug!("Restored persisted session for {:?}", session.username);
        }

        Self {
            session: RwLock::new(session),
            persistence,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn logged_in(&self) -> bool {
        self.read().logged_in()
    }

    pub fn access_token(&self) -> String {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> String {
        self.read().refresh_token.clone()
    }

    /// Install a fresh token pair (login or refresh)
    pub fn set_auth(&self, tokens: TokenPair) {
        let snapshot = {
            let mut session = self.write();
            session.access_token = tokens.access_token;
            session.refresh_token = tokens.refresh_token;
            if tokens.username.is_some() {
                session.username = tokens.username;
            }
            session.updated_at = Some(Utc::now());
            session.clone()
        };
        self.persistence.write(StorageClass::Durable, SESSION_KEY, &snapshot);
    }

    /// Zero both tokens and drop the persisted copy
    pub fn clear(&self) {
        *self.write() = Session::default();
        self.persistence.erase(StorageClass::Durable, SESSION_KEY);
    }
}
