use std::sync::{Arc, PoisonError, RwLock};

use crate::api::UserProfileApi;
use crate::types::UserProfile;

/// Profile of the signed-in user
pub struct UserStore {
    api: Arc<dyn UserProfileApi>,
    profile: RwLock<Option<UserProfile>>,
}

impl UserStore {
    pub fn new(api: Arc<dyn UserProfileApi>) -> Self {
        Self {
            api,
            profile: RwLock::new(None),
        }
    }

    /// Fetch and store the profile; false (and the old value kept) on failure
    pub async fn fetch_profile(&self) -> bool {
        match self.api.get_user().await {
            Ok(profile) => {
                *self.profile.write().unwrap_or_else(PoisonError::into_inner) = Some(profile);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to load user profile: {}", e);
                false
            }
        }
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        *self.profile.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
