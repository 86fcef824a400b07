//! Permission data for the signed-in user: view tree, menu tree, action codes

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use crate::api::PermissionApi;
use crate::error::ApiError;
use crate::types::PermissionTreeEntry;

#[derive(Default)]
struct PermissionData {
    view_tree: Vec<PermissionTreeEntry>,
    menu_tree: Vec<PermissionTreeEntry>,
    codes: HashSet<String>,
}

pub struct PermissionStore {
    api: Arc<dyn PermissionApi>,
    data: RwLock<PermissionData>,
}

impl PermissionStore {
    pub fn new(api: Arc<dyn PermissionApi>) -> Self {
        Self {
            api,
            data: RwLock::new(PermissionData::default()),
        }
    }

    fn with_data<R>(&self, f: impl FnOnce(&PermissionData) -> R) -> R {
        f(&self.data.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn with_data_mut<R>(&self, f: impl FnOnce(&mut PermissionData) -> R) -> R {
        f(&mut self.data.write().unwrap_or_else(PoisonError::into_inner))
    }

    /// Fetch the view tree; a non-empty result replaces the stored one
    pub async fn fetch_view_tree(&self) -> Result<Vec<PermissionTreeEntry>, ApiError> {
        let tree = self.api.get_view_tree().await?;
        if !tree.is_empty() {
            self.with_data_mut(|data| data.view_tree = tree.clone());
        }
        Ok(tree)
    }

    pub async fn fetch_menu_tree(&self) -> Result<Vec<PermissionTreeEntry>, ApiError> {
        let tree = self.api.get_menu_tree(None).await?;
        self.with_data_mut(|data| data.menu_tree = tree.clone());
        Ok(tree)
    }

    pub async fn fetch_permission_codes(&self) -> Result<usize, ApiError> {
        let codes = self.api.get_permission_codes().await?;
        let count = codes.len();
        self.with_data_mut(|data| data.codes = codes.into_iter().collect());
        tracing::debug!("Loaded {} permission codes", count);
        Ok(count)
    }

    pub fn view_tree(&self) -> Vec<PermissionTreeEntry> {
        self.with_data(|data| data.view_tree.clone())
    }

    pub fn menu_tree(&self) -> Vec<PermissionTreeEntry> {
        self.with_data(|data| data.menu_tree.clone())
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.with_data(|data| data.codes.contains(code))
    }

    /// Any one of `codes` suffices
    pub fn has_any_permission<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        self.with_data(|data| codes.iter().any(|c| data.codes.contains(c.as_ref())))
    }

    /// Every one of `codes` is required
    pub fn has_all_permissions<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        self.with_data(|data| codes.iter().all(|c| data.codes.contains(c.as_ref())))
    }

    pub fn clear_view_data(&self) {
        self.with_data_mut(|data| *data = PermissionData::default());
    }
}
