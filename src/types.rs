//! Wire types shared by the api, router and console layers

use serde::{Deserialize, Serialize};

/// Kind of node in the permission tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionKind {
    Directory,
    Menu,
    Page,
    Button,
}

impl PermissionKind {
    /// Menus and pages are navigable; directories only group, buttons only gate actions
    pub fn is_routable(&self) -> bool {
        matches!(self, PermissionKind::Menu | PermissionKind::Page)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionNode {
    pub id: i64,
    pub name: String,
    pub path: String,
    /// Component identifier, e.g. `/system/User`
    #[serde(default)]
    pub component: String,
    #[serde(rename = "type")]
    pub kind: PermissionKind,
    #[serde(default)]
    pub parent_id: i64,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_code: Option<String>,
    #[serde(default = "default_true")]
    pub is_valid: bool,
}

/// A permission node as delivered in a tree, with the per-user visibility flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionTreeEntry {
    pub node: PermissionNode,
    #[serde(default = "default_true")]
    pub has_permission: bool,
    #[serde(default)]
    pub children: Vec<PermissionTreeEntry>,
}

fn default_true() -> bool {
    true
}

/// Token pair returned by login and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_node_id: i64,
    #[serde(default)]
    pub level: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default = "default_true")]
    pub is_valid: bool,
}

/// Backend response envelope: `{ code, data, message }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i32,
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
}
