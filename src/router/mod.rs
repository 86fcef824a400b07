//! Route table: the named-route collection the registrar mutates and the
//! guard consults

pub mod guard;
pub mod registrar;
pub mod resolver;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::config::RouteConfig;
use crate::error::RouterError;

pub use guard::{evaluate, GuardDecision, RedirectReason};
pub use registrar::{RouteLoadState, RouteRegistrar};
pub use resolver::{ComponentResolver, ComponentSource, ResolvedComponent};

/// Per-route metadata; unset flags mean "default"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Defaults to true when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_permission: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_source: Option<ComponentSource>,
}

impl RouteMeta {
    /// Child values win over parent values
    fn merged_over(&self, parent: &RouteMeta) -> RouteMeta {
        RouteMeta {
            title: self.title.clone().or_else(|| parent.title.clone()),
            icon: self.icon.clone().or_else(|| parent.icon.clone()),
            requires_auth: self.requires_auth.or(parent.requires_auth),
            has_permission: self.has_permission.or(parent.has_permission),
            is_valid: self.is_valid.or(parent.is_valid),
            component_source: self.component_source.or(parent.component_source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default)]
    pub meta: RouteMeta,
}

impl RouteRecord {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            component: None,
            meta: RouteMeta::default(),
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }
}

/// Outcome of matching a path against the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub path: String,
    /// Matched records, outermost first; empty when nothing matched
    pub matched: Vec<RouteRecord>,
    /// Metadata merged along `matched`
    pub meta: RouteMeta,
}

impl ResolvedRoute {
    pub fn is_match(&self) -> bool {
        !self.matched.is_empty()
    }

    pub fn leaf(&self) -> Option<&RouteRecord> {
        self.matched.last()
    }
}

/// External mutable collection of named routes
pub trait Router: Send + Sync {
    /// Register `route` under `parent` (or at top level when `None`)
    fn add_route(&self, parent: Option<&str>, route: RouteRecord) -> Result<(), RouterError>;

    /// Remove a route and its descendants; false if no such name
    fn remove_route(&self, name: &str) -> bool;

    /// Every registered record with its full path
    fn get_routes(&self) -> Vec<RouteRecord>;

    fn children_of(&self, parent: &str) -> Vec<RouteRecord>;

    fn has_route(&self, name: &str) -> bool;

    fn resolve(&self, path: &str) -> ResolvedRoute;
}

#[derive(Debug, Clone)]
struct Entry {
    record: RouteRecord,
    parent: Option<String>,
    full_path: String,
}

/// In-process route table with exact-path matching
#[derive(Default)]
pub struct MemoryRouter {
    entries: RwLock<Vec<Entry>>,
}

impl MemoryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with the console's static routes: login, the error pages,
    /// the layout and its pinned Home child
    pub fn with_static_routes(routes: &RouteConfig, home_title: &str, home_icon: &str) -> Self {
        let router = Self::new();
        for route in static_routes(routes, home_title, home_icon) {
            let (parent, record) = route;
            // Static names are distinct by construction
            if let Err(e) = router.add_route(parent.as_deref(), record) {
                tracing::error!("Static route rejected: {}", e);
            }
        }
        router
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn chain(entries: &[Entry], leaf: &Entry) -> Vec<RouteRecord> {
        let mut chain = vec![leaf.record.clone()];
        let mut parent = leaf.parent.clone();
        while let Some(name) = parent {
            match entries.iter().find(|e| e.record.name == name) {
                Some(entry) => {
                    chain.push(entry.record.clone());
                    parent = entry.parent.clone();
                }
                None => break,
            }
        }
        chain.reverse();
        chain
    }
}

fn join_path(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        return child.to_string();
    }
    let base = parent.trim_end_matches('/');
    if child.is_empty() {
        if base.is_empty() { "/".to_string() } else { base.to_string() }
    } else {
        format!("{}/{}", base, child)
    }
}

impl Router for MemoryRouter {
    fn add_route(&self, parent: Option<&str>, route: RouteRecord) -> Result<(), RouterError> {
        let mut entries = self.write();

        if entries.iter().any(|e| e.record.name == route.name) {
            return Err(RouterError::DuplicateName(route.name));
        }

        let full_path = match parent {
            Some(parent_name) => {
                let parent_entry = entries
                    .iter()
                    .find(|e| e.record.name == parent_name)
                    .ok_or_else(|| RouterError::UnknownParent(parent_name.to_string()))?;
                join_path(&parent_entry.full_path, &route.path)
            }
            None => join_path("/", &route.path),
        };

        entries.push(Entry {
            record: route,
            parent: parent.map(str::to_string),
            full_path,
        });
        Ok(())
    }

    fn remove_route(&self, name: &str) -> bool {
        let mut entries = self.write();
        if !entries.iter().any(|e| e.record.name == name) {
            return false;
        }

        let mut doomed = vec![name.to_string()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let current = doomed[cursor].clone();
            doomed.extend(
                entries
                    .iter()
                    .filter(|e| e.parent.as_deref() == Some(current.as_str()))
                    .map(|e| e.record.name.clone()),
            );
            cursor += 1;
        }

        entries.retain(|e| !doomed.contains(&e.record.name));
        true
    }

    fn get_routes(&self) -> Vec<RouteRecord> {
        self.read()
            .iter()
            .map(|e| RouteRecord {
                path: e.full_path.clone(),
                ..e.record.clone()
            })
            .collect()
    }

    fn children_of(&self, parent: &str) -> Vec<RouteRecord> {
        self.read()
            .iter()
            .filter(|e| e.parent.as_deref() == Some(parent))
            .map(|e| e.record.clone())
            .collect()
    }

    fn has_route(&self, name: &str) -> bool {
        self.read().iter().any(|e| e.record.name == name)
    }

    fn resolve(&self, path: &str) -> ResolvedRoute {
        let entries = self.read();
        let normalized = if path.len() > 1 { path.trim_end_matches('/') } else { path };

        // Registration order decides between equal paths; the first wins
        let matched = entries
            .iter()
            .find(|e| e.full_path == normalized)
            .map(|leaf| Self::chain(&entries, leaf))
            .unwrap_or_default();

        let meta = matched
            .iter()
            .fold(RouteMeta::default(), |acc, record| record.meta.merged_over(&acc));

        ResolvedRoute {
            path: normalized.to_string(),
            matched,
            meta,
        }
    }
}

fn static_routes(routes: &RouteConfig, home_title: &str, home_icon: &str) -> Vec<(Option<String>, RouteRecord)> {
    let public = |title: &str| RouteMeta {
        title: Some(title.to_string()),
        requires_auth: Some(false),
        ..RouteMeta::default()
    };

    vec![
        (
            None,
            RouteRecord::new("Login", routes.login_path.clone())
                .with_component("/src/views/Login.vue")
                .with_meta(public("Login")),
        ),
        (
            None,
            RouteRecord::new("Forbidden", routes.forbidden_path.clone()).with_meta(public("Forbidden")),
        ),
        (
            None,
            RouteRecord::new("NotFound", routes.not_found_path.clone()).with_meta(public("Not Found")),
        ),
        (
            None,
            RouteRecord::new("Unavailable", routes.unavailable_path.clone()).with_meta(public("Unavailable")),
        ),
        (
            None,
            RouteRecord::new(routes.layout_route.clone(), routes.root_path.clone())
                .with_component("/src/layouts/MainLayout.vue"),
        ),
        (
            Some(routes.layout_route.clone()),
            RouteRecord::new("Home", routes.home_path.clone())
                .with_component("/src/views/Home.vue")
                .with_meta(RouteMeta {
                    title: Some(home_title.to_string()),
                    icon: Some(home_icon.to_string()),
                    ..RouteMeta::default()
                }),
        ),
    ]
}
