//! Dynamic route registration from the permission view tree
//!
//! Load state is tri-state (NotLoaded | Loading | Loaded). Concurrent callers
//! during Loading all await the one shared flight. Every reset bumps a
//! generation counter; a flight that completes under an older generation has
//! its result discarded instead of being registered.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::permission::PermissionStore;
use crate::router::resolver::ComponentResolver;
use crate::router::{RouteMeta, RouteRecord, Router};
use crate::types::PermissionTreeEntry;

type Flight = Shared<BoxFuture<'static, bool>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteLoadState {
    NotLoaded,
    Loading,
    Loaded,
}

enum LoadState {
    NotLoaded,
    Loading(Flight),
    Loaded,
}

struct Slot {
    generation: u64,
    state: LoadState,
}

pub struct RouteRegistrar {
    router: Arc<dyn Router>,
    permissions: Arc<PermissionStore>,
    resolver: ComponentResolver,
    layout_route: String,
    protected_routes: Vec<String>,
    slot: Mutex<Slot>,
}

impl RouteRegistrar {
    pub fn new(
        router: Arc<dyn Router>,
        permissions: Arc<PermissionStore>,
        resolver: ComponentResolver,
        layout_route: impl Into<String>,
        protected_routes: Vec<String>,
    ) -> Self {
        Self {
            router,
            permissions,
            resolver,
            layout_route: layout_route.into(),
            protected_routes,
            slot: Mutex::new(Slot {
                generation: 0,
                state: LoadState::NotLoaded,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RouteLoadState {
        match self.lock().state {
            LoadState::NotLoaded => RouteLoadState::NotLoaded,
            LoadState::Loading(_) => RouteLoadState::Loading,
            LoadState::Loaded => RouteLoadState::Loaded,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == RouteLoadState::Loaded
    }

    /// Load routes once per session. Never fails loudly: `false` means
    /// "nothing registered, try again later".
    pub async fn ensure_routes_loaded(self: &Arc<Self>) -> bool {
        let flight = {
            let mut slot = self.lock();
            let running = match &slot.state {
                LoadState::Loaded => return true,
                LoadState::Loading(flight) => Some(flight.clone()),
                LoadState::NotLoaded => None,
            };
            match running {
                Some(flight) => {
                    tracing::debug!("Route load already in flight, joining");
                    flight
                }
                None => {
                    slot.generation += 1;
                    let generation = slot.generation;
                    let registrar = Arc::clone(self);
                    let flight = async move { registrar.load_from_backend(generation).await }
                        .boxed()
                        .shared();
                    slot.state = LoadState::Loading(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    /// Fetch the tree and register it. Settles the load state for
    /// `generation` before returning.
    async fn load_from_backend(self: Arc<Self>, generation: u64) -> bool {
        tracing::info!("Loading dynamic routes");

        let entries = match self.permissions.fetch_view_tree().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to load dynamic routes: {}", e);
                self.settle(generation, false);
                return false;
            }
        };

        if entries.is_empty() {
            tracing::warn!("Permission tree is empty, no dynamic routes registered");
            self.settle(generation, false);
            return false;
        }

        let routes = materialize(&entries, &self.resolver);

        let mut slot = self.lock();
        if slot.generation != generation {
            tracing::debug!("Route load superseded by a reset, discarding {} routes", routes.len());
            return false;
        }

        let count = routes.len();
        for route in routes {
            let name = route.name.clone();
            if let Err(e) = self.router.add_route(Some(&self.layout_route), route) {
                tracing::error!("Failed to register route '{}': {}", name, e);
                slot.state = LoadState::NotLoaded;
                return false;
            }
        }

        slot.state = LoadState::Loaded;
        tracing::info!("Registered {} dynamic routes under '{}'", count, self.layout_route);
        true
    }

    fn settle(&self, generation: u64, loaded: bool) {
        let mut slot = self.lock();
        if slot.generation == generation {
            slot.state = if loaded { LoadState::Loaded } else { LoadState::NotLoaded };
        }
    }

    /// Drop every dynamic route and load the tree again from the backend
    pub async fn reload_routes(self: &Arc<Self>) -> bool {
        // Let a running load finish registering before its routes are cleared
        let pending = match &self.lock().state {
            LoadState::Loading(flight) => Some(flight.clone()),
            _ => None,
        };
        if let Some(flight) = pending {
            flight.await;
        }

        {
            let mut slot = self.lock();
            let removed = self.clear_dynamic_routes();
            slot.generation += 1;
            slot.state = LoadState::NotLoaded;
            tracing::debug!("Cleared {} dynamic routes before reload", removed);
        }

        self.ensure_routes_loaded().await
    }

    /// Forget the load state without touching registered routes
    pub fn reset_routes_loaded_state(&self) {
        let mut slot = self.lock();
        slot.generation += 1;
        slot.state = LoadState::NotLoaded;
    }

    /// Remove every layout child except the protected static ones
    pub fn clear_dynamic_routes(&self) -> usize {
        self.router
            .children_of(&self.layout_route)
            .into_iter()
            .filter(|child| !self.protected_routes.contains(&child.name))
            .filter(|child| self.router.remove_route(&child.name))
            .count()
    }

    /// Names of the currently registered dynamic routes
    pub fn dynamic_route_names(&self) -> Vec<String> {
        self.router
            .children_of(&self.layout_route)
            .into_iter()
            .map(|child| child.name)
            .filter(|name| !self.protected_routes.contains(name))
            .collect()
    }
}

/// Flatten a permission tree into route records, depth-first pre-order in
/// input order. Only menus and pages become routes; every node's children
/// are visited.
pub fn materialize(entries: &[PermissionTreeEntry], resolver: &ComponentResolver) -> Vec<RouteRecord> {
    let mut routes = Vec::new();
    let mut stack: Vec<&PermissionTreeEntry> = entries.iter().rev().collect();

    while let Some(entry) = stack.pop() {
        if entry.node.kind.is_routable() {
            routes.push(route_for(entry, resolver));
        }
        stack.extend(entry.children.iter().rev());
    }

    routes
}

fn route_for(entry: &PermissionTreeEntry, resolver: &ComponentResolver) -> RouteRecord {
    let node = &entry.node;
    let resolved = resolver.resolve(&node.component);
    if resolved.is_none() {
        tracing::warn!("No component found for route '{}' ({})", node.name, node.component);
    }

    let meta = RouteMeta {
        title: Some(node.name.clone()),
        icon: (!node.icon.is_empty()).then(|| node.icon.clone()),
        requires_auth: None,
        has_permission: Some(entry.has_permission),
        is_valid: Some(node.is_valid),
        component_source: resolved.as_ref().map(|r| r.source),
    };

    RouteRecord {
        name: node.name.clone(),
        path: node.path.clone(),
        component: resolved.map(|r| r.module_path),
        meta,
    }
}
