//! Open tabs and their page cache
//!
//! Tabs are unique by path, Home is pinned at index 0 and cannot be closed.
//! Each tab owns at most one page-cache entry under the same path; closing the
//! tab evicts it, and writes for paths without an open tab are dropped.

pub mod cache;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use cache::{CacheView, ListPageCacheData, PageCache, PageInfo, TreeTableCache};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabItem {
    pub path: String,
    pub title: String,
    pub icon: String,
}

impl TabItem {
    pub fn new(path: impl Into<String>, title: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            icon: icon.into(),
        }
    }
}

/// Persisted form of the tab strip
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabsSnapshot {
    pub tabs: Vec<TabItem>,
    pub active_tab: Option<String>,
}

pub struct TabManager {
    home: TabItem,
    tabs: Vec<TabItem>,
    active_tab: Option<String>,
    cache: PageCache,
}

impl TabManager {
    pub fn new(home: TabItem) -> Self {
        Self {
            home,
            tabs: Vec::new(),
            active_tab: None,
            cache: PageCache::default(),
        }
    }

    /// Rebuild from persisted state
    pub fn restore(home: TabItem, snapshot: TabsSnapshot, cache: PageCache) -> Self {
        let mut manager = Self::new(home);
        for tab in snapshot.tabs {
            if !manager.has_tab(&tab.path) {
                manager.tabs.push(tab);
            }
        }
        manager.active_tab = snapshot.active_tab;
        manager.cache = cache;
        // Drop cache entries whose tab did not survive
        let orphaned: Vec<String> = manager
            .cache
            .paths()
            .into_iter()
            .filter(|path| !manager.has_tab(path))
            .collect();
        manager.cache.evict_many(&orphaned);
        manager
    }

    pub fn snapshot(&self) -> TabsSnapshot {
        TabsSnapshot {
            tabs: self.tabs.clone(),
            active_tab: self.active_tab.clone(),
        }
    }

    pub fn home_path(&self) -> &str {
        &self.home.path
    }

    pub fn tabs(&self) -> &[TabItem] {
        &self.tabs
    }

    pub fn active_tab(&self) -> Option<&str> {
        self.active_tab.as_deref()
    }

    pub fn has_tab(&self, path: &str) -> bool {
        self.tabs.iter().any(|tab| tab.path == path)
    }

    pub fn tab(&self, path: &str) -> Option<&TabItem> {
        self.tabs.iter().find(|tab| tab.path == path)
    }

    pub fn initialize(&mut self) {
        self.ensure_home_tab();
    }

    /// Pin Home at index 0 if it is missing
    pub fn ensure_home_tab(&mut self) {
        if !self.has_tab(&self.home.path) {
            self.tabs.insert(0, self.home.clone());
        }
    }

    /// Append unless already open (existing tabs keep their position), then activate
    pub fn add_tab(&mut self, tab: TabItem) {
        let path = tab.path.clone();
        if !self.has_tab(&path) {
            self.tabs.push(tab);
        }
        self.set_active_tab(path);
    }

    /// Close a tab and evict its cache. Returns the path that should become
    /// active when the closed tab was the active one, otherwise `None`.
    pub fn remove_tab(&mut self, path: &str) -> Option<String> {
        if path == self.home.path {
            return None;
        }

        let index = self.tabs.iter().position(|tab| tab.path == path)?;

        let next_active = if self.active_tab.as_deref() == Some(path) {
            let neighbour = if index + 1 == self.tabs.len() {
                index.checked_sub(1).and_then(|left| self.tabs.get(left))
            } else {
                self.tabs.get(index + 1)
            };
            Some(
                neighbour
                    .map(|tab| tab.path.clone())
                    .unwrap_or_else(|| self.home.path.clone()),
            )
        } else {
            None
        };

        self.tabs.remove(index);
        self.cache.evict(path);
        tracing::debug!("Closed tab {} (next active: {:?})", path, next_active);

        next_active
    }

    pub fn set_active_tab(&mut self, path: impl Into<String>) {
        self.active_tab = Some(path.into());
    }

    /// Close everything but Home and activate it
    pub fn clear_tabs(&mut self) {
        let closed: Vec<String> = self
            .tabs
            .iter()
            .filter(|tab| tab.path != self.home.path)
            .map(|tab| tab.path.clone())
            .collect();

        self.tabs.retain(|tab| tab.path == self.home.path);
        self.cache.evict_many(&closed);
        self.ensure_home_tab();
        self.active_tab = Some(self.home.path.clone());
    }

    /// Close every tab including Home; the caller re-seeds Home later
    pub fn clear_all_tabs(&mut self) {
        let closed: Vec<String> = self.tabs.drain(..).map(|tab| tab.path).collect();
        self.cache.evict_many(&closed);
        self.cache.clear();
        self.active_tab = None;
    }

    /// Replace the cached state of an open tab; no-op (false) if the tab is closed
    pub fn save_to_cache(&mut self, path: &str, data: Map<String, Value>) -> bool {
        if !self.has_tab(path) {
            return false;
        }
        self.cache.set(path, data);
        true
    }

    /// Merge into the cached state of an open tab; no-op (false) if the tab is closed
    pub fn update_cache(&mut self, path: &str, partial: Map<String, Value>) -> bool {
        if !self.has_tab(path) {
            return false;
        }
        self.cache.merge(path, partial);
        true
    }

    pub fn cached(&self, path: &str) -> Option<&Map<String, Value>> {
        self.cache.get(path)
    }

    pub fn has_cache(&self, path: &str) -> bool {
        self.cache.contains(path)
    }

    pub fn clear_cache(&mut self, path: &str) {
        self.cache.evict(path);
    }

    pub fn page_cache(&self) -> &PageCache {
        &self.cache
    }

    /// Typed access to one page's cache entry
    pub fn cache_view(&mut self, path: impl Into<String>) -> CacheView<'_> {
        CacheView::new(self, path.into())
    }
}
