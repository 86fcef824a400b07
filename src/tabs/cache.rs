use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::TabManager;

/// Per-tab page state, keyed by the tab's path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCache {
    entries: BTreeMap<String, Map<String, Value>>,
}

impl PageCache {
    pub fn get(&self, path: &str) -> Option<&Map<String, Value>> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub(crate) fn set(&mut self, path: &str, data: Map<String, Value>) {
        self.entries.insert(path.to_string(), data);
    }

    /// Shallow merge: top-level keys in `partial` replace existing ones
    pub(crate) fn merge(&mut self, path: &str, partial: Map<String, Value>) {
        let entry = self.entries.entry(path.to_string()).or_default();
        for (key, value) in partial {
            entry.insert(key, value);
        }
    }

    pub(crate) fn evict(&mut self, path: &str) {
        self.entries.remove(path);
    }

    pub(crate) fn evict_many(&mut self, paths: &[String]) {
        for path in paths {
            self.entries.remove(path);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

impl Default for PageInfo {
    fn default() -> Self {
        Self {
            page: 1,
            size: 10,
            total: 0,
        }
    }
}

/// Shape kept by list pages: the search form plus pagination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPageCacheData {
    #[serde(default)]
    pub search_form: Map<String, Value>,
    #[serde(default)]
    pub page_info: PageInfo,
}

/// Shape kept by tree-table pages: which rows are expanded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeTableCache {
    #[serde(default)]
    pub expanded_keys: Vec<i64>,
}

/// Typed window onto one page's cache entry
pub struct CacheView<'a> {
    tabs: &'a mut TabManager,
    path: String,
}

impl<'a> CacheView<'a> {
    pub(crate) fn new(tabs: &'a mut TabManager, path: String) -> Self {
        Self { tabs, path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decode the cached state; `None` when absent or of a different shape
    pub fn load<T: DeserializeOwned>(&self) -> Option<T> {
        let cached = self.tabs.cached(&self.path)?;
        match serde_json::from_value(Value::Object(cached.clone())) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Ignoring cache for {}: {}", self.path, e);
                None
            }
        }
    }

    /// Replace the cached state; false if the tab is closed or `value` is not an object
    pub fn save<T: Serialize>(&mut self, value: &T) -> bool {
        match to_object(value) {
            Some(map) => self.tabs.save_to_cache(&self.path, map),
            None => false,
        }
    }

    /// Merge top-level fields into the cached state
    pub fn update<T: Serialize>(&mut self, partial: &T) -> bool {
        match to_object(partial) {
            Some(map) => self.tabs.update_cache(&self.path, map),
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.tabs.clear_cache(&self.path);
    }

    pub fn expanded_keys(&self) -> Vec<i64> {
        self.load::<TreeTableCache>()
            .map(|cache| cache.expanded_keys)
            .unwrap_or_default()
    }

    pub fn set_expanded_keys(&mut self, keys: Vec<i64>) -> bool {
        self.update(&TreeTableCache { expanded_keys: keys })
    }
}

fn to_object<T: Serialize>(value: &T) -> Option<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Failed to serialize page cache: {}", e);
            None
        }
    }
}
