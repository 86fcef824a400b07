//! Component path resolution: an ordered chain of strategies, first hit wins

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Where a resolved component came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentSource {
    /// Project override module
    Current,
    /// Base project convention
    Base,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedComponent {
    pub module_path: String,
    pub source: ComponentSource,
}

/// One resolution strategy: `component id -> module`, or nothing
pub trait ResolveComponent: Send + Sync {
    fn resolve(&self, component: &str) -> Option<ResolvedComponent>;
}

impl<F> ResolveComponent for F
where
    F: Fn(&str) -> Option<ResolvedComponent> + Send + Sync,
{
    fn resolve(&self, component: &str) -> Option<ResolvedComponent> {
        self(component)
    }
}

/// Project-specific modules that shadow the base views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideModules {
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    ".vue".to_string()
}

impl Default for OverrideModules {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl OverrideModules {
    pub fn new(modules: Vec<String>) -> Self {
        Self {
            modules,
            extension: default_extension(),
        }
    }

    /// Parse a module manifest:
    ///
    /// ```yaml
    /// extension: .vue
    /// modules:
    ///   - /src/project/views/system/User.vue
    /// ```
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }
}

impl ResolveComponent for OverrideModules {
    fn resolve(&self, component: &str) -> Option<ResolvedComponent> {
        let suffix = format!("{}{}", component, self.extension);
        self.modules
            .iter()
            .find(|module| module.ends_with(&suffix))
            .map(|module| ResolvedComponent {
                module_path: module.clone(),
                source: ComponentSource::Current,
            })
    }
}

/// `<prefix><component><extension>`, e.g. `/src/views/system/User.vue`
#[derive(Debug, Clone)]
pub struct ConventionPath {
    pub prefix: String,
    pub extension: String,
}

impl ResolveComponent for ConventionPath {
    fn resolve(&self, component: &str) -> Option<ResolvedComponent> {
        Some(ResolvedComponent {
            module_path: format!("{}{}{}", self.prefix, component, self.extension),
            source: ComponentSource::Base,
        })
    }
}

/// Ordered strategy chain
#[derive(Default)]
pub struct ComponentResolver {
    strategies: Vec<Box<dyn ResolveComponent>>,
}

impl ComponentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides first, then the naming convention
    pub fn standard(overrides: OverrideModules, prefix: &str, extension: &str) -> Self {
        Self::new()
            .with_strategy(overrides)
            .with_strategy(ConventionPath {
                prefix: prefix.to_string(),
                extension: extension.to_string(),
            })
    }

    pub fn with_strategy(mut self, strategy: impl ResolveComponent + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn resolve(&self, component: &str) -> Option<ResolvedComponent> {
        self.strategies.iter().find_map(|s| s.resolve(component))
    }
}
