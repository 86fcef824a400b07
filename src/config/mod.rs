use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub routes: RouteConfig,
    pub tabs: TabConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub login_path: String,
    pub root_path: String,
    pub home_path: String,
    pub forbidden_path: String,
    pub not_found_path: String,
    pub unavailable_path: String,
    /// Name of the layout route that owns every dynamic route
    pub layout_route: String,
    /// Layout children that survive a dynamic route clear
    pub protected_routes: Vec<String>,
    pub views_prefix: String,
    pub views_extension: String,
    /// Materialize routes during login (true) or on the first unmatched navigation (false)
    pub eager_route_loading: bool,
    pub max_redirects: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabConfig {
    pub home_title: String,
    pub home_icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub durable_dir: Option<PathBuf>,
    pub session_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub confirm_logout: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            root_path: "/".to_string(),
            home_path: "/home".to_string(),
            forbidden_path: "/403".to_string(),
            not_found_path: "/404".to_string(),
            unavailable_path: "/503".to_string(),
            layout_route: "MainLayout".to_string(),
            protected_routes: vec!["Home".to_string()],
            views_prefix: "/src/views".to_string(),
            views_extension: ".vue".to_string(),
            eager_route_loading: true,
            max_redirects: 8,
        }
    }
}

impl Default for TabConfig {
    fn default() -> Self {
        Self {
            home_title: "Dashboard".to_string(),
            home_icon: "HomeFilled".to_string(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("PULSE_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("PULSE_API_BASE_URL") {
            self.api.base_url = v;
        }
        if let Ok(v) = env::var("PULSE_API_TIMEOUT_SECS") {
            self.api.timeout_secs = v.parse().unwrap_or(self.api.timeout_secs);
        }

        // Route overrides
        if let Ok(v) = env::var("PULSE_HOME_PATH") {
            self.routes.home_path = v;
        }
        if let Ok(v) = env::var("PULSE_LAYOUT_ROUTE") {
            self.routes.layout_route = v;
        }
        if let Ok(v) = env::var("PULSE_PROTECTED_ROUTES") {
            self.routes.protected_routes = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("PULSE_VIEWS_PREFIX") {
            self.routes.views_prefix = v;
        }
        if let Ok(v) = env::var("PULSE_EAGER_ROUTE_LOADING") {
            self.routes.eager_route_loading = v.parse().unwrap_or(self.routes.eager_route_loading);
        }
        if let Ok(v) = env::var("PULSE_MAX_REDIRECTS") {
            self.routes.max_redirects = v.parse().unwrap_or(self.routes.max_redirects);
        }

        // Tab overrides
        if let Ok(v) = env::var("PULSE_HOME_TITLE") {
            self.tabs.home_title = v;
        }

        // Storage overrides
        if let Ok(v) = env::var("PULSE_DURABLE_DIR") {
            self.storage.durable_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("PULSE_SESSION_DIR") {
            self.storage.session_dir = Some(PathBuf::from(v));
        }

        // Session overrides
        if let Ok(v) = env::var("PULSE_CONFIRM_LOGOUT") {
            self.session.confirm_logout = v.parse().unwrap_or(self.session.confirm_logout);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:8080/api/".to_string(),
                timeout_secs: 10,
            },
            routes: RouteConfig::default(),
            tabs: TabConfig::default(),
            storage: StorageConfig {
                durable_dir: None,
                session_dir: None,
            },
            session: SessionConfig {
                confirm_logout: false,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging.example.com/api/".to_string(),
                timeout_secs: 10,
            },
            session: SessionConfig {
                confirm_logout: true,
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://app.example.com/api/".to_string(),
                timeout_secs: 10,
            },
            routes: RouteConfig {
                max_redirects: 4,
                ..RouteConfig::default()
            },
            session: SessionConfig {
                confirm_logout: true,
            },
            ..Self::development()
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<ConsoleConfig> = Lazy::new(ConsoleConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static ConsoleConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
