use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ConsoleConfig;
use crate::console::Console;
use crate::persistence::{FileStore, Persistence};
use crate::router::resolver::OverrideModules;

use super::utils::StdinConfirm;

const OVERRIDES_FILE: &str = "modules.yaml";

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("PULSE_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("pulse").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// File-backed stores; a terminal has no browser session, so the session
/// class also lives on disk until `pulse auth logout` clears it
pub fn open_persistence(config: &ConsoleConfig) -> anyhow::Result<Persistence> {
    let config_dir = get_config_dir()?;
    let durable = config
        .storage
        .durable_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("durable"));
    let session = config
        .storage
        .session_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("session"));

    Ok(Persistence::new(
        Arc::new(FileStore::new(durable)),
        Arc::new(FileStore::new(session)),
    ))
}

/// Project view overrides from `modules.yaml`, when present
pub fn load_overrides() -> anyhow::Result<OverrideModules> {
    let file = get_config_dir()?.join(OVERRIDES_FILE);
    if !file.exists() {
        return Ok(OverrideModules::default());
    }
    OverrideModules::from_file(&file)
}

pub fn connect_console() -> anyhow::Result<Arc<Console>> {
    let config = crate::config::config().clone();
    let persistence = open_persistence(&config)?;
    let overrides = load_overrides()?;

    let console = Console::connect(config, persistence, Arc::new(StdinConfirm), overrides)
        .map_err(|e| anyhow::anyhow!("Failed to initialize API client: {}", e))?;
    Ok(console)
}
