use anyhow::{anyhow, Context, Result};
use log::info;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ApiPaths;

// Client settings: where the backend lives and the timing knobs of the
// synchronizer. Loaded from a JSON file, then overridden from the environment.

pub const ENV_BACKEND_URL: &str = "SKILLMATE_BACKEND_URL";
pub const ENV_PUSH_URL: &str = "SKILLMATE_PUSH_URL";
pub const ENV_USER_ID: &str = "SKILLMATE_USER_ID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend_url: String,
    pub push_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub paths: ApiPaths,
    pub debounce_ms: u64,
    pub toast_ms: u64,
    pub reconnect_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            backend_url: "http://localhost:5000".to_string(),
            push_url: "ws://localhost:5000/push".to_string(),
            user_id: None,
            paths: ApiPaths::default(),
            debounce_ms: 400,
            toast_ms: 4000,
            reconnect_ms: 2000,
            request_timeout_ms: 10_000,
        }
    }
}

impl Settings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn toast_ttl(&self) -> Duration {
        Duration::from_millis(self.toast_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Apply `SKILLMATE_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup; empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(url) = get(ENV_PUSH_URL) {
            self.push_url = url;
        }
        if let Some(id) = get(ENV_USER_ID) {
            self.user_id = Some(id);
        }
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.backend_url).with_context(|| format!("invalid backend_url '{}'", self.backend_url))?;
        url::Url::parse(&self.push_url).with_context(|| format!("invalid push_url '{}'", self.push_url))?;
        if self.debounce_ms == 0 || self.toast_ms == 0 {
            return Err(anyhow!("debounce_ms and toast_ms must be greater than zero"));
        }
        Ok(())
    }
}

static SETTINGS_PATH_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

/// Use `path` instead of the per-user settings file. Only the first call wins.
pub fn set_settings_path_override(path: PathBuf) {
    if SETTINGS_PATH_OVERRIDE.set(path).is_err() {
        log::warn!("Settings path override already set; ignoring");
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("skillmate");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

fn get_settings_path() -> Result<PathBuf> {
    if let Some(path) = SETTINGS_PATH_OVERRIDE.get() {
        return Ok(path.clone());
    }
    Ok(get_config_dir()?.join("settings.json"))
}

/// Read settings from `path`, falling back to defaults when it does not exist
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        info!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let settings: Settings =
        serde_json::from_reader(file).with_context(|| format!("failed to parse {}", path.display()))?;
    info!("Loaded settings from {}", path.display());
    Ok(settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, settings)?;
    info!("Settings saved to {}", path.display());
    Ok(())
}

/// Settings file (or defaults) with environment overrides, validated
pub fn load_settings() -> Result<Settings> {
    let mut settings = load_settings_from(&get_settings_path()?)?;
    settings.apply_env();
    settings.validate()?;
    Ok(settings)
}
