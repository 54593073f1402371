//! Application configuration
//!
//! Loaded from YAML; every section falls back to its defaults when absent.

use std::path::PathBuf;
use std::time::Duration;

use scorebridge_core_types::Settings;
use scorebridge_display_surface::SurfaceConfig;
use scorebridge_scheduler::SchedulerConfig;
use scorebridge_selector::SelectorStrategy;
use scorebridge_state_store::StorageKeys;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ENV_STORAGE_PATH: &str = "SCOREBRIDGE_STORAGE_PATH";
pub const ENV_UPDATE_INTERVAL_MS: &str = "SCOREBRIDGE_UPDATE_INTERVAL_MS";
pub const ENV_CHANNEL_DISABLED: &str = "SCOREBRIDGE_CHANNEL_DISABLED";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub selectors: SelectorStrategy,
    pub storage: StorageConfig,
    /// Seeds written for absent settings keys.
    pub defaults: Settings,
    pub scheduler: SchedulerConfig,
    pub surface: SurfaceConfig,
    pub channel: ChannelConfig,
    pub sound: SoundConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the origin store; defaults under the data directory.
    pub path: Option<PathBuf>,
    pub keys: StorageKeys,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            dirs::data_dir().map(|mut dir| {
                dir.push("scorebridge");
                dir.push("storage.json");
                dir
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub name: String,
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "faceit-score".into(),
            enabled: true,
            capacity: 64,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Notification clip; no clip means silent notifications.
    pub clip: Option<PathBuf>,
}

impl BridgeConfig {
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_STORAGE_PATH).filter(|p| !p.trim().is_empty()) {
            self.storage.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_UPDATE_INTERVAL_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.scheduler.update_interval = Duration::from_millis(ms),
                _ => warn!(value = %raw, "ignoring invalid {ENV_UPDATE_INTERVAL_MS}"),
            }
        }
        if let Some(raw) = lookup(ENV_CHANNEL_DISABLED) {
            if matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                self.channel.enabled = false;
            }
        }
    }
}
