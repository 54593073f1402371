use std::sync::Arc;
use std::time::Duration;

use scorebridge_core_types::{flag_str, ScorePayload, Settings};
use tracing::{debug, warn};

use crate::{KeyValueStore, StorageKeys, StoreError};

/// Typed access to the settings and last score payload.
///
/// Readers never fail: missing or malformed values fall back to defaults.
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    defaults: Settings,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: StorageKeys, defaults: Settings) -> Self {
        Self {
            store,
            keys,
            defaults,
        }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Writes a default for every absent key; existing preferences are kept.
    /// Returns the keys that were seeded.
    pub fn seed_defaults(&self) -> Vec<String> {
        let seeds = [
            (&self.keys.font_size, self.defaults.font_size_px.to_string()),
            (&self.keys.sound, flag_str(self.defaults.sound_enabled).to_string()),
            (
                &self.keys.auto_reload_enabled,
                flag_str(self.defaults.auto_reload_enabled).to_string(),
            ),
            (
                &self.keys.auto_reload_seconds,
                self.defaults.auto_reload_seconds.to_string(),
            ),
        ];

        let mut seeded = Vec::new();
        for (key, value) in seeds {
            if self.store.get(key).is_some() {
                continue;
            }
            match self.store.set(key, &value) {
                Ok(()) => seeded.push(key.clone()),
                Err(err) => warn!(%key, %err, "failed to seed default"),
            }
        }
        if !seeded.is_empty() {
            debug!(?seeded, "seeded default settings");
        }
        seeded
    }

    pub fn font_size(&self) -> u32 {
        self.store
            .get(&self.keys.font_size)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|px| *px >= 1)
            .unwrap_or(self.defaults.font_size_px)
    }

    pub fn sound_enabled(&self) -> bool {
        self.flag(&self.keys.sound)
    }

    pub fn auto_reload_enabled(&self) -> bool {
        self.flag(&self.keys.auto_reload_enabled)
    }

    /// Whole seconds of [`Self::auto_reload_interval`].
    pub fn auto_reload_seconds(&self) -> u64 {
        self.auto_reload_interval().as_secs()
    }

    /// Configured reload interval at millisecond precision; blank, malformed
    /// or negative values read as zero (disabled). Huge values saturate.
    pub fn auto_reload_interval(&self) -> Duration {
        self.store
            .get(&self.keys.auto_reload_seconds)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| Duration::from_millis((secs * 1000.0).round() as u64))
            .unwrap_or(Duration::ZERO)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            font_size_px: self.font_size(),
            sound_enabled: self.sound_enabled(),
            auto_reload_enabled: self.auto_reload_enabled(),
            auto_reload_seconds: self.auto_reload_seconds(),
        }
    }

    /// Stores the raw font-size input; blank input stores the default.
    pub fn set_font_size_raw(&self, raw: &str) -> Result<(), StoreError> {
        let trimmed = raw.trim();
        let value = if trimmed.is_empty() {
            self.defaults.font_size_px.to_string()
        } else {
            trimmed.to_string()
        };
        self.store.set(&self.keys.font_size, &value)
    }

    pub fn set_sound_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.store.set(&self.keys.sound, flag_str(enabled))
    }

    pub fn set_auto_reload_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.store
            .set(&self.keys.auto_reload_enabled, flag_str(enabled))
    }

    /// Stores the raw seconds input verbatim; blank input disables reloads.
    pub fn set_auto_reload_seconds_raw(&self, raw: &str) -> Result<(), StoreError> {
        self.store
            .set(&self.keys.auto_reload_seconds, raw.trim())
    }

    pub fn write_payload(&self, payload: &ScorePayload) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(payload).map_err(|err| StoreError::Serialize(err.to_string()))?;
        self.store.set(&self.keys.score_payload, &raw)
    }

    /// Last broadcast payload; its timestamp may be arbitrarily old.
    pub fn last_payload(&self) -> Option<ScorePayload> {
        self.store
            .get(&self.keys.score_payload)
            .and_then(|raw| parse_payload(&raw))
    }

    fn flag(&self, key: &str) -> bool {
        self.store.get(key).as_deref() == Some("1")
    }
}

/// Lenient payload parser for values read back from storage.
pub fn parse_payload(raw: &str) -> Option<ScorePayload> {
    match serde_json::from_str(raw) {
        Ok(payload) => Some(payload),
        Err(err) => {
            debug!(%err, "ignoring malformed score payload");
            None
        }
    }
}
