use serde::{Deserialize, Serialize};

/// Names of the persisted keys. Defaults keep compatibility with values
/// already stored by earlier releases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub font_size: String,
    pub sound: String,
    pub score_payload: String,
    pub auto_reload_enabled: String,
    /// Holds seconds despite the historical key name.
    pub auto_reload_seconds: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            font_size: "faceitScoreFontSize".into(),
            sound: "faceitScoreSound".into(),
            score_payload: "faceitScorePayload".into(),
            auto_reload_enabled: "faceitScoreAutoReloadEnabled".into(),
            auto_reload_seconds: "faceitScoreAutoReloadMs".into(),
        }
    }
}

impl StorageKeys {
    pub fn settings_keys(&self) -> [&str; 4] {
        [
            &self.font_size,
            &self.sound,
            &self.auto_reload_enabled,
            &self.auto_reload_seconds,
        ]
    }

    pub fn is_settings_key(&self, key: &str) -> bool {
        self.settings_keys().contains(&key)
    }

    pub fn is_auto_reload_key(&self, key: &str) -> bool {
        key == self.auto_reload_enabled || key == self.auto_reload_seconds
    }
}
