use std::path::{Path, PathBuf};

use crate::config::BridgeConfig;

pub struct CliContext {
    config: BridgeConfig,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: BridgeConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
