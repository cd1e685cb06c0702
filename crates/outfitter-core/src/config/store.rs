//! Config store for locating and loading outfitter.json.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{CONFIG_FILE_NAME, schema::RunConfig};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Locate the config file: working directory first, then the user
    /// config directory.
    pub fn discover() -> anyhow::Result<Self> {
        let local = std::env::current_dir()?.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(Self { config_path: local });
        }
        let global_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("outfitter");
        Ok(Self {
            config_path: global_dir.join(CONFIG_FILE_NAME),
        })
    }

    pub fn from_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file layer. A missing file is an empty config, not an error.
    pub fn load(&self) -> anyhow::Result<RunConfig> {
        if !self.config_path.exists() {
            return Ok(RunConfig::default());
        }
        let content = std::fs::read_to_string(&self.config_path).with_context(|| {
            format!(
                "Failed to read config file: {}",
                self.config_path.display()
            )
        })?;
        serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse config file: {}",
                self.config_path.display()
            )
        })
    }
}
