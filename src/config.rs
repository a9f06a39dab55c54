// Store directory configuration

use crate::filter::Filter;
use crate::store::DEFAULT_STORAGE_KEY;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "config.yaml";

/// Settings read from `config.yaml` in the store directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key the task collection is stored under
    pub storage_key: String,
    /// Bucket new tasks go to when none is given
    pub default_filter: Filter,
    /// Where exports are written; current directory when unset
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_filter: Filter::default(),
            export_dir: None,
        }
    }
}

impl Config {
    /// Read `config.yaml` from `store_dir`, falling back to defaults if absent
    pub fn load(store_dir: &Path) -> Result<Self> {
        let path = store_dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

        debug!(path = %path.display(), ?config, "Loaded config");
        Ok(config)
    }
}

/// Platform data directory for the store, e.g. `~/.local/share/momentum`
pub fn default_store_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join("momentum"))
        .ok_or_else(|| eyre!("Could not determine a data directory; pass --store-path"))
}
