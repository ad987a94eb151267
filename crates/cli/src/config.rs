//! Configuration file discovery and loading
//!
//! Lookup order: `--config PATH`, `./settle.toml`, then
//! `<config dir>/settle/config.toml`. Missing files fall back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use settle_core::DebounceConfig;
use settle_watcher::WatchConfig;
use std::path::{Path, PathBuf};

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = "settle.toml";

/// Full configuration for the `settle` binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleConfig {
    /// Debounce timing shared by all commands
    #[serde(default)]
    pub debounce: DebounceConfig,

    /// Settings for `settle watch`
    #[serde(default)]
    pub watch: WatchConfig,
}

impl SettleConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Invalid settle configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("In {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        self.debounce.validate()?;
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// User-wide config file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("settle").join("config.toml"))
}

/// Pick the config file to use, if any
///
/// An explicit path is returned even if it does not exist, so the caller
/// reports it instead of silently using defaults.
pub fn resolve_config_path(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    config_file_path().filter(|path| path.is_file())
}

/// Load the effective configuration and the file it came from
pub fn load(explicit: Option<&Path>) -> Result<(SettleConfig, Option<PathBuf>)> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    match resolve_config_path(explicit, &cwd) {
        Some(path) => {
            let config = SettleConfig::load_from(&path)?;
            Ok((config, Some(path)))
        }
        None => Ok((SettleConfig::default(), None)),
    }
}
