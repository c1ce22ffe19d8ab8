use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{Config, ConfigError};

/// Overrides the base directory that holds `config/config.json`.
pub const HOME_ENV_VAR: &str = "CASHBOOK_HOME";

/// Reads and writes the [`Config`] file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        let config_dir = base.join("config");
        fs::create_dir_all(&config_dir)?;
        Ok(Self::new(config_dir.join("config.json")))
    }

    /// Uses `$CASHBOOK_HOME` when set, else `~/Documents/Cashbook`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::with_base_dir(base_dir())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Defaults when no file has been written yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.config_path)?;
        let config: Config =
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates, then writes through a sibling temp file and renames it over
    /// the old one.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(config).map_err(|err| ConfigError::Serde(err.to_string()))?;
        let tmp = self.config_path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.config_path)?;
        Ok(())
    }
}

/// Base directory for configuration and, by default, data.
pub fn base_dir() -> PathBuf {
    match env::var_os(HOME_ENV_VAR) {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => Config::default().resolve_data_root(),
    }
}
