use std::{collections::HashMap, env, fs, path::PathBuf};

use super::{LocatorConfig, PartialLocatorConfig, ENV_MAX_DEPTH, ENV_STATS, ENV_TRACE};
use crate::errors::ConfigError;

/// Configuration loader responsible for loading config from a file and the environment
pub struct ConfigLoader {
    path: Option<PathBuf>,
    read_env: bool,
}

impl ConfigLoader {
    /// Create a loader that only reads environment variables
    pub fn new() -> Self {
        Self {
            path: None,
            read_env: true,
        }
    }

    /// Create a loader reading the given TOML file (a missing file is not an error)
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            read_env: true,
        }
    }

    /// Ignore environment variables (for testing)
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Load the complete locator configuration
    pub fn load_config(&self) -> Result<LocatorConfig, ConfigError> {
        let partial = match &self.path {
            Some(path) => self.load_partial_config(path)?,
            None => None,
        };

        let env_map = if self.read_env {
            self.collect_env_vars()
        } else {
            HashMap::new()
        };

        let config = LocatorConfig::from_partial_and_env(partial, &env_map)?;
        tracing::debug!(
            "Loaded locator config: max_depth={}, trace_resolutions={}, collect_stats={}",
            config.max_depth,
            config.trace_resolutions,
            config.collect_stats
        );
        Ok(config)
    }

    fn load_partial_config(&self, config_path: &PathBuf) -> Result<Option<PartialLocatorConfig>, ConfigError> {
        if !config_path.exists() {
            tracing::debug!("配置文件 {} 不存在，使用默认配置", config_path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::FileRead(config_path.to_string_lossy().to_string(), e)
        })?;

        let partial_config: PartialLocatorConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::TomlParse(config_path.to_string_lossy().to_string(), e)
        })?;

        Ok(Some(partial_config))
    }

    /// Collect relevant environment variables
    fn collect_env_vars(&self) -> HashMap<String, String> {
        let env_keys = [ENV_MAX_DEPTH, ENV_TRACE, ENV_STATS];

        let mut env_map = HashMap::new();
        for key in &env_keys {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
