//! Application configuration persisted as TOML.

use std::path::{Path, PathBuf};

use litfuse_core::AggregatorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Where offline fixture records come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Directory holding one `<source>.json` file per provider.
    pub dir: Option<PathBuf>,
}

/// Top-level configuration for the `litfuse` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Result count used when the command line does not give one.
    pub default_target_count: usize,
    pub fixtures: FixtureConfig,
    pub aggregator: AggregatorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_target_count: 10,
            fixtures: FixtureConfig::default(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render the configuration as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Check the application and aggregator settings.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when `default_target_count` is zero and
    /// [`AppError::Aggregate`] when the aggregator settings are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.default_target_count == 0 {
            return Err(AppError::Config("default_target_count must be greater than 0".into()));
        }
        self.aggregator.validate()?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/litfuse/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("litfuse").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("litfuse")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/litfuse-config/config.toml")
        }
    }
}
