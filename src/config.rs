use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Size at which the log file is rotated
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Number of rotated files kept next to the active one
    #[serde(default = "default_backup_count")]
    pub backup_count: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            backup_count: default_backup_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Attempted messages between checkpoint saves (checkpoint mode only)
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_bytes() -> u64 {
    32 * 1024 * 1024
}

fn default_backup_count() -> usize {
    8
}

fn default_checkpoint_interval() -> usize {
    100
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Where the loaded configuration came from
///
/// Configuration is read before the log subscriber exists, so the source is
/// reported once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults { missing: PathBuf },
}

impl ConfigOrigin {
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => tracing::info!("Loaded configuration from {:?}", path),
            ConfigOrigin::Defaults { missing } => {
                tracing::warn!("Config file not found at {:?}, using defaults", missing)
            }
        }
    }
}

impl Config {
    pub async fn load(path: &Path) -> Result<(Self, ConfigOrigin)> {
        if !path.exists() {
            return Ok((
                Self::default(),
                ConfigOrigin::Defaults {
                    missing: path.to_path_buf(),
                },
            ));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ImportError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ImportError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        Ok((config, ConfigOrigin::File(path.to_path_buf())))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ImportError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ImportError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| ImportError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.logging.max_bytes == 0 {
            return Err(ImportError::ConfigError(
                "logging.max_bytes must be at least 1".to_string(),
            ));
        }

        if self.import.checkpoint_interval == 0 {
            return Err(ImportError::ConfigError(
                "import.checkpoint_interval must be at least 1".to_string(),
            ));
        }

        if self.api.user_agent.trim().is_empty() {
            return Err(ImportError::ConfigError(
                "api.user_agent cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Write an example configuration with every default spelled out
    pub async fn create_example(path: &Path) -> Result<()> {
        Self::default().save(path).await
    }
}
