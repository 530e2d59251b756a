//! Configuration.
//!
//! Two layers:
//! - [`Settings`]: where to find the config file and playbooks, from
//!   `MIGRATE_*` environment variables.
//! - [`MigrateConfig`]: the YAML config file, holding per-environment
//!   storage settings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{MigrateError, Result};
use crate::executor::ErrorPolicy;
use crate::storage::StorageConfig;

/// Config version consulted when resolving environments.
pub const LATEST_VERSION: &str = "latest";

/// Locations loaded from environment variables.
///
/// Environment variables are prefixed with `MIGRATE_`:
/// - `MIGRATE_CONFIG`: Config file path (default: "config.yml")
/// - `MIGRATE_PLAYBOOKS`: Playbooks directory (default: "playbooks")
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_config_path")]
    pub config: PathBuf,

    #[serde(default = "default_playbooks_dir")]
    pub playbooks: PathBuf,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("config.yml")
}

fn default_playbooks_dir() -> PathBuf {
    PathBuf::from("playbooks")
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> std::result::Result<Self, envy::Error> {
        envy::prefixed("MIGRATE_").from_env::<Settings>()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config: default_config_path(),
            playbooks: default_playbooks_dir(),
        }
    }
}

/// Settings for one target environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Backend to connect to.
    pub storage: StorageConfig,

    /// Whether a failed action stops the run.
    #[serde(default)]
    pub on_error: ErrorPolicy,
}

/// Parsed config file.
///
/// ```yaml
/// versions:
///   latest:
///     dev:
///       storage:
///         kind: postgres
///         host: localhost
///         dbname: app_dev
///         user: app
///       on_error: continue
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrateConfig {
    #[serde(default)]
    pub versions: HashMap<String, HashMap<String, EnvironmentConfig>>,
}

impl MigrateConfig {
    /// Parse a YAML config document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| MigrateError::Config(format!("Invalid config file: {}", e)))
    }

    /// Read and parse a config file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            MigrateError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Settings for `env` under the latest config version.
    pub fn environment(&self, env: &str) -> Result<&EnvironmentConfig> {
        self.versions
            .get(LATEST_VERSION)
            .and_then(|envs| envs.get(env))
            .ok_or_else(|| {
                MigrateError::Config(format!("No settings exist for environment '{}'", env))
            })
    }

    /// Environment names under the latest config version, sorted.
    pub fn environments(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .versions
            .get(LATEST_VERSION)
            .map(|envs| envs.keys().map(|s| s.as_str()).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }
}
