//! Scripts stored as YAML files in a playbook's `scripts/` directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{MigrateError, Result};
use crate::script::{ChangeDescriptor, MigrationScript, ScriptSource};

const SCRIPT_EXTENSION: &str = "yml";

/// Contents of one script file.
///
/// ```yaml
/// up:
///   description: Create the users table
///   sql: CREATE TABLE users (id SERIAL PRIMARY KEY, email TEXT NOT NULL)
/// down:
///   description: Drop the users table
///   sql: DROP TABLE IF EXISTS users
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<ChangeDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<ChangeDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<ChangeDescriptor>,
}

impl MigrationScript for ScriptDocument {
    fn up(&self) -> Option<ChangeDescriptor> {
        self.up.clone()
    }

    fn down(&self) -> Option<ChangeDescriptor> {
        self.down.clone()
    }

    fn seed(&self) -> Option<ChangeDescriptor> {
        self.seed.clone()
    }
}

/// Script source backed by `<dir>/<script>.yml` files.
#[derive(Debug, Clone)]
pub struct DirectoryScripts {
    dir: PathBuf,
}

impl DirectoryScripts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `script`.
    pub fn path_for(&self, script: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", script, SCRIPT_EXTENSION))
    }
}

#[async_trait]
impl ScriptSource for DirectoryScripts {
    fn location(&self, script: &str) -> String {
        self.path_for(script).display().to_string()
    }

    async fn exists(&self, script: &str) -> Result<bool> {
        let path = self.path_for(script);
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn load(&self, script: &str) -> Result<Arc<dyn MigrationScript>> {
        let path = self.path_for(script);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| MigrateError::ScriptLoad {
                script: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let document: ScriptDocument =
            serde_yaml::from_str(&content).map_err(|e| MigrateError::ScriptLoad {
                script: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(Arc::new(document))
    }
}
