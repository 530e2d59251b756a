//! In-process script registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MigrateError, Result};
use crate::script::{MigrationScript, ScriptSource};

/// Scripts compiled into the binary, keyed by identifier.
pub struct ScriptRegistry {
    scripts: HashMap<String, Arc<dyn MigrationScript>>,
}

impl ScriptRegistry {
    /// Create a new empty script registry.
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
        }
    }

    /// Register a script under `name`, replacing any previous one.
    pub fn register<S: MigrationScript + 'static>(&mut self, name: impl Into<String>, script: S) {
        self.scripts.insert(name.into(), Arc::new(script));
    }

    /// Get a script by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn MigrationScript>> {
        self.scripts.get(name).cloned()
    }

    /// Check if a script is registered.
    pub fn has(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    /// List all registered script names.
    pub fn list(&self) -> Vec<&str> {
        self.scripts.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ScriptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRegistry")
            .field("scripts", &self.scripts.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl ScriptSource for ScriptRegistry {
    async fn exists(&self, script: &str) -> Result<bool> {
        Ok(self.has(script))
    }

    async fn load(&self, script: &str) -> Result<Arc<dyn MigrationScript>> {
        self.get(script).ok_or_else(|| MigrateError::ScriptLoad {
            script: script.to_string(),
            reason: "not registered".to_string(),
        })
    }
}
