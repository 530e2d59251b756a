//! Migration scripts and the sources that provide them.
//!
//! A script exposes up to three actions (`up`, `down`, `seed`), each
//! producing a [`ChangeDescriptor`]. Scripts come from a [`ScriptSource`]:
//! either YAML files in a playbook directory or an in-process registry.

mod directory;
mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::playbook::Action;

pub use directory::{DirectoryScripts, ScriptDocument};
pub use registry::ScriptRegistry;

/// A row of seed data, keyed by column name.
pub type SeedRow = serde_json::Map<String, serde_json::Value>;

/// SQL plus metadata produced by one action of a script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeDescriptor {
    /// What the change does.
    #[serde(default)]
    pub description: String,

    /// Statement(s) to execute. Required when applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,

    /// Seed rows, executed one at a time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<SeedRow>>,

    /// Column order used to project each seed row into positional values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

impl ChangeDescriptor {
    pub fn new(description: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            sql: Some(sql.into()),
            data: None,
            columns: None,
        }
    }

    /// Attach seed rows and their column order.
    pub fn with_rows(mut self, columns: Vec<String>, data: Vec<SeedRow>) -> Self {
        self.columns = Some(columns);
        self.data = Some(data);
        self
    }
}

/// A loaded migration script.
///
/// Actions a script does not support return `None`.
pub trait MigrationScript: Send + Sync {
    fn up(&self) -> Option<ChangeDescriptor> {
        None
    }

    fn down(&self) -> Option<ChangeDescriptor> {
        None
    }

    fn seed(&self) -> Option<ChangeDescriptor> {
        None
    }

    /// Dispatch to the method for `action`.
    fn change(&self, action: Action) -> Option<ChangeDescriptor> {
        match action {
            Action::Up => self.up(),
            Action::Down => self.down(),
            Action::Seed => self.seed(),
        }
    }
}

/// Where scripts named by a schedule are found.
#[async_trait]
pub trait ScriptSource: Send + Sync {
    /// Human-readable location of a script (e.g. its file path).
    fn location(&self, script: &str) -> String {
        script.to_string()
    }

    /// Check whether a script exists.
    async fn exists(&self, script: &str) -> Result<bool>;

    /// Load a script.
    async fn load(&self, script: &str) -> Result<Arc<dyn MigrationScript>>;
}
