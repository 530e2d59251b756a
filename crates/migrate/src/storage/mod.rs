//! Storage backends.
//!
//! A backend executes raw SQL and releases its connection when the run ends.
//! Backends are built from a [`StorageConfig`] by the factory registered for
//! its `kind`.

mod duckdb;
mod mysql;
mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MigrateError, Result};

pub use self::duckdb::{DuckdbFactory, DuckdbStorage};
pub use self::mysql::{MysqlFactory, MysqlStorage};
pub use self::postgres::{PostgresFactory, PostgresStorage};

/// Storage section of an environment's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend kind (e.g., "mysql", "postgres", "duckdb").
    #[serde(alias = "name")]
    pub kind: String,

    /// Backend-specific connection parameters.
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl StorageConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: serde_json::Map::new(),
        }
    }

    /// Set a connection parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Deserialize the connection parameters into a backend-specific struct.
    pub fn parse_params<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.params.clone())).map_err(|e| {
            MigrateError::Config(format!("Invalid {} storage parameters: {}", self.kind, e))
        })
    }
}

/// Result of a successful query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Rows affected, when the backend reports it.
    pub affected_rows: u64,
}

/// A connection (or pool) to the target database.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Backend kind name.
    fn kind(&self) -> &'static str;

    /// Execute SQL.
    ///
    /// With no values the text runs as a batch and may hold several
    /// statements. With values it runs as one statement with positional
    /// parameters.
    async fn query(&self, sql: &str, values: &[serde_json::Value]) -> Result<QueryOutcome>;

    /// Release the connection. Later queries fail.
    async fn end(&self);
}

/// Builds a backend from configuration.
#[async_trait]
pub trait StorageFactory: Send + Sync {
    /// Kind name this factory handles.
    fn kind(&self) -> &'static str;

    /// Open a connection described by `config`.
    async fn connect(&self, config: &StorageConfig) -> Result<Box<dyn Storage>>;
}

/// Registry of available storage backends.
pub struct StorageRegistry {
    factories: HashMap<String, Arc<dyn StorageFactory>>,
}

impl StorageRegistry {
    /// Create a new empty storage registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in `mysql`, `postgres` and `duckdb` backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MysqlFactory);
        registry.register(PostgresFactory);
        registry.register(DuckdbFactory);
        registry
    }

    /// Register a factory under its kind name.
    pub fn register<F: StorageFactory + 'static>(&mut self, factory: F) {
        let kind = factory.kind().to_lowercase();
        self.factories.insert(kind, Arc::new(factory));
    }

    /// Get a factory by kind, ignoring case.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn StorageFactory>> {
        self.factories.get(&kind.to_lowercase()).cloned()
    }

    /// Check if a kind is registered.
    pub fn has(&self, kind: &str) -> bool {
        self.factories.contains_key(&kind.to_lowercase())
    }

    /// List all registered kinds.
    pub fn list(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Build the backend named by `config.kind`.
    pub async fn connect(&self, config: &StorageConfig) -> Result<Box<dyn Storage>> {
        let factory = self
            .get(&config.kind)
            .ok_or_else(|| MigrateError::UnsupportedStorage(config.kind.clone()))?;

        tracing::info!(kind = factory.kind(), "Connecting to database");
        factory.connect(config).await
    }
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
