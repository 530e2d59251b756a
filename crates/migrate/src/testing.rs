//! Test doubles shared by unit tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{MigrateError, Result};
use crate::script::{ChangeDescriptor, MigrationScript};
use crate::storage::{QueryOutcome, Storage, StorageConfig, StorageFactory};

/// One recorded call to [`Storage::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub values: Vec<serde_json::Value>,
}

#[derive(Debug, Default)]
struct State {
    queries: Vec<RecordedQuery>,
    fail_on: Vec<String>,
    panic_on: Vec<String>,
    end_calls: usize,
}

/// Storage that records queries instead of running them.
///
/// Clones share state, so a test can keep a handle while the run owns the
/// boxed backend.
#[derive(Debug, Clone, Default)]
pub struct RecordingStorage {
    state: Arc<Mutex<State>>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every query whose SQL contains `fragment`.
    pub fn fail_on(self, fragment: &str) -> Self {
        self.state.lock().unwrap().fail_on.push(fragment.to_string());
        self
    }

    /// Panic on every query whose SQL contains `fragment`.
    pub fn panic_on(self, fragment: &str) -> Self {
        self.state.lock().unwrap().panic_on.push(fragment.to_string());
        self
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn end_calls(&self) -> usize {
        self.state.lock().unwrap().end_calls
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    fn kind(&self) -> &'static str {
        "recording"
    }

    async fn query(&self, sql: &str, values: &[serde_json::Value]) -> Result<QueryOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.panic_on.iter().any(|f| sql.contains(f.as_str())) {
            // release the lock so the state stays readable after unwinding
            drop(state);
            panic!("storage panicked on: {}", sql);
        }
        if state.end_calls > 0 {
            return Err(MigrateError::Backend("connection closed".to_string()));
        }
        if let Some(fragment) = state.fail_on.iter().find(|f| sql.contains(f.as_str())) {
            return Err(MigrateError::Backend(format!("rejected: {}", fragment)));
        }
        state.queries.push(RecordedQuery {
            sql: sql.to_string(),
            values: values.to_vec(),
        });
        Ok(QueryOutcome { affected_rows: 1 })
    }

    async fn end(&self) {
        self.state.lock().unwrap().end_calls += 1;
    }
}

/// Factory handing out clones of one [`RecordingStorage`].
pub struct RecordingFactory {
    storage: RecordingStorage,
}

impl RecordingFactory {
    pub fn new(storage: RecordingStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl StorageFactory for RecordingFactory {
    fn kind(&self) -> &'static str {
        "recording"
    }

    async fn connect(&self, _config: &StorageConfig) -> Result<Box<dyn Storage>> {
        Ok(Box::new(self.storage.clone()))
    }
}

/// Script built from fixed change descriptors.
#[derive(Debug, Clone, Default)]
pub struct StaticScript {
    pub up: Option<ChangeDescriptor>,
    pub down: Option<ChangeDescriptor>,
    pub seed: Option<ChangeDescriptor>,
}

impl StaticScript {
    pub fn with_up(sql: &str) -> Self {
        Self {
            up: Some(ChangeDescriptor::new("up", sql)),
            ..Self::default()
        }
    }
}

impl MigrationScript for StaticScript {
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

/// Build a seed row from `(column, value)` pairs.
pub fn row(fields: &[(&str, serde_json::Value)]) -> crate::script::SeedRow {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
