//! Playbook-driven database migrations.
//!
//! This crate provides:
//! - Playbook parsing and resolution of nested steps into an ordered schedule
//! - Schedule execution with an explicit continue/abort error policy
//! - `up`/`down`/`seed` action dispatch over typed change descriptors
//! - Storage backends (MySQL connection, PostgreSQL pool, DuckDB connection)
//!   behind a registry
//! - A run orchestrator that always releases its storage connection

pub mod applier;
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod playbook;
pub mod script;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use applier::ActionApplier;
pub use config::{EnvironmentConfig, MigrateConfig, Settings};
pub use error::{MigrateError, Result};
pub use executor::{ErrorPolicy, RunReport, ScheduleExecutor};
pub use orchestrator::Migrator;
pub use playbook::{resolve, Action, MigrationSchedule, Playbook, ScheduleEntry, StepNode};
pub use script::{ChangeDescriptor, DirectoryScripts, MigrationScript, ScriptRegistry, ScriptSource};
pub use storage::{QueryOutcome, Storage, StorageConfig, StorageFactory, StorageRegistry};
