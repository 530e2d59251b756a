//! Run orchestration.
//!
//! One run: look up the environment, connect storage, load and resolve the
//! playbook, execute the schedule, release storage. Storage is released on
//! every path once it has been connected, including a panic while executing.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use crate::config::{MigrateConfig, Settings};
use crate::error::Result;
use crate::executor::{ErrorPolicy, RunReport, ScheduleExecutor};
use crate::playbook::{load_playbook, resolve, MigrationSchedule};
use crate::script::DirectoryScripts;
use crate::storage::{Storage, StorageRegistry};

const PLAYBOOK_FILE: &str = "playbook.yml";
const SCRIPTS_DIR: &str = "scripts";

/// Entry point for migration runs.
#[derive(Debug)]
pub struct Migrator {
    config: MigrateConfig,
    playbooks: PathBuf,
    storages: StorageRegistry,
}

impl Migrator {
    pub fn new(config: MigrateConfig, playbooks: impl Into<PathBuf>) -> Self {
        Self {
            config,
            playbooks: playbooks.into(),
            storages: StorageRegistry::with_defaults(),
        }
    }

    /// Load the config file named by `settings`.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let config = MigrateConfig::load(&settings.config).await?;
        Ok(Self::new(config, settings.playbooks.clone()))
    }

    /// Replace the storage registry.
    pub fn with_storages(mut self, storages: StorageRegistry) -> Self {
        self.storages = storages;
        self
    }

    pub fn config(&self) -> &MigrateConfig {
        &self.config
    }

    /// Directory holding `playbook.yml` and `scripts/` for `playbook`.
    pub fn playbook_dir(&self, playbook: &str) -> PathBuf {
        self.playbooks.join(playbook)
    }

    /// Resolve `step` of `playbook` without touching storage.
    pub async fn plan(&self, playbook: &str, step: &str) -> Result<MigrationSchedule> {
        let playbook_dir = self.playbook_dir(playbook);
        let definitions = load_playbook(&playbook_dir.join(PLAYBOOK_FILE)).await?;
        resolve(&definitions, step)
    }

    /// Run `step` of `playbook` against environment `env`.
    pub async fn run(&self, env: &str, playbook: &str, step: &str) -> Result<RunReport> {
        tracing::info!(env, playbook, step, "About to run migration");

        let env_config = self.config.environment(env)?;
        tracing::info!(kind = %env_config.storage.kind, on_error = ?env_config.on_error, "Environment configuration loaded");

        let storage = self.storages.connect(&env_config.storage).await?;

        let outcome = AssertUnwindSafe(self.execute(
            storage.as_ref(),
            playbook,
            step,
            env_config.on_error,
        ))
        .catch_unwind()
        .await;

        tracing::info!("Terminating database connection");
        storage.end().await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(panic) => {
                tracing::error!("Run panicked after storage was connected");
                std::panic::resume_unwind(panic)
            }
        };

        match &outcome {
            Ok(report) => tracing::info!(errors = report.errors, aborted = report.aborted, "Run finished"),
            Err(e) => tracing::error!(error = %e, "Run failed"),
        }
        outcome
    }

    async fn execute(
        &self,
        storage: &dyn Storage,
        playbook: &str,
        step: &str,
        policy: ErrorPolicy,
    ) -> Result<RunReport> {
        let schedule = self.plan(playbook, step).await?;
        tracing::info!(entries = schedule.len(), "Migration schedule resolved");

        let scripts = DirectoryScripts::new(scripts_dir(&self.playbook_dir(playbook)));
        ScheduleExecutor::new(storage, &scripts)
            .with_policy(policy)
            .run(&schedule)
            .await
    }
}

fn scripts_dir(playbook_dir: &Path) -> PathBuf {
    playbook_dir.join(SCRIPTS_DIR)
}
