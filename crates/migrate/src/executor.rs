//! Schedule execution.

use serde::{Deserialize, Serialize};

use crate::applier::ActionApplier;
use crate::error::{MigrateError, Result};
use crate::playbook::{Action, MigrationSchedule, ScheduleEntry};
use crate::script::ScriptSource;
use crate::storage::Storage;

const HR: &str = "----------------------------------------------------------------";

/// What to do when an action fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log and count the failure, then carry on with the next action.
    #[default]
    Continue,
    /// Stop at the first failure.
    Abort,
}

/// Summary of one executed schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schedule entries started.
    pub entries: usize,
    /// Actions that completed without error.
    pub applied: usize,
    /// Failed actions plus failed seed rows.
    pub errors: usize,
    /// True when the abort policy stopped the run early.
    pub aborted: bool,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && !self.aborted
    }
}

/// Runs a schedule against a backend, in order, one action at a time.
pub struct ScheduleExecutor<'a> {
    storage: &'a dyn Storage,
    scripts: &'a dyn ScriptSource,
    policy: ErrorPolicy,
}

impl<'a> ScheduleExecutor<'a> {
    pub fn new(storage: &'a dyn Storage, scripts: &'a dyn ScriptSource) -> Self {
        Self {
            storage,
            scripts,
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Execute `schedule`.
    ///
    /// Fails without running anything if a script is missing. Otherwise
    /// returns a report whose `errors` counts every failure encountered.
    pub async fn run(&self, schedule: &MigrationSchedule) -> Result<RunReport> {
        self.check_scripts(schedule).await?;

        let applier = ActionApplier::new(self.storage);
        let mut report = RunReport::default();

        for entry in schedule {
            tracing::info!("{}", HR);
            tracing::info!(script = %self.scripts.location(&entry.script), actions = ?entry.actions, "Running script");
            report.entries += 1;

            if let Err(e) = self.run_entry(&applier, entry, &mut report).await {
                report.errors += e.failure_count();
                tracing::error!(script = %entry.script, error = %e, "Script failed");
            }

            if report.errors > 0 && self.policy == ErrorPolicy::Abort {
                tracing::warn!(script = %entry.script, "Aborting run after failure");
                report.aborted = true;
                break;
            }
        }

        tracing::info!(
            entries = report.entries,
            applied = report.applied,
            errors = report.errors,
            "Migration complete"
        );
        Ok(report)
    }

    /// Returns the script-level failure, if any. Action failures are counted
    /// into `report` directly.
    async fn run_entry(
        &self,
        applier: &ActionApplier<'_>,
        entry: &ScheduleEntry,
        report: &mut RunReport,
    ) -> Result<()> {
        let script = self.scripts.load(&entry.script).await?;

        for &action in &entry.actions {
            let outcome = match script.change(action) {
                Some(change) => applier.apply(action, &change).await,
                None => Err(missing_action(&entry.script, action)),
            };

            match outcome {
                Ok(_) => report.applied += 1,
                Err(e) => {
                    report.errors += e.failure_count();
                    tracing::error!(script = %entry.script, action = %action, error = %e, "Error with action");
                    if self.policy == ErrorPolicy::Abort {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Check every script up front. A failed check counts as missing.
    async fn check_scripts(&self, schedule: &MigrationSchedule) -> Result<()> {
        let mut missing: Vec<String> = Vec::new();

        for entry in schedule {
            let found = match self.scripts.exists(&entry.script).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(script = %entry.script, error = %e, "Could not check script");
                    false
                }
            };

            let location = self.scripts.location(&entry.script);
            if !found && !missing.contains(&location) {
                missing.push(location);
            }
        }

        if !missing.is_empty() {
            tracing::error!(missing = ?missing, "You are currently missing these files");
            return Err(MigrateError::MissingScripts(missing));
        }

        Ok(())
    }
}

fn missing_action(script: &str, action: Action) -> MigrateError {
    MigrateError::MissingAction {
        script: script.to_string(),
        action: action.to_string(),
    }
}
