//! Applies one action's change descriptor to storage.
//!
//! `up` and `down` execute the descriptor's SQL verbatim as a single batch.
//! `seed` executes the SQL once per row, binding the row's values in
//! `columns` order. Row failures are logged and counted without stopping the
//! remaining rows.

use crate::error::{MigrateError, Result};
use crate::playbook::Action;
use crate::script::{ChangeDescriptor, SeedRow};
use crate::storage::Storage;

/// Executes change descriptors against a backend.
pub struct ActionApplier<'a> {
    storage: &'a dyn Storage,
}

impl<'a> ActionApplier<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Apply `change` for `action`. Returns the number of statements executed.
    pub async fn apply(&self, action: Action, change: &ChangeDescriptor) -> Result<usize> {
        tracing::info!(action = %action, description = %change.description.trim(), "Applying change");

        match action {
            Action::Up | Action::Down => self.execute(change).await,
            Action::Seed => self.seed(change).await,
        }
    }

    async fn execute(&self, change: &ChangeDescriptor) -> Result<usize> {
        let sql = require_sql(change)?;
        tracing::debug!(sql = %sql, "Executing statement");

        self.storage.query(sql, &[]).await?;
        Ok(1)
    }

    async fn seed(&self, change: &ChangeDescriptor) -> Result<usize> {
        let sql = require_sql(change)?;
        let columns = change.columns.as_deref().ok_or_else(|| {
            MigrateError::ChangeValidation("Seed change has no `columns`".to_string())
        })?;
        let data = change.data.as_deref().ok_or_else(|| {
            MigrateError::ChangeValidation("Seed change has no `data`".to_string())
        })?;

        tracing::debug!(sql = %sql, rows = data.len(), "Seeding rows");

        let mut inserted = 0;
        let mut failed = 0;
        for (idx, row) in data.iter().enumerate() {
            let values = match project_row(idx, row, columns) {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(row = idx, error = %e, "Skipping seed row");
                    failed += 1;
                    continue;
                }
            };

            tracing::debug!(row = idx, values = ?values, "Inserting");
            match self.storage.query(sql, &values).await {
                Ok(_) => inserted += 1,
                Err(e) => {
                    tracing::error!(row = idx, error = %e, "Seed row failed");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(MigrateError::SeedFailed {
                failed,
                total: data.len(),
            });
        }

        Ok(inserted)
    }
}

fn require_sql(change: &ChangeDescriptor) -> Result<&str> {
    change
        .sql
        .as_deref()
        .filter(|sql| !sql.trim().is_empty())
        .ok_or_else(|| MigrateError::ChangeValidation("No SQL was returned by the script".to_string()))
}

/// Project a row's values into `columns` order.
fn project_row(idx: usize, row: &SeedRow, columns: &[String]) -> Result<Vec<serde_json::Value>> {
    if row.len() != columns.len() {
        return Err(MigrateError::SeedRowMismatch {
            row: idx,
            expected: columns.len(),
            actual: row.len(),
        });
    }

    columns
        .iter()
        .map(|column| {
            row.get(column).cloned().ok_or_else(|| {
                MigrateError::ChangeValidation(format!(
                    "Seed row {} has no value for column '{}'",
                    idx, column
                ))
            })
        })
        .collect()
}
