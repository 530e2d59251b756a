//! Migration error types.

use thiserror::Error;

/// Errors that can occur while resolving or applying a migration run.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Configuration error (missing environment, unreadable config file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Playbook could not be read or parsed.
    #[error("Playbook load error: {0}")]
    PlaybookLoad(String),

    /// Requested or referenced step is not defined in the playbook.
    #[error("Step not found in playbook: {0}")]
    UnknownStep(String),

    /// A step references itself, directly or through other steps.
    #[error("Reference cycle between steps: {}", .chain.join(" -> "))]
    ReferenceCycle { chain: Vec<String> },

    /// Storage kind is not registered.
    #[error("Storage '{0}' is not supported")]
    UnsupportedStorage(String),

    /// One or more scripts named by the schedule do not exist.
    #[error("Missing migration scripts: {}", .0.join(", "))]
    MissingScripts(Vec<String>),

    /// Script exists but could not be loaded.
    #[error("Failed to load script '{script}': {reason}")]
    ScriptLoad { script: String, reason: String },

    /// Script does not provide the requested action.
    #[error("Script '{script}' has no '{action}' action")]
    MissingAction { script: String, action: String },

    /// Change descriptor is incomplete or malformed.
    #[error("Invalid change: {0}")]
    ChangeValidation(String),

    /// Seed row does not match the declared columns.
    #[error("Seed row {row} has {actual} fields, expected {expected}")]
    SeedRowMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// One or more seed rows failed.
    #[error("{failed} of {total} seed rows failed")]
    SeedFailed { failed: usize, total: usize },

    /// Backend query or connection error.
    #[error("Database error: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MigrateError>;

impl MigrateError {
    /// Returns true for errors that abort a run before any change is applied.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigrateError::Config(_)
                | MigrateError::PlaybookLoad(_)
                | MigrateError::UnknownStep(_)
                | MigrateError::ReferenceCycle { .. }
                | MigrateError::UnsupportedStorage(_)
                | MigrateError::MissingScripts(_)
        )
    }

    /// Number of failures this error stands for in a run's error count.
    ///
    /// A failed seed counts each of its failed rows; everything else counts once.
    pub fn failure_count(&self) -> usize {
        match self {
            MigrateError::SeedFailed { failed, .. } => *failed,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for MigrateError {
    fn from(e: std::io::Error) -> Self {
        MigrateError::Io(e.to_string())
    }
}

impl From<tokio_postgres::Error> for MigrateError {
    fn from(e: tokio_postgres::Error) -> Self {
        MigrateError::Backend(error_chain(&e))
    }
}

impl From<duckdb::Error> for MigrateError {
    fn from(e: duckdb::Error) -> Self {
        MigrateError::Backend(error_chain(&e))
    }
}

impl From<sqlx::Error> for MigrateError {
    fn from(e: sqlx::Error) -> Self {
        MigrateError::Backend(error_chain(&e))
    }
}

/// Render an error followed by each of its sources.
///
/// Sources already included in the message are skipped.
pub(crate) fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
