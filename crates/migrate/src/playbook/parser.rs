//! Playbook YAML parser.
//!
//! A playbook file is a mapping of step name to a list of nodes:
//!
//! ```yaml
//! schema:
//!   - describe: Base tables
//!     scripts: [2019-03-01-0930-users, 2019-03-01-0945-roles]
//!     actions: [up]
//! all:
//!   - $ref: [schema]
//!   - describe: Reference data
//!     scripts: [2019-03-02-1100-countries]
//!     actions: [seed]
//! ```

use std::path::Path;

use crate::error::{MigrateError, Result};
use crate::playbook::types::Playbook;

/// Parse a YAML string into a Playbook.
pub fn parse_playbook(yaml_content: &str) -> Result<Playbook> {
    let playbook: Playbook = serde_yaml::from_str(yaml_content)
        .map_err(|e| MigrateError::PlaybookLoad(e.to_string()))?;

    validate_playbook(&playbook);

    Ok(playbook)
}

/// Read and parse a playbook file.
pub async fn load_playbook(path: &Path) -> Result<Playbook> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        MigrateError::PlaybookLoad(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_playbook(&content)
}

/// Validate a parsed playbook.
///
/// Problems are logged, not returned: a `$ref` to an undefined step only
/// fails when a run actually reaches it.
pub fn validate_playbook(playbook: &Playbook) {
    for name in playbook.step_names() {
        let nodes = playbook.step(name).unwrap_or_default();
        for (idx, node) in nodes.iter().enumerate() {
            for target in node.refs().iter().filter(|r| !playbook.has_step(r)) {
                tracing::warn!(step = name, node = idx, target = %target, "$ref to undefined step");
            }

            if node.scripts().is_empty() && !node.actions().is_empty() {
                tracing::warn!(step = name, node = idx, "Node declares actions but no scripts");
            }
        }
    }
}
