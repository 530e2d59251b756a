//! Playbook and schedule types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::MigrateError;

/// Action applied to a migration script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Apply the change.
    Up,
    /// Revert the change. Executed exactly like `up`.
    Down,
    /// Insert rows one at a time.
    Seed,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Seed => "seed",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Action::Up),
            "down" => Ok(Action::Down),
            "seed" => Ok(Action::Seed),
            other => Err(MigrateError::PlaybookLoad(format!(
                "Unknown action '{}'. Expected one of: up, down, seed",
                other
            ))),
        }
    }
}

/// One node of a step definition.
///
/// A node may list scripts (each run with the node's actions), reference
/// other steps to inline, or both. Scripts are scheduled before references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepNode {
    /// Human-readable description, logged during resolution.
    #[serde(default)]
    pub describe: String,

    /// Script identifiers, in execution order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Vec<String>>,

    /// Actions applied to every script in this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Action>>,

    /// Other steps to expand in place.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<String>>,
}

impl StepNode {
    pub fn scripts(&self) -> &[String] {
        self.scripts.as_deref().unwrap_or_default()
    }

    pub fn actions(&self) -> &[Action] {
        self.actions.as_deref().unwrap_or_default()
    }

    pub fn refs(&self) -> &[String] {
        self.refs.as_deref().unwrap_or_default()
    }
}

/// Named step definitions of one playbook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Playbook {
    pub steps: HashMap<String, Vec<StepNode>>,
}

impl Playbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a step.
    pub fn with_step(mut self, name: impl Into<String>, nodes: Vec<StepNode>) -> Self {
        self.steps.insert(name.into(), nodes);
        self
    }

    pub fn step(&self, name: &str) -> Option<&[StepNode]> {
        self.steps.get(name).map(|nodes| nodes.as_slice())
    }

    pub fn has_step(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Step names, sorted.
    pub fn step_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// A script paired with the actions to run on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub script: String,
    pub actions: Vec<Action>,
}

impl ScheduleEntry {
    pub fn new(script: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            script: script.into(),
            actions,
        }
    }
}

/// Flattened, ordered list of schedule entries for one run.
pub type MigrationSchedule = Vec<ScheduleEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Up.to_string(), "up");
        assert_eq!(Action::Down.to_string(), "down");
        assert_eq!(Action::Seed.to_string(), "seed");
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("seed".parse::<Action>().unwrap(), Action::Seed);
        assert!(matches!(
            "migrate".parse::<Action>(),
            Err(MigrateError::PlaybookLoad(_))
        ));
    }

    #[test]
    fn test_step_node_deserialization() {
        let yaml = r#"
describe: Create the base tables
scripts: [2019-01-01-0000-users, 2019-01-02-0000-roles]
actions: [up, seed]
"#;
        let node: StepNode = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(node.describe, "Create the base tables");
        assert_eq!(node.scripts().len(), 2);
        assert_eq!(node.actions(), &[Action::Up, Action::Seed]);
        assert!(node.refs().is_empty());
    }

    #[test]
    fn test_step_node_ref_key() {
        let yaml = r#"
describe: Everything
$ref: [schema, data]
"#;
        let node: StepNode = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(node.refs(), &["schema".to_string(), "data".to_string()]);
        assert!(node.scripts().is_empty());
        assert!(node.actions().is_empty());
    }

    #[test]
    fn test_step_node_rejects_unknown_action() {
        let yaml = "scripts: [a]\nactions: [upgrade]\n";
        let result: Result<StepNode, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_playbook_step_names_sorted() {
        let playbook = Playbook::new()
            .with_step("teardown", vec![])
            .with_step("all", vec![]);
        assert_eq!(playbook.step_names(), vec!["all", "teardown"]);
        assert!(playbook.has_step("all"));
        assert!(playbook.step("missing").is_none());
    }
}
