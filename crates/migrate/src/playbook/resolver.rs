//! Step resolution.
//!
//! Expands a step into a flat schedule. Nodes are visited in declaration
//! order; within a node, scripts are scheduled first and `$ref` targets are
//! then expanded depth-first, left to right.

use std::collections::HashSet;

use crate::error::{MigrateError, Result};
use crate::playbook::types::{MigrationSchedule, Playbook, ScheduleEntry, StepNode};

/// Expansion state of one step on the stack.
struct Frame<'a> {
    step: &'a str,
    nodes: &'a [StepNode],
    node: usize,
    next_ref: usize,
    scripts_done: bool,
}

impl<'a> Frame<'a> {
    fn new(step: &'a str, nodes: &'a [StepNode]) -> Self {
        Self {
            step,
            nodes,
            node: 0,
            next_ref: 0,
            scripts_done: false,
        }
    }
}

/// Resolve `step` in `playbook` into a migration schedule.
///
/// Referencing a step that is already being expanded is rejected with
/// [`MigrateError::ReferenceCycle`]. The same step may be referenced more
/// than once from separate branches.
pub fn resolve(playbook: &Playbook, step: &str) -> Result<MigrationSchedule> {
    let (name, nodes) = lookup(playbook, step)?;

    let mut schedule = MigrationSchedule::new();
    let mut on_path: HashSet<&str> = HashSet::from([name]);
    let mut stack = vec![Frame::new(name, nodes)];

    while let Some(frame) = stack.last_mut() {
        let nodes = frame.nodes;
        let Some(node) = nodes.get(frame.node) else {
            on_path.remove(frame.step);
            stack.pop();
            continue;
        };

        if !frame.scripts_done {
            if !node.describe.is_empty() {
                tracing::debug!(step = frame.step, describe = %node.describe.trim(), "Resolving node");
            }
            let actions = node.actions();
            schedule.extend(
                node.scripts()
                    .iter()
                    .map(|script| ScheduleEntry::new(script.clone(), actions.to_vec())),
            );
            frame.scripts_done = true;
        }

        let Some(target) = node.refs().get(frame.next_ref) else {
            frame.node += 1;
            frame.next_ref = 0;
            frame.scripts_done = false;
            continue;
        };
        frame.next_ref += 1;

        let (target, target_nodes) = lookup(playbook, target)?;
        if on_path.contains(target) {
            let mut chain: Vec<String> = stack.iter().map(|f| f.step.to_string()).collect();
            chain.push(target.to_string());
            return Err(MigrateError::ReferenceCycle { chain });
        }

        on_path.insert(target);
        stack.push(Frame::new(target, target_nodes));
    }

    tracing::debug!(step, entries = schedule.len(), "Resolved migration schedule");
    Ok(schedule)
}

fn lookup<'a>(playbook: &'a Playbook, step: &str) -> Result<(&'a str, &'a [StepNode])> {
    playbook
        .steps
        .get_key_value(step)
        .map(|(name, nodes)| (name.as_str(), nodes.as_slice()))
        .ok_or_else(|| MigrateError::UnknownStep(step.to_string()))
}
