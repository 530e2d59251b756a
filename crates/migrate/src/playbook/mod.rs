//! Playbook definitions and step resolution.
//!
//! This module provides:
//! - Type definitions for playbooks, step nodes and schedules
//! - YAML parsing and validation
//! - Resolution of a step into a flat migration schedule

pub mod parser;
pub mod resolver;
pub mod types;

pub use parser::{load_playbook, parse_playbook, validate_playbook};
pub use resolver::resolve;
pub use types::{Action, MigrationSchedule, Playbook, ScheduleEntry, StepNode};
