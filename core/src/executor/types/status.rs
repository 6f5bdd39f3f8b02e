//! Task status and its transition rules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    AwaitingCritique,
    Rejected,
    Approved,
    /// Ceiling reached without approval; the last output is used anyway.
    Exhausted,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Approved | TaskStatus::Exhausted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::AwaitingCritique => "awaiting_critique",
            TaskStatus::Rejected => "rejected",
            TaskStatus::Approved => "approved",
            TaskStatus::Exhausted => "exhausted",
        }
    }
}

/// Transition table for the revision state machine:
///
/// ```text
/// Pending -> Running -> AwaitingCritique -> Approved
///               ^                        -> Exhausted
///               '------- Rejected <------'
/// ```
pub struct StatusTransition;

impl StatusTransition {
    pub fn is_valid(from: TaskStatus, to: TaskStatus) -> bool {
        matches!(
            (from, to),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::AwaitingCritique)
                | (TaskStatus::AwaitingCritique, TaskStatus::Approved)
                | (TaskStatus::AwaitingCritique, TaskStatus::Rejected)
                | (TaskStatus::AwaitingCritique, TaskStatus::Exhausted)
                | (TaskStatus::Rejected, TaskStatus::Running)
        )
    }
}
