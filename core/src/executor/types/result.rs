use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::executor::trace::TraceRecord;
use crate::role::Role;

use super::status::TaskStatus;
use super::task::UpstreamOutput;

/// Terminal result of one role's revision loop.
#[derive(Debug, Clone, Serialize)]
pub struct RoleOutcome {
    pub role: Role,

    /// Output of the last attempt (approved or best-effort)
    pub output: String,

    /// Either `Approved` or `Exhausted`
    pub status: TaskStatus,

    /// Attempts made, including the first
    pub attempts: u32,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Per-attempt records, merged into the run trace by the scheduler
    #[serde(skip)]
    pub trace: Vec<TraceRecord>,
}

impl RoleOutcome {
    pub fn approved(&self) -> bool {
        self.status == TaskStatus::Approved
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    /// The view a dependent task receives.
    pub fn as_upstream(&self) -> UpstreamOutput {
        UpstreamOutput {
            text: self.output.clone(),
            status: self.status,
            attempts: self.attempts,
        }
    }
}
