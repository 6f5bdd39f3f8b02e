use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CrewError;
use crate::role::Role;
use crate::service::{Verdict, GENERIC_FEEDBACK};

use super::status::{StatusTransition, TaskStatus};

/// Common task interface for executor graph handling.
pub trait TaskLike: Clone + Send + Sync {
    fn role(&self) -> Role;
    fn dependencies(&self) -> &[Role];
}

/// Terminal output of an upstream role as seen by a dependent task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamOutput {
    pub text: String,
    pub status: TaskStatus,
    pub attempts: u32,
}

impl UpstreamOutput {
    pub fn approved(&self) -> bool {
        self.status == TaskStatus::Approved
    }
}

/// A unit of work owned by exactly one revision controller.
///
/// All mutation goes through the transition methods below, which validate
/// against [`StatusTransition`] and enforce the attempt ceiling.
#[derive(Debug, Clone)]
pub struct Task {
    role: Role,
    ticker: String,
    seed: Option<String>,
    context: BTreeMap<Role, UpstreamOutput>,
    attempts: u32,
    max_attempts: u32,
    status: TaskStatus,
    feedback: Vec<String>,
    last_output: Option<String>,
}

impl Task {
    pub fn new(role: Role, ticker: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            role,
            ticker: ticker.into(),
            seed: None,
            context: BTreeMap::new(),
            attempts: 0,
            max_attempts: max_attempts.max(1),
            status: TaskStatus::Pending,
            feedback: Vec::new(),
            last_output: None,
        }
    }

    /// Opaque source material from a data-fetch collaborator.
    pub fn with_seed(mut self, seed: Option<String>) -> Self {
        self.seed = seed.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_upstream(mut self, role: Role, output: UpstreamOutput) -> Self {
        self.context.insert(role, output);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref()
    }

    /// Upstream outputs keyed by role, iterated in canonical role order.
    pub fn context(&self) -> &BTreeMap<Role, UpstreamOutput> {
        &self.context
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Feedback from the most recent rejection.
    pub fn feedback(&self) -> &[String] {
        &self.feedback
    }

    pub fn last_output(&self) -> Option<&str> {
        self.last_output.as_deref()
    }

    fn transition(&mut self, to: TaskStatus) -> Result<(), CrewError> {
        if !StatusTransition::is_valid(self.status, to) {
            return Err(CrewError::InvalidTransition {
                role: self.role,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Enter `Running` for the next attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> Result<u32, CrewError> {
        if self.attempts >= self.max_attempts {
            return Err(CrewError::InvalidTransition {
                role: self.role,
                from: self.status,
                to: TaskStatus::Running,
            });
        }
        self.transition(TaskStatus::Running)?;
        self.attempts += 1;
        Ok(self.attempts)
    }

    pub fn submit_for_critique(&mut self, output: String) -> Result<(), CrewError> {
        self.transition(TaskStatus::AwaitingCritique)?;
        self.last_output = Some(output);
        Ok(())
    }

    /// Apply a verdict. Approval or a spent ceiling is terminal; otherwise
    /// the task moves to `Rejected` holding the feedback for the next prompt.
    pub fn record_verdict(&mut self, verdict: &Verdict) -> Result<TaskStatus, CrewError> {
        let next = if verdict.approved() {
            TaskStatus::Approved
        } else if self.attempts >= self.max_attempts {
            TaskStatus::Exhausted
        } else {
            TaskStatus::Rejected
        };
        self.transition(next)?;
        self.feedback = match next {
            TaskStatus::Rejected if verdict.feedback().is_empty() => {
                vec![GENERIC_FEEDBACK.to_string()]
            }
            TaskStatus::Rejected => verdict.feedback().to_vec(),
            _ => Vec::new(),
        };
        Ok(next)
    }

    /// Final output of a terminal task.
    pub fn into_final(self) -> Option<(String, TaskStatus)> {
        if !self.status.is_terminal() {
            return None;
        }
        self.last_output.map(|out| (out, self.status))
    }
}
