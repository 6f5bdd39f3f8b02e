//! Final product of a run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::executor::trace::{RevisionHistory, TraceLog};
use crate::executor::types::RoleOutcome;
use crate::role::Role;

/// Everything a completed run produced.
///
/// Only built when every scheduled role reached a terminal state; a failed
/// run yields an error instead of a partial report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: String,
    pub ticker: String,
    /// Output of the synthesis role
    pub final_report: String,
    /// Every role's output keyed by display name, synthesis included
    pub details: BTreeMap<String, String>,
    pub revision_history: Vec<RevisionHistory>,
    pub trace: TraceLog,
    pub duration_ms: u64,
    #[serde(skip)]
    pub per_role: BTreeMap<Role, RoleOutcome>,
}

impl AnalysisReport {
    /// Assemble the report. `plan` fixes the order trace records are
    /// appended in.
    pub fn build(
        run_id: impl Into<String>,
        ticker: impl Into<String>,
        plan: &[Vec<Role>],
        synthesis: Option<Role>,
        mut per_role: BTreeMap<Role, RoleOutcome>,
        duration_ms: u64,
    ) -> Self {
        let mut trace = TraceLog::new();
        for role in plan.iter().flatten() {
            if let Some(outcome) = per_role.get_mut(role) {
                trace.extend(std::mem::take(&mut outcome.trace));
            }
        }

        let final_report = synthesis
            .and_then(|role| per_role.get(&role))
            .map(|o| o.output.clone())
            .unwrap_or_default();

        let details = per_role
            .values()
            .map(|o| (o.role.display_name().to_string(), o.output.clone()))
            .collect();

        Self {
            run_id: run_id.into(),
            ticker: ticker.into(),
            final_report,
            details,
            revision_history: trace.revision_history(),
            trace,
            duration_ms,
            per_role,
        }
    }

    pub fn output_for(&self, role: Role) -> Option<&str> {
        self.per_role.get(&role).map(|o| o.output.as_str())
    }

    /// Look up a role's final output by short or display name.
    pub fn output_by_name(&self, name: &str) -> Option<&str> {
        name.parse::<Role>().ok().and_then(|role| self.output_for(role))
    }

    pub fn all_approved(&self) -> bool {
        self.per_role.values().all(RoleOutcome::approved)
    }

    /// Roles that finished on the attempt ceiling without approval.
    pub fn exhausted_roles(&self) -> Vec<Role> {
        self.per_role
            .values()
            .filter(|o| !o.approved())
            .map(|o| o.role)
            .collect()
    }

    pub fn revision_summary(&self) -> String {
        self.revision_history
            .iter()
            .map(RevisionHistory::summary)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
