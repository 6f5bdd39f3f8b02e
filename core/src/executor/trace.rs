use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::role::Role;

/// One generate-then-critique cycle as it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub role: Role,
    pub attempt: u32,
    pub approved: bool,
    /// The critic's response could not be parsed; counted as a rejection.
    pub malformed: bool,
    pub feedback: Vec<String>,
    pub output_preview: String,
    pub ts: DateTime<Utc>,
}

/// Append-only record of every attempt in a run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct TraceLog {
    records: Vec<TraceRecord>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = TraceRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn for_role(&self, role: Role) -> impl Iterator<Item = &TraceRecord> + '_ {
        self.records.iter().filter(move |r| r.role == role)
    }

    /// Per-role revision history for every role that appears in the log.
    pub fn revision_history(&self) -> Vec<RevisionHistory> {
        let mut roles: Vec<Role> = self.records.iter().map(|r| r.role).collect();
        roles.sort();
        roles.dedup();
        roles
            .into_iter()
            .map(|role| RevisionHistory::from_records(role, self.for_role(role)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionEntry {
    pub iteration: u32,
    pub output_preview: String,
    pub approved: bool,
    pub feedback: Vec<String>,
}

/// Report-facing view of one role's attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionHistory {
    pub agent: String,
    pub total_iterations: u32,
    pub final_approved: bool,
    pub history: Vec<RevisionEntry>,
}

impl RevisionHistory {
    fn from_records<'a>(role: Role, records: impl Iterator<Item = &'a TraceRecord>) -> Self {
        let history: Vec<RevisionEntry> = records
            .map(|r| RevisionEntry {
                iteration: r.attempt,
                output_preview: r.output_preview.clone(),
                approved: r.approved,
                feedback: r.feedback.clone(),
            })
            .collect();
        Self {
            agent: role.display_name().to_string(),
            total_iterations: history.len() as u32,
            final_approved: history.last().is_some_and(|e| e.approved),
            history,
        }
    }

    pub fn summary(&self) -> String {
        if self.history.is_empty() {
            return format!("{}: No revisions recorded", self.agent);
        }

        let mut lines = vec![format!(
            "{} - {} iteration(s)",
            self.agent, self.total_iterations
        )];
        for entry in &self.history {
            let status = if entry.approved {
                "Approved"
            } else {
                "Revision needed"
            };
            lines.push(format!("  Round {}: {}", entry.iteration, status));
            if !entry.approved {
                if let Some(first) = entry.feedback.first() {
                    lines.push(format!("    Feedback: {}", preview(first, 100)));
                }
            }
        }
        lines.join("\n")
    }
}

/// First `max_chars` characters of `text`, with "..." appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(role: Role, attempt: u32, approved: bool, feedback: &[&str]) -> TraceRecord {
        TraceRecord {
            role,
            attempt,
            approved,
            malformed: false,
            feedback: feedback.iter().map(|s| s.to_string()).collect(),
            output_preview: format!("draft {attempt}"),
            ts: Utc::now(),
        }
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("héllo wörld", 5), "héllo...");
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("exact", 5), "exact");
    }

    #[test]
    fn test_revision_history_groups_by_role() {
        let mut log = TraceLog::new();
        log.push(record(Role::Quant, 1, false, &["add CAGR"]));
        log.push(record(Role::Macro, 1, true, &[]));
        log.push(record(Role::Quant, 2, true, &[]));

        let history = log.revision_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].agent, "Macro & Sentiment Analyst");
        assert_eq!(history[1].agent, "Quantitative Analyst");
        assert_eq!(history[1].total_iterations, 2);
        assert!(history[1].final_approved);
        assert_eq!(log.for_role(Role::Quant).count(), 2);
    }

    #[test]
    fn test_summary_lists_rounds() {
        let mut log = TraceLog::new();
        log.push(record(Role::Technical, 1, false, &["missing RSI"]));
        log.push(record(Role::Technical, 2, true, &[]));

        let summary = log.revision_history()[0].summary();
        assert_eq!(
            summary,
            "Technical Analyst - 2 iteration(s)\n  Round 1: Revision needed\n    Feedback: missing RSI\n  Round 2: Approved"
        );
    }
}
