use crate::config::{AppConfig, RevisionConfig};

/// Revision ceiling handed to every controller in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionPolicy {
    /// Critique-driven regenerations after the first attempt.
    pub max_revisions: u32,
    /// Characters of output kept per trace record.
    pub preview_chars: usize,
}

impl RevisionPolicy {
    pub fn new(max_revisions: u32) -> Self {
        Self {
            max_revisions,
            ..Self::default()
        }
    }

    /// Initial attempt plus the revision cycles.
    pub fn max_attempts(&self) -> u32 {
        self.max_revisions.saturating_add(1)
    }

    pub fn from_config(cfg: &RevisionConfig) -> Self {
        Self {
            max_revisions: cfg.max_revisions,
            preview_chars: cfg.output_preview_chars,
        }
    }
}

impl Default for RevisionPolicy {
    fn default() -> Self {
        Self::from_config(&RevisionConfig::default())
    }
}

/// Run-level execution options.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOpts {
    /// Enable visual progress bar (disabled for jsonl output)
    pub progress_bar: bool,

    /// Cap on the independent fan-out (the pool never exceeds the number of
    /// independent roles)
    pub max_parallel: Option<usize>,

    /// Fixed run ID; a v4 UUID is generated when unset
    pub run_id: Option<String>,
}

impl ExecutionOpts {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            progress_bar: cfg.output.progress_bar && cfg.output.format == "text",
            max_parallel: cfg.concurrency.max_parallel,
            run_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_allows_three_attempts() {
        let policy = RevisionPolicy::default();
        assert_eq!(policy.max_revisions, 2);
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn test_progress_bar_disabled_for_jsonl() {
        let mut cfg = AppConfig::default();
        cfg.output.format = "jsonl".to_string();
        assert!(!ExecutionOpts::from_config(&cfg).progress_bar);
    }
}
