use std::fmt::Write;

use crate::role::PromptTemplate;

use super::types::{Task, UpstreamOutput};

/// Builds worker prompts from a task and its role template.
///
/// Output depends only on the inputs: upstream sections are emitted in
/// canonical role order, so identical runs produce identical prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    /// The prompt for the first attempt. Reused unchanged for every revision.
    pub fn base_context(task: &Task, template: &PromptTemplate) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Task: {} ({})", task.role().display_name(), task.ticker());
        let _ = writeln!(out);
        let _ = writeln!(out, "Goal: {}", template.goal);
        let _ = writeln!(out);
        let _ = writeln!(out, "Instructions:\n{}", template.instructions);
        let _ = writeln!(out);
        let _ = writeln!(out, "Expected output: {}", template.expected_output);

        if let Some(seed) = task.seed() {
            let _ = writeln!(out);
            let _ = writeln!(out, "=== Source Material ===");
            let _ = writeln!(out, "{}", seed.trim_end());
        }

        if !task.context().is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "=== Upstream Outputs ===");
            for (role, upstream) in task.context() {
                let _ = writeln!(out);
                let _ = writeln!(
                    out,
                    "--- {} [{}] ---",
                    role.display_name(),
                    approval_flag(upstream)
                );
                let _ = writeln!(out, "{}", upstream.text.trim_end());
            }
        }

        out
    }

    /// Base context plus the corrections delta for the attempt being
    /// prepared. The heading carries that attempt number, so the second
    /// attempt reads `REVISION 2 REQUIRED`.
    pub fn revision_context(
        base: &str,
        attempt: u32,
        previous_output: &str,
        feedback: &[String],
    ) -> String {
        let mut out = String::with_capacity(base.len() + previous_output.len() + 512);
        out.push_str(base);
        let _ = writeln!(out);
        let _ = writeln!(out, "---");
        let _ = writeln!(out, "REVISION {attempt} REQUIRED");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Your previous output was reviewed by the Research Manager. Here is your previous work:"
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "--- PREVIOUS OUTPUT ---");
        let _ = writeln!(out, "{}", previous_output.trim_end());
        let _ = writeln!(out, "--- END PREVIOUS OUTPUT ---");
        let _ = writeln!(out);
        let _ = writeln!(out, "Required corrections:");
        for (i, item) in feedback.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, item);
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Address every correction. Build on your previous work instead of starting over: keep what was good and fix what was flagged."
        );
        out
    }
}

fn approval_flag(upstream: &UpstreamOutput) -> String {
    let plural = if upstream.attempts == 1 { "" } else { "s" };
    if upstream.approved() {
        format!("approved after {} attempt{}", upstream.attempts, plural)
    } else {
        format!("NOT APPROVED after {} attempt{}", upstream.attempts, plural)
    }
}
