use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::role::Role;

/// Visual progress monitor for a run
///
/// One overall bar counting finished roles, plus a spinner per running role
/// that shows the current attempt.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    role_bars: HashMap<Role, ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    /// Create a new progress monitor
    ///
    /// * `total_roles` - Number of roles scheduled in the run
    /// * `enabled` - Whether to draw anything (disabled for jsonl output)
    pub fn new(total_roles: usize, enabled: bool) -> Self {
        if !enabled {
            return Self::hidden();
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_roles as u64));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} roles ({percent}%) {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            role_bars: HashMap::new(),
            enabled: true,
        }
    }

    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::new(),
            overall: ProgressBar::hidden(),
            role_bars: HashMap::new(),
            enabled: false,
        }
    }

    pub fn add_role(&mut self, role: Role) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.set_message(format!("⏳ {}", role.display_name()));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.role_bars.insert(role, bar);
    }

    /// Show the attempt a role is on.
    pub fn set_attempt(&self, role: Role, attempt: u32, max_attempts: u32) {
        if let Some(bar) = self.role_bars.get(&role) {
            bar.set_message(format!(
                "⏳ {} (attempt {}/{})",
                role.display_name(),
                attempt,
                max_attempts
            ));
        }
    }

    pub fn complete_role(&mut self, role: Role, approved: bool, attempts: u32, duration_ms: u64) {
        if !self.enabled {
            return;
        }

        if let Some(bar) = self.role_bars.remove(&role) {
            let icon = if approved { "✅" } else { "⚠️" };
            bar.finish_with_message(format!(
                "{} {} ({} attempt(s), {}ms)",
                icon,
                role.display_name(),
                attempts,
                duration_ms
            ));
        }

        self.overall.inc(1);
    }

    pub fn update_stage(&self, stage_id: usize, total_stages: usize) {
        if self.enabled {
            self.overall
                .set_message(format!("Stage {}/{}", stage_id + 1, total_stages));
        }
    }

    pub fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = if success {
            "✅ Analysis complete"
        } else {
            "❌ Analysis failed"
        };

        self.overall.finish_with_message(msg.to_string());
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.role_bars.drain() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_monitor_disabled() {
        let mut monitor = ProgressMonitor::new(3, false);

        monitor.add_role(Role::Macro);
        monitor.set_attempt(Role::Macro, 2, 3);
        monitor.complete_role(Role::Macro, true, 2, 100);
        monitor.finish(true);
    }

    #[test]
    fn test_progress_monitor_enabled() {
        let mut monitor = ProgressMonitor::new(2, true);

        monitor.add_role(Role::Macro);
        monitor.add_role(Role::Quant);
        monitor.set_attempt(Role::Quant, 2, 3);

        monitor.complete_role(Role::Macro, true, 1, 100);
        monitor.complete_role(Role::Quant, false, 3, 200);

        monitor.update_stage(0, 3);
        monitor.finish(true);
    }
}
