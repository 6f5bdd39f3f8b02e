use crew_core::api::{OutputRendererPlugin, RenderEvent, Role};

/// Human-readable run events on stderr. Stdout is reserved for the memo.
pub struct TextRendererPlugin {
    ascii_only: bool,
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn mark(&self, ok: bool) -> &'static str {
        match (ok, self.ascii_only) {
            (true, true) => "OK",
            (true, false) => "✓",
            (false, true) => "X",
            (false, false) => "✗",
        }
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                ticker,
                total_roles,
                total_stages,
            } => format!(
                "RUN START {} {} (roles: {}, stages: {})",
                run_id, ticker, total_roles, total_stages
            ),
            RenderEvent::Plan { run_id, stages } => {
                let mut out = format!("PLAN {}:", run_id);
                for (idx, stage) in stages.iter().enumerate() {
                    out.push_str(&format!("\n  stage {}: {}", idx, join_roles(stage)));
                }
                out
            }
            RenderEvent::StageStart {
                run_id,
                stage_id,
                roles,
            } => format!(
                "STAGE START {} (stage {}, roles: {})",
                run_id,
                stage_id,
                join_roles(roles)
            ),
            RenderEvent::TaskStart {
                run_id,
                role,
                stage_id,
            } => format!(
                "TASK START {} (stage {}, {})",
                run_id,
                stage_id,
                role.display_name()
            ),
            RenderEvent::Attempt {
                role,
                attempt,
                max_attempts,
                approved,
                feedback,
                ..
            } => {
                let mut line = format!(
                    "  {} {} attempt {}/{}: {}",
                    self.mark(*approved),
                    role.display_name(),
                    attempt,
                    max_attempts,
                    if *approved { "approved" } else { "revision needed" }
                );
                for item in feedback {
                    line.push_str(&format!("\n      - {}", item));
                }
                line
            }
            RenderEvent::TaskComplete {
                run_id,
                role,
                status,
                attempts,
                duration_ms,
            } => format!(
                "TASK END {} ({}, status {}, attempts {}, duration {}ms)",
                run_id,
                role,
                status.as_str(),
                attempts,
                duration_ms
            ),
            RenderEvent::StageEnd { run_id, stage_id } => {
                format!("STAGE END {} (stage {})", run_id, stage_id)
            }
            RenderEvent::RunEnd {
                run_id,
                ticker,
                approved,
                exhausted,
                duration_ms,
            } => format!(
                "RUN END {} {} {} (approved {}, exhausted {}, duration {}ms)",
                run_id,
                ticker,
                self.mark(*exhausted == 0),
                approved,
                exhausted,
                duration_ms
            ),
            RenderEvent::RunFailed { run_id, role, error } => match role {
                Some(role) => format!("RUN FAILED {} ({}): {}", run_id, role, error),
                None => format!("RUN FAILED {}: {}", run_id, error),
            },
        }
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        eprintln!("{}", self.format_event(event));
    }
}
