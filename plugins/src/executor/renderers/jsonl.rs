use chrono::Local;
use crew_core::api::{OutputRendererPlugin, RenderEvent};
use serde_json::{json, Value};

/// One JSON object per run event on stdout.
pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        match event {
            RenderEvent::RunStart {
                run_id,
                ticker,
                total_roles,
                total_stages,
            } => json!({
                "v": 1,
                "event_type": "run.start",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "ticker": ticker,
                    "total_roles": total_roles,
                    "total_stages": total_stages,
                }
            }),
            RenderEvent::Plan { run_id, stages } => {
                let total_roles: usize = stages.iter().map(|s| s.len()).sum();
                json!({
                    "v": 1,
                    "event_type": "executor.plan",
                    "ts": ts,
                    "run_id": run_id,
                    "metadata": {
                        "stages": stages,
                        "total_roles": total_roles,
                    }
                })
            }
            RenderEvent::StageStart {
                run_id,
                stage_id,
                roles,
            } => json!({
                "v": 1,
                "event_type": "stage.start",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "stage_id": stage_id,
                    "roles": roles,
                }
            }),
            RenderEvent::TaskStart {
                run_id,
                role,
                stage_id,
            } => json!({
                "v": 1,
                "event_type": "task.start",
                "ts": ts,
                "run_id": run_id,
                "role": role,
                "metadata": {
                    "stage_id": stage_id,
                }
            }),
            RenderEvent::Attempt {
                run_id,
                role,
                attempt,
                max_attempts,
                approved,
                feedback,
            } => json!({
                "v": 1,
                "event_type": "task.attempt",
                "ts": ts,
                "run_id": run_id,
                "role": role,
                "metadata": {
                    "attempt": attempt,
                    "max_attempts": max_attempts,
                    "approved": approved,
                    "feedback": feedback,
                }
            }),
            RenderEvent::TaskComplete {
                run_id,
                role,
                status,
                attempts,
                duration_ms,
            } => json!({
                "v": 1,
                "event_type": "task.end",
                "ts": ts,
                "run_id": run_id,
                "role": role,
                "metadata": {
                    "status": status.as_str(),
                    "attempts": attempts,
                    "duration_ms": duration_ms,
                }
            }),
            RenderEvent::StageEnd { run_id, stage_id } => json!({
                "v": 1,
                "event_type": "stage.end",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "stage_id": stage_id,
                }
            }),
            RenderEvent::RunEnd {
                run_id,
                ticker,
                approved,
                exhausted,
                duration_ms,
            } => json!({
                "v": 1,
                "event_type": "run.end",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "ticker": ticker,
                    "approved": approved,
                    "exhausted": exhausted,
                    "duration_ms": duration_ms,
                }
            }),
            RenderEvent::RunFailed { run_id, role, error } => json!({
                "v": 1,
                "event_type": "run.failed",
                "ts": ts,
                "run_id": run_id,
                "role": role,
                "metadata": {
                    "error": error,
                }
            }),
        }
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}
