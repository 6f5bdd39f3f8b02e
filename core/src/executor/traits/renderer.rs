use crate::executor::types::TaskStatus;
use crate::role::Role;

/// Output renderer plugin (controls run event formatting)
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Run events emitted by the engine, scheduler and controllers.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        ticker: String,
        total_roles: usize,
        total_stages: usize,
    },
    Plan {
        run_id: String,
        stages: Vec<Vec<Role>>,
    },
    StageStart {
        run_id: String,
        stage_id: usize,
        roles: Vec<Role>,
    },
    TaskStart {
        run_id: String,
        role: Role,
        stage_id: usize,
    },
    /// One generate-then-critique cycle finished.
    Attempt {
        run_id: String,
        role: Role,
        attempt: u32,
        max_attempts: u32,
        approved: bool,
        feedback: Vec<String>,
    },
    TaskComplete {
        run_id: String,
        role: Role,
        status: TaskStatus,
        attempts: u32,
        duration_ms: u64,
    },
    StageEnd {
        run_id: String,
        stage_id: usize,
    },
    RunEnd {
        run_id: String,
        ticker: String,
        approved: usize,
        exhausted: usize,
        duration_ms: u64,
    },
    RunFailed {
        run_id: String,
        role: Option<Role>,
        error: String,
    },
}
