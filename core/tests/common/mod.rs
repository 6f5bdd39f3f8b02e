#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crew_core::api::{
    AnalysisEngine, CancelToken, ContextSource, CritiqueRequest, CritiqueService,
    ExecutionOpts, GenerationRequest, GenerationService, RevisionPolicy, Role, ServiceError,
    Verdict,
};

/// One recorded worker call.
#[derive(Debug, Clone)]
pub struct Call {
    pub role: Role,
    pub attempt: u32,
    pub prompt: String,
    pub at: DateTime<Utc>,
}

/// Generator that answers `"<role> output attempt <n>"` and records every
/// prompt it was given.
#[derive(Default)]
pub struct RecordingGenerator {
    calls: Mutex<Vec<Call>>,
    fatal_roles: HashSet<Role>,
    transient_left: Mutex<HashMap<Role, u32>>,
    delay: Option<Duration>,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, role: Role) -> Self {
        self.fatal_roles.insert(role);
        self
    }

    /// Fail the first `times` calls for `role` with a retryable error.
    pub fn flaky_for(self, role: Role, times: u32) -> Self {
        self.transient_left.lock().unwrap().insert(role, times);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, role: Role) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.role == role).collect()
    }
}

pub fn output_text(role: Role, attempt: u32) -> String {
    format!("{role} output attempt {attempt}")
}

#[async_trait]
impl GenerationService for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, ServiceError> {
        self.calls.lock().unwrap().push(Call {
            role: request.role,
            attempt: request.attempt,
            prompt: request.context.to_string(),
            at: Utc::now(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fatal_roles.contains(&request.role) {
            return Err(ServiceError::fatal("insufficient_quota"));
        }
        if let Some(left) = self.transient_left.lock().unwrap().get_mut(&request.role) {
            if *left > 0 {
                *left -= 1;
                return Err(ServiceError::transient("503 Service Unavailable"));
            }
        }
        Ok(output_text(request.role, request.attempt))
    }
}

/// Critic driven by a per-role script; roles without a script are approved
/// (or rejected when `reject_all` is set).
#[derive(Default)]
pub struct ScriptedCritic {
    scripts: Mutex<HashMap<Role, VecDeque<Result<Verdict, ServiceError>>>>,
    reject_all: bool,
}

impl ScriptedCritic {
    pub fn approving() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject_all: true,
            ..Self::default()
        }
    }

    pub fn script(self, role: Role, verdicts: Vec<Result<Verdict, ServiceError>>) -> Self {
        self.scripts.lock().unwrap().insert(role, verdicts.into());
        self
    }
}

#[async_trait]
impl CritiqueService for ScriptedCritic {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn critique(&self, request: CritiqueRequest<'_>) -> Result<Verdict, ServiceError> {
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.role)
            .and_then(|q| q.pop_front());
        match scripted {
            Some(verdict) => verdict,
            None if self.reject_all => Ok(Verdict::reject([format!(
                "attempt {} still misses the rubric",
                request.attempt
            )])),
            None => Ok(Verdict::approve()),
        }
    }
}

/// Context source backed by a fixed map.
pub struct MapSource(pub HashMap<Role, String>);

#[async_trait]
impl ContextSource for MapSource {
    fn name(&self) -> &str {
        "map"
    }

    async fn fetch(&self, _ticker: &str, role: Role) -> Result<Option<String>, ServiceError> {
        Ok(self.0.get(&role).cloned())
    }
}

pub fn engine(
    generator: Arc<dyn GenerationService>,
    critic: Arc<dyn CritiqueService>,
) -> AnalysisEngine {
    engine_with(generator, critic, CancelToken::never())
}

pub fn engine_with(
    generator: Arc<dyn GenerationService>,
    critic: Arc<dyn CritiqueService>,
    cancel: CancelToken,
) -> AnalysisEngine {
    AnalysisEngine::builder()
        .generator(generator)
        .critic(critic)
        .policy(RevisionPolicy::new(2))
        .opts(ExecutionOpts {
            run_id: Some("test-run".to_string()),
            ..ExecutionOpts::default()
        })
        .cancel(cancel)
        .build()
        .unwrap()
}
