use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::{CrewError, ServiceError};
use crate::role::{Role, RoleProfile};
use crate::service::{CritiqueRequest, CritiqueService, GenerationRequest, GenerationService, Verdict};

use super::cancel::CancelToken;
use super::context::ContextAssembler;
use super::progress::ProgressMonitor;
use super::trace::{preview, TraceRecord};
use super::traits::{OutputRendererPlugin, RenderEvent, RetryStrategyPlugin};
use super::types::{RevisionPolicy, RoleOutcome, Task};

/// Collaborators shared by every controller of a run.
#[derive(Clone)]
pub struct ControllerDeps {
    pub generator: Arc<dyn GenerationService>,
    pub critic: Arc<dyn CritiqueService>,
    pub retry_strategy: Arc<dyn RetryStrategyPlugin>,
    pub renderer: Option<Arc<dyn OutputRendererPlugin>>,
    pub progress: Arc<Mutex<ProgressMonitor>>,
    pub policy: RevisionPolicy,
    pub cancel: CancelToken,
    pub run_id: String,
}

/// Drives one task through generate / critique / revise until it is
/// approved or the attempt ceiling is spent.
///
/// ```text
/// Pending -> Running -> AwaitingCritique -> Approved
///               ^                        -> Exhausted
///               +------- Rejected <------+
/// ```
pub struct RevisionController {
    profile: Arc<RoleProfile>,
    deps: ControllerDeps,
}

impl RevisionController {
    pub fn new(profile: Arc<RoleProfile>, deps: ControllerDeps) -> Self {
        Self { profile, deps }
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    /// Run the loop to a terminal state.
    ///
    /// The last attempt's output is returned even when it was never
    /// approved. Transient service errors are retried without consuming
    /// revision attempts; anything else fails the role.
    pub async fn run(&self, mut task: Task) -> Result<RoleOutcome, CrewError> {
        let role = task.role();
        let started_at = Utc::now();
        let base = ContextAssembler::base_context(&task, &self.profile.template);
        let mut trace = Vec::new();

        tracing::debug!(
            target: "crew.controller",
            run_id = %self.deps.run_id,
            role = %role,
            max_attempts = task.max_attempts(),
            "controller started"
        );

        loop {
            if self.deps.cancel.is_cancelled() {
                return Err(CrewError::Cancelled);
            }

            let attempt = task.begin_attempt()?;
            if let Ok(monitor) = self.deps.progress.lock() {
                monitor.set_attempt(role, attempt, task.max_attempts());
            }

            let prompt = match task.last_output() {
                Some(previous) if attempt > 1 => {
                    ContextAssembler::revision_context(&base, attempt, previous, task.feedback())
                }
                _ => base.clone(),
            };

            let output = self.generate(&task, &prompt, attempt).await?;
            let output_preview = preview(&output, self.deps.policy.preview_chars);
            task.submit_for_critique(output)?;

            let (verdict, malformed) = self.critique(&task, attempt).await?;
            let status = task.record_verdict(&verdict)?;

            tracing::info!(
                target: "crew.controller",
                run_id = %self.deps.run_id,
                role = %role,
                attempt,
                approved = verdict.approved(),
                malformed,
                status = status.as_str(),
                "attempt reviewed"
            );

            self.emit_attempt(role, attempt, task.max_attempts(), &verdict);

            trace.push(TraceRecord {
                role,
                attempt,
                approved: verdict.approved(),
                malformed,
                feedback: verdict.feedback().to_vec(),
                output_preview,
                ts: Utc::now(),
            });

            if status.is_terminal() {
                break;
            }
        }

        let attempts = task.attempts();
        let (output, status) = task.into_final().ok_or_else(|| CrewError::TaskAborted {
            role,
            message: "controller stopped without a final output".to_string(),
        })?;

        Ok(RoleOutcome {
            role,
            output,
            status,
            attempts,
            started_at,
            finished_at: Utc::now(),
            trace,
        })
    }

    async fn generate(&self, task: &Task, prompt: &str, attempt: u32) -> Result<String, CrewError> {
        let generator = &self.deps.generator;
        let template = &self.profile.template;
        self.with_retry(task.role(), "generate", || {
            generator.generate(GenerationRequest {
                role: task.role(),
                ticker: task.ticker(),
                template,
                context: prompt,
                attempt,
            })
        })
        .await
    }

    /// Returns the verdict and whether it stands in for a malformed response.
    async fn critique(&self, task: &Task, attempt: u32) -> Result<(Verdict, bool), CrewError> {
        let output = task.last_output().unwrap_or_default();
        let critic = &self.deps.critic;
        let rubric = &self.profile.rubric;
        let role = task.role();
        let run_id = &self.deps.run_id;

        self.with_retry(role, "critique", || async move {
            let request = CritiqueRequest {
                role,
                ticker: task.ticker(),
                output,
                rubric,
                attempt,
            };
            match critic.critique(request).await {
                Ok(verdict) => Ok((verdict, false)),
                Err(ServiceError::MalformedVerdict(reason)) => {
                    tracing::warn!(
                        target: "crew.controller",
                        run_id = %run_id,
                        role = %role,
                        attempt,
                        reason = %reason,
                        "malformed verdict, counting as rejection"
                    );
                    Ok((Verdict::malformed(), true))
                }
                Err(err) => Err(err),
            }
        })
        .await
    }

    /// Call `op` until it succeeds, a non-transient error occurs, or the
    /// retry strategy gives up. Every wait observes the cancel signal.
    async fn with_retry<T, F, Fut>(
        &self,
        role: Role,
        step: &'static str,
        mut op: F,
    ) -> Result<T, CrewError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut calls: u32 = 0;
        loop {
            calls += 1;
            let err = match self.deps.cancel.guard(op()).await? {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let strategy = &self.deps.retry_strategy;
            let delay = if strategy.should_retry(calls, &err) {
                strategy.next_delay(calls, &err)
            } else {
                None
            };

            let Some(delay) = delay else {
                tracing::error!(
                    target: "crew.controller",
                    run_id = %self.deps.run_id,
                    role = %role,
                    step,
                    calls,
                    kind = err.kind(),
                    error = %err,
                    "service call failed"
                );
                return Err(CrewError::role_failed(role, err));
            };

            tracing::warn!(
                target: "crew.controller",
                run_id = %self.deps.run_id,
                role = %role,
                step,
                calls,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient service error, retrying"
            );
            self.deps.cancel.guard(tokio::time::sleep(delay)).await?;
        }
    }

    fn emit_attempt(&self, role: Role, attempt: u32, max_attempts: u32, verdict: &Verdict) {
        if let Some(renderer) = &self.deps.renderer {
            renderer.render(&RenderEvent::Attempt {
                run_id: self.deps.run_id.clone(),
                role,
                attempt,
                max_attempts,
                approved: verdict.approved(),
                feedback: verdict.feedback().to_vec(),
            });
        }
    }
}
