use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use uuid::Uuid;

use crate::error::CrewError;
use crate::report::AnalysisReport;
use crate::role::{Role, RoleProfile, RoleRegistry};
use crate::service::{ContextSource, CritiqueService, GenerationService};
use crate::util::normalize_ticker;

use super::cancel::CancelToken;
use super::controller::ControllerDeps;
use super::graph::TaskGraph;
use super::progress::ProgressMonitor;
use super::retry::ExponentialBackoffPlugin;
use super::scheduler::{execution_plan, Scheduler};
use super::traits::{OutputRendererPlugin, RenderEvent, RetryStrategyPlugin};
use super::types::{ExecutionOpts, RevisionPolicy, RoleOutcome, TaskStatus};

/// Runs a supervised analysis for one ticker.
pub struct AnalysisEngine {
    generator: Arc<dyn GenerationService>,
    critic: Arc<dyn CritiqueService>,
    context_source: Option<Arc<dyn ContextSource>>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    retry_strategy: Arc<dyn RetryStrategyPlugin>,
    policy: RevisionPolicy,
    opts: ExecutionOpts,
    cancel: CancelToken,
}

#[derive(Default)]
pub struct AnalysisEngineBuilder {
    generator: Option<Arc<dyn GenerationService>>,
    critic: Option<Arc<dyn CritiqueService>>,
    context_source: Option<Arc<dyn ContextSource>>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
    policy: RevisionPolicy,
    opts: ExecutionOpts,
    cancel: Option<CancelToken>,
}

impl AnalysisEngine {
    pub fn builder() -> AnalysisEngineBuilder {
        AnalysisEngineBuilder::default()
    }

    pub fn policy(&self) -> RevisionPolicy {
        self.policy
    }

    pub fn retry_strategy(&self) -> &dyn RetryStrategyPlugin {
        self.retry_strategy.as_ref()
    }

    /// Run every role in `registry` for `ticker` and assemble the report.
    ///
    /// Fails as a whole when any role fails: no partial report is returned.
    pub async fn run_analysis(
        &self,
        ticker: &str,
        registry: &RoleRegistry,
    ) -> Result<AnalysisReport, CrewError> {
        let start = Instant::now();
        let ticker = normalize_ticker(ticker)?;
        let run_id = self
            .opts
            .run_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let graph = TaskGraph::from_tasks(registry.profiles())?;
        graph.validate()?;
        let synthesis = registry.synthesis_role();
        let plan = execution_plan(&graph, synthesis)?;

        tracing::info!(
            target: "crew.scheduler",
            run_id = %run_id,
            ticker = %ticker,
            roles = graph.len(),
            stages = plan.len(),
            max_revisions = self.policy.max_revisions,
            generator = self.generator.name(),
            critic = self.critic.name(),
            "analysis started"
        );

        self.emit(RenderEvent::RunStart {
            run_id: run_id.clone(),
            ticker: ticker.clone(),
            total_roles: graph.len(),
            total_stages: plan.len(),
        });
        self.emit(RenderEvent::Plan {
            run_id: run_id.clone(),
            stages: plan.clone(),
        });

        let progress = Arc::new(Mutex::new(ProgressMonitor::new(
            graph.len(),
            self.opts.progress_bar,
        )));

        let result = self
            .execute(&run_id, &ticker, &graph, synthesis, &plan, progress.clone())
            .await;

        let success = result.is_ok();
        if let Ok(monitor) = progress.lock() {
            monitor.finish(success);
        }

        let per_role = match result {
            Ok(per_role) => per_role,
            Err(err) => {
                tracing::error!(
                    target: "crew.scheduler",
                    run_id = %run_id,
                    role = ?err.failing_role(),
                    error = %err,
                    "analysis failed"
                );
                self.emit(RenderEvent::RunFailed {
                    run_id: run_id.clone(),
                    role: err.failing_role(),
                    error: err.to_string(),
                });
                return Err(err);
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let report = AnalysisReport::build(&run_id, &ticker, &plan, synthesis, per_role, duration_ms);

        let approved = report.per_role.values().filter(|o| o.approved()).count();
        let exhausted = report
            .per_role
            .values()
            .filter(|o| o.status == TaskStatus::Exhausted)
            .count();

        tracing::info!(
            target: "crew.scheduler",
            run_id = %run_id,
            approved,
            exhausted,
            trace_len = report.trace.len(),
            duration_ms,
            "analysis finished"
        );

        self.emit(RenderEvent::RunEnd {
            run_id,
            ticker,
            approved,
            exhausted,
            duration_ms,
        });

        Ok(report)
    }

    async fn execute(
        &self,
        run_id: &str,
        ticker: &str,
        graph: &TaskGraph<Arc<RoleProfile>>,
        synthesis: Option<Role>,
        plan: &[Vec<Role>],
        progress: Arc<Mutex<ProgressMonitor>>,
    ) -> Result<BTreeMap<Role, RoleOutcome>, CrewError> {
        let seeds = self.fetch_seeds(ticker, graph.roles()).await?;

        let deps = ControllerDeps {
            generator: self.generator.clone(),
            critic: self.critic.clone(),
            retry_strategy: self.retry_strategy.clone(),
            renderer: self.renderer.clone(),
            progress,
            policy: self.policy,
            cancel: self.cancel.clone(),
            run_id: run_id.to_string(),
        };

        Scheduler::new(graph, deps, synthesis)
            .max_parallel(self.opts.max_parallel)
            .run(ticker, plan, &seeds)
            .await
    }

    /// Initial source material per role from the data-fetch collaborator.
    async fn fetch_seeds(
        &self,
        ticker: &str,
        roles: &[Role],
    ) -> Result<HashMap<Role, String>, CrewError> {
        let mut seeds = HashMap::new();
        let Some(source) = &self.context_source else {
            return Ok(seeds);
        };

        for &role in roles {
            let fetched = self
                .cancel
                .guard(source.fetch(ticker, role))
                .await?
                .map_err(|e| CrewError::role_failed(role, e))?;
            if let Some(text) = fetched {
                tracing::debug!(
                    target: "crew.service",
                    source = source.name(),
                    role = %role,
                    bytes = text.len(),
                    "loaded source material"
                );
                seeds.insert(role, text);
            }
        }
        Ok(seeds)
    }

    fn emit(&self, event: RenderEvent) {
        if let Some(renderer) = &self.renderer {
            renderer.render(&event);
        }
    }
}

impl AnalysisEngineBuilder {
    pub fn generator(mut self, generator: Arc<dyn GenerationService>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn critic(mut self, critic: Arc<dyn CritiqueService>) -> Self {
        self.critic = Some(critic);
        self
    }

    pub fn context_source(mut self, source: Arc<dyn ContextSource>) -> Self {
        self.context_source = Some(source);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn retry_strategy(mut self, strategy: Arc<dyn RetryStrategyPlugin>) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    pub fn policy(mut self, policy: RevisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn opts(mut self, opts: ExecutionOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> Result<AnalysisEngine, CrewError> {
        let generator = self
            .generator
            .ok_or_else(|| CrewError::Config("generation service not configured".into()))?;
        let critic = self
            .critic
            .ok_or_else(|| CrewError::Config("critique service not configured".into()))?;

        Ok(AnalysisEngine {
            generator,
            critic,
            context_source: self.context_source,
            renderer: self.renderer,
            retry_strategy: self
                .retry_strategy
                .unwrap_or_else(|| Arc::new(ExponentialBackoffPlugin::default())),
            policy: self.policy,
            opts: self.opts,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}
